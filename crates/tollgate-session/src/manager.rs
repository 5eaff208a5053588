//! The public face of a session manager: the owning [`SessionManager`] and
//! the cheap, cloneable [`SessionHandle`] that middleware calls into.
//!
//! ```text
//!  SessionHandle ─┐                       ┌─→ SessionTable
//!  SessionHandle ─┼─ mpsc<Command> ─→ actor ┤
//!  SessionHandle ─┘                       └─→ JoinSet (lockout timers)
//!        ▲
//!        └── SessionManager (owns the shutdown signal)
//! ```
//!
//! ## Owner vs. handle
//!
//! The two types split what a caller may do:
//!
//! - [`SessionManager`] is **not** `Clone`. It holds the
//!   `oneshot::Sender<()>` that stops the loop, and `shutdown(self)`
//!   takes it by value. The compiler therefore rules out stopping a
//!   manager twice; there is no runtime flag to check.
//! - [`SessionHandle`] **is** `Clone`. It wraps an `mpsc::Sender`, which
//!   is reference-counted internally, so cloning is cheap and every
//!   request handler can hold its own.
//!
//! ## Request round trip
//!
//! Every handle method follows the same three steps (see
//! `SessionHandle::request`):
//!
//! 1. create a `oneshot` reply channel
//! 2. send a `Command` carrying the reply sender
//! 3. await the reply
//!
//! A failure at step 2 or 3 means the loop has stopped and surfaces as
//! [`SessionError::ManagerClosed`]. Password hashing is the exception: it
//! reads the config through the loop, then runs on Tokio's blocking pool
//! (`spawn_blocking`) so a slow bcrypt never stalls other sessions.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tollgate_hash::{CredentialHasher, Digest, HashStrategy};
use tollgate_types::{Codec, ManagerId, SessionId};

use crate::actor::{Command, ConfigChange, Reply, spawn_actor};
use crate::ids::{RandomTokens, TokenSource};
use crate::session::{AddressState, Session, SessionInfo};
use crate::table::SessionTable;
use crate::{AddressPolicy, ManagerConfig, ManagerRegistry, ManagerSnapshot, SessionError};

/// Command channel capacity. Callers wait for room when it's full.
const DEFAULT_CHANNEL_SIZE: usize = 64;

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Owns one running session manager.
///
/// There is exactly one `SessionManager` per control loop and it cannot be
/// cloned. It holds the loop's only shutdown trigger, and
/// [`shutdown`](Self::shutdown) consumes it, so the loop can't be told to
/// stop twice. Dropping the manager without calling `shutdown` stops the
/// loop as well.
///
/// Hand [`SessionHandle`]s (from [`handle`](Self::handle)) to the code
/// that serves requests.
pub struct SessionManager {
    handle: SessionHandle,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SessionManager {
    /// Starts a manager with a fresh id from `registry`.
    ///
    /// Out-of-range config values are clamped (and logged) first.
    ///
    /// # Errors
    /// [`SessionError::IdExhausted`] if `registry` couldn't produce an
    /// unused manager id.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        config: ManagerConfig,
        registry: &ManagerRegistry,
    ) -> Result<Self, SessionError> {
        Self::spawn_with_source(config, registry, RandomTokens::sessions())
    }

    /// Like [`spawn`](Self::spawn), drawing session ids from `tokens`.
    ///
    /// If `tokens` runs out of unused ids, `create_session` returns
    /// [`SessionError::IdExhausted`]; the manager itself keeps serving.
    pub fn spawn_with_source(
        config: ManagerConfig,
        registry: &ManagerRegistry,
        tokens: impl TokenSource,
    ) -> Result<Self, SessionError> {
        let manager_id = registry.register()?;
        let table = SessionTable::new(Box::new(tokens));
        Ok(Self::start(manager_id, config.validated(), table))
    }

    /// Rebuilds a manager from bytes produced by [`SessionHandle::snapshot`].
    ///
    /// The snapshot's manager id is reused unless `registry` already holds
    /// it, in which case a fresh one is drawn. Sessions that were locked
    /// get a new, full lockout.
    ///
    /// # Errors
    /// [`SessionError::Codec`] if the bytes don't decode or describe an
    /// inconsistent table.
    pub fn restore<C: Codec>(
        bytes: &[u8],
        codec: &C,
        registry: &ManagerRegistry,
    ) -> Result<Self, SessionError> {
        let snapshot: ManagerSnapshot = codec.decode(bytes)?;
        Self::from_snapshot(snapshot, registry)
    }

    /// Rebuilds a manager from an already-decoded snapshot.
    pub fn from_snapshot(
        snapshot: ManagerSnapshot,
        registry: &ManagerRegistry,
    ) -> Result<Self, SessionError> {
        let now = Instant::now();
        let mut table = SessionTable::new(Box::new(RandomTokens::sessions()));
        for info in snapshot.sessions {
            table.insert_restored(Session::from_info(info, now))?;
        }

        let manager_id = if registry.claim(&snapshot.manager_id) {
            snapshot.manager_id
        } else {
            let fresh = registry.register()?;
            tracing::warn!(
                previous = %snapshot.manager_id,
                manager = %fresh,
                "snapshot manager id already registered, assigned a new one"
            );
            fresh
        };

        tracing::info!(manager = %manager_id, sessions = table.len(), "restoring session manager");
        Ok(Self::start(manager_id, snapshot.config.validated(), table))
    }

    fn start(manager_id: ManagerId, config: ManagerConfig, table: SessionTable) -> Self {
        let (sender, shutdown, task) =
            spawn_actor(manager_id.clone(), config, table, DEFAULT_CHANNEL_SIZE);
        Self {
            handle: SessionHandle { manager_id, sender },
            shutdown,
            task,
        }
    }

    pub fn id(&self) -> &ManagerId {
        &self.handle.manager_id
    }

    /// A new handle to this manager.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Stops the control loop and waits for it to finish.
    ///
    /// Pending lockout timers are cancelled. Handles still held elsewhere
    /// get [`SessionError::ManagerClosed`] from then on.
    pub async fn shutdown(self) {
        let manager_id = self.handle.manager_id.clone();
        // The loop may already have stopped on its own; nothing to signal then.
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::error!(manager = %manager_id, error = %e, "session manager task failed");
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("id", &self.handle.manager_id)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// A handle for calling into a running manager.
///
/// Cheap to clone: it's an `mpsc::Sender` plus the manager id. Every method
/// sends one command and waits for the reply. Once the manager has shut
/// down, every method returns [`SessionError::ManagerClosed`].
#[derive(Clone)]
pub struct SessionHandle {
    manager_id: ManagerId,
    sender: mpsc::Sender<Command>,
}

impl SessionHandle {
    pub fn id(&self) -> &ManagerId {
        &self.manager_id
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| self.closed())?;
        reply_rx.await.map_err(|_| self.closed())?
    }

    fn closed(&self) -> SessionError {
        SessionError::ManagerClosed(self.manager_id.clone())
    }

    // -- Session lifecycle ------------------------------------------------

    /// Starts a login flow for `username`, first seen at `address`.
    ///
    /// The session starts inactive, unlocked, with no failed attempts and
    /// `address` marked allowed.
    ///
    /// # Errors
    /// [`SessionError::DuplicateSession`] if the username already has a
    /// session.
    pub async fn create_session(
        &self,
        username: &str,
        role: Option<&str>,
        address: &str,
    ) -> Result<SessionId, SessionError> {
        let username = username.to_string();
        let role = role.map(str::to_string);
        let address = address.to_string();
        self.request(|reply| Command::Create {
            username,
            role,
            address,
            reply,
        })
        .await
    }

    /// Marks the session as logged in and clears its failed attempts.
    ///
    /// # Errors
    /// `NotFound`, `Expired`, `AlreadyAlive`, or `Locked`.
    pub async fn login(&self, id: &SessionId) -> Result<(), SessionError> {
        let id = id.clone();
        self.request(|reply| Command::Login { id, reply }).await
    }

    /// # Errors
    /// `NotFound`, `Expired`, or `NotAlive`.
    pub async fn logout(&self, id: &SessionId) -> Result<(), SessionError> {
        let id = id.clone();
        self.request(|reply| Command::Logout { id, reply }).await
    }

    /// Succeeds only for a logged-in, unlocked session. The lock is
    /// checked first.
    ///
    /// # Errors
    /// `NotFound`, `Expired`, `Locked`, or `Inactive`.
    pub async fn verify(&self, id: &SessionId) -> Result<(), SessionError> {
        let id = id.clone();
        self.request(|reply| Command::Verify {
            id,
            address: None,
            reply,
        })
        .await
    }

    /// [`verify`](Self::verify) plus the provenance check for `address`
    /// under the configured [`AddressPolicy`].
    ///
    /// # Errors
    /// Everything `verify` returns, plus `UnknownAddress` (strict policy,
    /// unseen address) and `BlockedAddress`.
    pub async fn verify_with_address(
        &self,
        id: &SessionId,
        address: &str,
    ) -> Result<(), SessionError> {
        let id = id.clone();
        let address = Some(address.to_string());
        self.request(|reply| Command::Verify { id, address, reply })
            .await
    }

    /// Succeeds if the session's role is one of `roles`.
    ///
    /// An empty `roles` means "no restriction" and succeeds without
    /// looking at the session at all.
    ///
    /// # Errors
    /// `NotFound`, `Expired`, or `RoleMismatch`.
    pub async fn check_role(&self, roles: &[&str], id: &SessionId) -> Result<(), SessionError> {
        if roles.is_empty() {
            return Ok(());
        }
        let roles: HashSet<String> = roles.iter().map(|r| r.to_string()).collect();
        let id = id.clone();
        self.request(|reply| Command::CheckRole { id, roles, reply })
            .await
    }

    /// Counts one failed authentication attempt. Returns the attempt count
    /// so far while the session is still under the limit.
    ///
    /// # Errors
    /// - [`SessionError::LockoutTriggered`]: this attempt reached the limit;
    ///   the session is now locked for the carried duration
    /// - [`SessionError::Locked`]: the session was already locked (the
    ///   attempt is still counted)
    /// - `NotFound` / `Expired`
    pub async fn record_failed_attempt(&self, id: &SessionId) -> Result<u32, SessionError> {
        let id = id.clone();
        self.request(|reply| Command::RecordFailure { id, reply })
            .await
    }

    /// Rejects every future request from `address` for this session.
    pub async fn block_address(&self, id: &SessionId, address: &str) -> Result<(), SessionError> {
        self.set_address(id, address, AddressState::Blocked).await
    }

    /// Marks `address` as allowed, lifting a block if there was one.
    pub async fn allow_address(&self, id: &SessionId, address: &str) -> Result<(), SessionError> {
        self.set_address(id, address, AddressState::Allowed).await
    }

    async fn set_address(
        &self,
        id: &SessionId,
        address: &str,
        state: AddressState,
    ) -> Result<(), SessionError> {
        let id = id.clone();
        let address = address.to_string();
        self.request(|reply| Command::SetAddress {
            id,
            address,
            state,
            reply,
        })
        .await
    }

    /// Deletes a session and frees its username. Returns the session as it
    /// was. Any pending lockout timer for it becomes a no-op.
    pub async fn remove_session(&self, id: &SessionId) -> Result<SessionInfo, SessionError> {
        let id = id.clone();
        self.request(|reply| Command::Remove { id, reply }).await
    }

    // -- Reads ------------------------------------------------------------

    /// A copy of the session's current state.
    pub async fn session(&self, id: &SessionId) -> Result<SessionInfo, SessionError> {
        let id = id.clone();
        self.request(|reply| Command::Info { id, reply }).await
    }

    pub async fn username(&self, id: &SessionId) -> Result<String, SessionError> {
        Ok(self.session(id).await?.username)
    }

    pub async fn role(&self, id: &SessionId) -> Result<Option<String>, SessionError> {
        Ok(self.session(id).await?.role)
    }

    /// Number of sessions in the table, including expired ones the sweep
    /// hasn't reached yet.
    pub async fn len(&self) -> Result<usize, SessionError> {
        self.request(|reply| Command::Len { reply }).await
    }

    pub async fn is_empty(&self) -> Result<bool, SessionError> {
        Ok(self.len().await? == 0)
    }

    pub async fn config(&self) -> Result<ManagerConfig, SessionError> {
        self.request(|reply| Command::Config { reply }).await
    }

    // -- Configuration ----------------------------------------------------
    //
    // Each setter affects sessions created and attempts recorded after it
    // returns. An out-of-range value is clamped into range, applied, and
    // reported as `InvalidConfiguration`.

    /// `None` makes new sessions live until removed.
    pub async fn set_session_lifetime(
        &self,
        lifetime: Option<Duration>,
    ) -> Result<(), SessionError> {
        self.configure(ConfigChange::SessionLifetime(lifetime)).await
    }

    pub async fn set_max_attempts(&self, attempts: u32) -> Result<(), SessionError> {
        self.configure(ConfigChange::MaxAttempts(attempts)).await
    }

    pub async fn set_lockout_duration(&self, duration: Duration) -> Result<(), SessionError> {
        self.configure(ConfigChange::LockoutDuration(duration)).await
    }

    /// Selects the hashing strategy by name (`"bcrypt"`, `"sha256"`,
    /// `"sha512"`, case-insensitive).
    ///
    /// # Errors
    /// [`SessionError::Hash`] wrapping `UnsupportedStrategy` for any other
    /// name; the configuration is left unchanged.
    pub async fn set_hash_strategy(&self, name: &str) -> Result<(), SessionError> {
        let strategy: HashStrategy = name.parse()?;
        self.configure(ConfigChange::HashStrategy(strategy)).await
    }

    pub async fn set_hash_strength(&self, strength: u32) -> Result<(), SessionError> {
        self.configure(ConfigChange::HashStrength(strength)).await
    }

    pub async fn set_address_policy(&self, policy: AddressPolicy) -> Result<(), SessionError> {
        self.configure(ConfigChange::AddressPolicy(policy)).await
    }

    async fn configure(&self, change: ConfigChange) -> Result<(), SessionError> {
        self.request(|reply| Command::Configure { change, reply })
            .await
    }

    // -- Credentials ------------------------------------------------------

    /// Hashes a password with the manager's current strategy and strength.
    ///
    /// The hashing runs on Tokio's blocking pool, never on the control
    /// loop.
    pub async fn hash_password(&self, secret: &str) -> Result<Digest, SessionError> {
        let hasher = self.hasher().await?;
        let secret = secret.to_string();
        Ok(tokio::task::spawn_blocking(move || hasher.hash(&secret)).await??)
    }

    /// Checks a password against a stored digest using the manager's
    /// current strategy.
    ///
    /// # Errors
    /// [`SessionError::Hash`] wrapping `PasswordMismatch` when the password
    /// is wrong.
    pub async fn check_password(
        &self,
        secret: &str,
        digest: &Digest,
    ) -> Result<(), SessionError> {
        let hasher = self.hasher().await?;
        let secret = secret.to_string();
        let digest = digest.clone();
        Ok(tokio::task::spawn_blocking(move || hasher.compare(&secret, &digest)).await??)
    }

    async fn hasher(&self) -> Result<CredentialHasher, SessionError> {
        let config = self.config().await?;
        Ok(CredentialHasher::new(config.hash_strategy, config.hash_strength))
    }

    // -- Persistence ------------------------------------------------------

    /// Serializes the manager's id, config and sessions with `codec`.
    /// Feed the bytes to [`SessionManager::restore`] to rebuild it.
    pub async fn snapshot<C: Codec>(&self, codec: &C) -> Result<Vec<u8>, SessionError> {
        let snapshot = self.request(|reply| Command::Snapshot { reply }).await?;
        Ok(codec.encode(&snapshot)?)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("manager_id", &self.manager_id)
            .finish_non_exhaustive()
    }
}
