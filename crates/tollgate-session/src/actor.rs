//! The manager's control loop: one Tokio task that owns the session table.
//!
//! Every operation on a manager arrives here as a [`Command`] over an mpsc
//! channel and is answered on a oneshot channel. Because this task is the
//! only code that ever touches a `Session`, concurrent callers can't
//! interleave halfway through an update: an attempt increment, a lock
//! and an unlock each happen as one step of this loop.
//!
//! Lockout timers are tasks in a `JoinSet` that this loop owns. A timer
//! finishing is just another event the loop selects on, so a timer can't
//! fire after the loop has exited, and shutting the loop down aborts any
//! that are still sleeping.
//!
//! ## Event sources
//!
//! The loop waits on four things at once with `tokio::select!` and
//! handles whichever is ready first:
//!
//! ```text
//!   shutdown oneshot ──┐
//!   mpsc<Command>    ──┤
//!   JoinSet timers   ──┼──→ select! ──→ one step on the SessionTable
//!   sweep interval   ──┘
//! ```
//!
//! - **shutdown**: a `oneshot::Receiver<()>`. It resolves when
//!   [`SessionManager::shutdown`](crate::SessionManager::shutdown) sends,
//!   *and* when the sender is dropped, so forgetting to call `shutdown`
//!   still stops the loop.
//! - **commands**: `recv()` returns `None` once every
//!   [`SessionHandle`](crate::SessionHandle) is gone, which also ends the
//!   loop.
//! - **timers**: `join_next()` yields `(SessionId, epoch)` when a lockout
//!   sleep finishes. The `if !self.timers.is_empty()` guard matters: an
//!   empty `JoinSet` returns `None` immediately, which would otherwise
//!   make the branch spin.
//! - **sweep**: an `Interval` that removes expired sessions. Missed
//!   ticks are delayed rather than bunched up.
//!
//! ## Lock epochs
//!
//! Each timer belongs to one lockout. Locking (or re-arming after a
//! restore) bumps the session's `lock_epoch`, and the timer carries the
//! value it was started with. The loop only unlocks when the two still
//! match, so a timer left over from an earlier lockout can't release a
//! later one. A timer for a removed session is simply dropped.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};
use tollgate_hash::HashStrategy;
use tollgate_types::{ManagerId, SessionId};

use crate::config::{clamp_attempts, clamp_lifetime, clamp_lockout, clamp_strength};
use crate::session::{AddressState, FailureOutcome, SessionInfo};
use crate::table::SessionTable;
use crate::{AddressPolicy, ManagerConfig, ManagerSnapshot, SessionError};

/// Reply channel carried by every command.
///
/// The caller creates a `oneshot` pair, puts the sender in the command and
/// awaits the receiver. If the loop stops before answering, the sender is
/// dropped and the caller's `await` fails, which the handle maps to
/// [`SessionError::ManagerClosed`].
pub(crate) type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Requests the outside world can make of a manager.
///
/// One variant per handle method. Owned data only (`String`, not `&str`)
/// because the command crosses a channel into another task.
pub(crate) enum Command {
    Create {
        username: String,
        role: Option<String>,
        address: String,
        reply: Reply<SessionId>,
    },
    Login {
        id: SessionId,
        reply: Reply<()>,
    },
    Logout {
        id: SessionId,
        reply: Reply<()>,
    },
    /// `address: None` is a plain verify.
    Verify {
        id: SessionId,
        address: Option<String>,
        reply: Reply<()>,
    },
    CheckRole {
        id: SessionId,
        roles: HashSet<String>,
        reply: Reply<()>,
    },
    RecordFailure {
        id: SessionId,
        reply: Reply<u32>,
    },
    SetAddress {
        id: SessionId,
        address: String,
        state: AddressState,
        reply: Reply<()>,
    },
    Remove {
        id: SessionId,
        reply: Reply<SessionInfo>,
    },
    Info {
        id: SessionId,
        reply: Reply<SessionInfo>,
    },
    Len {
        reply: Reply<usize>,
    },
    Config {
        reply: Reply<ManagerConfig>,
    },
    Configure {
        change: ConfigChange,
        reply: Reply<()>,
    },
    Snapshot {
        reply: Reply<ManagerSnapshot>,
    },
}

/// One configuration setter's worth of change.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ConfigChange {
    SessionLifetime(Option<Duration>),
    MaxAttempts(u32),
    LockoutDuration(Duration),
    HashStrategy(HashStrategy),
    HashStrength(u32),
    AddressPolicy(AddressPolicy),
}

/// The state owned by the control loop.
pub(crate) struct ManagerActor {
    manager_id: ManagerId,
    config: ManagerConfig,
    table: SessionTable,
    timers: JoinSet<(SessionId, u64)>,
    commands: mpsc::Receiver<Command>,
    shutdown: oneshot::Receiver<()>,
}

impl ManagerActor {
    /// Runs the loop until the shutdown signal fires, the owner is
    /// dropped, or every command sender is gone.
    async fn run(mut self) {
        tracing::info!(
            manager = %self.manager_id,
            sessions = self.table.len(),
            "session manager started"
        );
        self.rearm_locked();

        let period = self.config.sweep_interval;
        let mut sweep = time::interval_at(Instant::now() + period, period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Either an explicit shutdown or the owner being dropped.
                _ = &mut self.shutdown => {
                    tracing::info!(manager = %self.manager_id, "session manager shutting down");
                    break;
                }
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                Some(joined) = self.timers.join_next(), if !self.timers.is_empty() => {
                    self.handle_timer(joined);
                }
                _ = sweep.tick() => self.sweep(),
            }
        }

        let pending = self.timers.len();
        self.timers.shutdown().await;
        tracing::info!(
            manager = %self.manager_id,
            cancelled_timers = pending,
            "session manager stopped"
        );
    }

    fn handle(&mut self, cmd: Command) {
        let now = Instant::now();
        match cmd {
            Command::Create {
                username,
                role,
                address,
                reply,
            } => {
                let expires_at = self.config.session_lifetime.map(|d| now + d);
                let result = self.table.create(&username, role, address, expires_at, now);
                let _ = reply.send(result);
            }
            Command::Login { id, reply } => {
                let _ = reply.send(self.login(&id, now));
            }
            Command::Logout { id, reply } => {
                let _ = reply.send(self.logout(&id, now));
            }
            Command::Verify { id, address, reply } => {
                let _ = reply.send(self.verify(&id, address.as_deref(), now));
            }
            Command::CheckRole { id, roles, reply } => {
                let result = self
                    .table
                    .live_mut(&id, now)
                    .and_then(|session| session.check_role(&roles));
                let _ = reply.send(result);
            }
            Command::RecordFailure { id, reply } => {
                let _ = reply.send(self.record_failure(id, now));
            }
            Command::SetAddress {
                id,
                address,
                state,
                reply,
            } => {
                let _ = reply.send(self.set_address(&id, address, state, now));
            }
            Command::Remove { id, reply } => {
                let result = match self.table.remove(&id) {
                    Some(session) => {
                        tracing::info!(session = %id, "session removed");
                        Ok(session.info(now))
                    }
                    None => Err(SessionError::NotFound(id)),
                };
                let _ = reply.send(result);
            }
            Command::Info { id, reply } => {
                let result = self.table.live_mut(&id, now).map(|s| s.info(now));
                let _ = reply.send(result);
            }
            Command::Len { reply } => {
                let _ = reply.send(Ok(self.table.len()));
            }
            Command::Config { reply } => {
                let _ = reply.send(Ok(self.config.clone()));
            }
            Command::Configure { change, reply } => {
                let _ = reply.send(self.configure(change));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(Ok(ManagerSnapshot {
                    manager_id: self.manager_id.clone(),
                    config: self.config.clone(),
                    sessions: self.table.infos(now),
                }));
            }
        }
    }

    // -- Lifecycle --------------------------------------------------------

    fn login(&mut self, id: &SessionId, now: Instant) -> Result<(), SessionError> {
        self.table.live_mut(id, now)?.login()?;
        tracing::info!(session = %id, "session logged in");
        Ok(())
    }

    fn logout(&mut self, id: &SessionId, now: Instant) -> Result<(), SessionError> {
        self.table.live_mut(id, now)?.logout()?;
        tracing::info!(session = %id, "session logged out");
        Ok(())
    }

    fn verify(
        &mut self,
        id: &SessionId,
        address: Option<&str>,
        now: Instant,
    ) -> Result<(), SessionError> {
        let policy = self.config.address_policy;
        let session = self.table.live_mut(id, now)?;
        session.verify()?;
        if let Some(address) = address {
            session.check_address(address, policy)?;
        }
        Ok(())
    }

    fn set_address(
        &mut self,
        id: &SessionId,
        address: String,
        state: AddressState,
        now: Instant,
    ) -> Result<(), SessionError> {
        let session = self.table.live_mut(id, now)?;
        tracing::info!(session = %id, address = %address, ?state, "address updated");
        session.set_address(address, state);
        Ok(())
    }

    // -- Attempts and lockout ---------------------------------------------

    fn record_failure(&mut self, id: SessionId, now: Instant) -> Result<u32, SessionError> {
        let max = self.config.max_login_attempts;
        let outcome = self.table.live_mut(&id, now)?.record_failure(max);

        match outcome {
            FailureOutcome::Counted { attempts } => {
                tracing::debug!(session = %id, attempts, max, "failed attempt recorded");
                Ok(attempts)
            }
            FailureOutcome::LockedOut { attempts, epoch } => {
                let duration = self.config.lockout_duration;
                tracing::warn!(
                    session = %id,
                    attempts,
                    lockout_secs = duration.as_secs(),
                    "maximum login attempts reached, session locked"
                );
                self.arm_lockout(id.clone(), epoch, duration);
                Err(SessionError::LockoutTriggered {
                    session: id,
                    duration,
                })
            }
            FailureOutcome::AlreadyLocked { attempts } => {
                tracing::debug!(session = %id, attempts, "failed attempt on locked session");
                Err(SessionError::Locked(id))
            }
        }
    }

    fn arm_lockout(&mut self, id: SessionId, epoch: u64, duration: Duration) {
        self.timers.spawn(async move {
            time::sleep(duration).await;
            (id, epoch)
        });
    }

    /// Gives every already-locked session a new lockout timer. Only
    /// restored managers start with locked sessions.
    fn rearm_locked(&mut self) {
        let duration = self.config.lockout_duration;
        let rearmed: Vec<(SessionId, u64)> = self
            .table
            .sessions_mut()
            .filter_map(|s| s.rearm_lock().map(|epoch| (s.id.clone(), epoch)))
            .collect();

        for (id, epoch) in rearmed {
            tracing::info!(session = %id, lockout_secs = duration.as_secs(), "lockout re-armed");
            self.arm_lockout(id, epoch, duration);
        }
    }

    fn handle_timer(&mut self, joined: Result<(SessionId, u64), JoinError>) {
        let (id, epoch) = match joined {
            Ok(fired) => fired,
            Err(e) => {
                if !e.is_cancelled() {
                    tracing::warn!(manager = %self.manager_id, error = %e, "lockout timer failed");
                }
                return;
            }
        };

        let Some(session) = self.table.get_mut(&id) else {
            tracing::debug!(session = %id, "unlock for removed session ignored");
            return;
        };
        if session.unlock(epoch) {
            tracing::info!(session = %id, "lockout elapsed, session unlocked");
        } else {
            tracing::debug!(session = %id, epoch, "stale unlock ignored");
        }
    }

    fn sweep(&mut self) {
        let expired = self.table.expire_stale(Instant::now());
        if !expired.is_empty() {
            tracing::debug!(
                manager = %self.manager_id,
                expired = expired.len(),
                remaining = self.table.len(),
                "expired sessions swept"
            );
        }
    }

    // -- Configuration ----------------------------------------------------

    /// Applies a change. Out-of-range values are clamped, applied, and
    /// reported back as `InvalidConfiguration`.
    fn configure(&mut self, change: ConfigChange) -> Result<(), SessionError> {
        let note = match change {
            ConfigChange::SessionLifetime(value) => {
                let (value, note) = clamp_lifetime(value);
                self.config.session_lifetime = value;
                note
            }
            ConfigChange::MaxAttempts(value) => {
                let (value, note) = clamp_attempts(value);
                self.config.max_login_attempts = value;
                note
            }
            ConfigChange::LockoutDuration(value) => {
                let (value, note) = clamp_lockout(value);
                self.config.lockout_duration = value;
                note
            }
            ConfigChange::HashStrategy(value) => {
                self.config.hash_strategy = value;
                None
            }
            ConfigChange::HashStrength(value) => {
                let (value, note) = clamp_strength(value);
                self.config.hash_strength = value;
                note
            }
            ConfigChange::AddressPolicy(value) => {
                self.config.address_policy = value;
                None
            }
        };

        tracing::info!(manager = %self.manager_id, ?change, "configuration updated");
        match note {
            Some(note) => {
                tracing::warn!(manager = %self.manager_id, "{note}");
                Err(SessionError::InvalidConfiguration(note))
            }
            None => Ok(()),
        }
    }
}

/// Spawns a control loop and returns its command sender, shutdown trigger
/// and task handle.
///
/// # Panics
/// Must be called from within a Tokio runtime.
pub(crate) fn spawn_actor(
    manager_id: ManagerId,
    config: ManagerConfig,
    table: SessionTable,
    channel_size: usize,
) -> (
    mpsc::Sender<Command>,
    oneshot::Sender<()>,
    tokio::task::JoinHandle<()>,
) {
    let (command_tx, command_rx) = mpsc::channel(channel_size);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let actor = ManagerActor {
        manager_id,
        config,
        table,
        timers: JoinSet::new(),
        commands: command_rx,
        shutdown: shutdown_rx,
    };

    let task = tokio::spawn(actor.run());
    (command_tx, shutdown_tx, task)
}
