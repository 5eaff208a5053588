//! Identifier generation: random tokens, collision retry, and the
//! registry that keeps manager ids unique.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::Rng;
use tollgate_types::ManagerId;

use crate::SessionError;

/// Random bytes behind a session id (256 bits).
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Random bytes behind a manager id (128 bits).
pub const MANAGER_TOKEN_BYTES: usize = 16;

/// Smallest token [`RandomTokens`] will produce (128 bits).
pub const MIN_TOKEN_BYTES: usize = 16;

/// Candidates drawn before giving up on finding an unused identifier.
pub const MAX_TOKEN_ATTEMPTS: u32 = 16;

// ---------------------------------------------------------------------------
// TokenSource
// ---------------------------------------------------------------------------

/// Something that produces candidate identifier tokens.
///
/// Production code uses [`RandomTokens`]. Tests can plug in a scripted
/// source to force collisions.
pub trait TokenSource: Send + 'static {
    fn next_token(&mut self) -> String;
}

/// Hex tokens drawn from `rand::rng()`, a CSPRNG seeded from the OS.
#[derive(Debug, Clone, Copy)]
pub struct RandomTokens {
    bytes: usize,
}

impl RandomTokens {
    /// A source producing `bytes` random bytes per token (`2 * bytes` hex
    /// characters). Sizes below [`MIN_TOKEN_BYTES`] are raised to it.
    pub fn new(bytes: usize) -> Self {
        if bytes < MIN_TOKEN_BYTES {
            tracing::warn!(
                requested = bytes,
                using = MIN_TOKEN_BYTES,
                "token size too small, clamping"
            );
        }
        Self {
            bytes: bytes.max(MIN_TOKEN_BYTES),
        }
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn sessions() -> Self {
        Self::new(SESSION_TOKEN_BYTES)
    }

    pub fn managers() -> Self {
        Self::new(MANAGER_TOKEN_BYTES)
    }
}

impl TokenSource for RandomTokens {
    fn next_token(&mut self) -> String {
        let mut rng = rand::rng();
        (0..self.bytes)
            .map(|_| format!("{:02x}", rng.random::<u8>()))
            .collect()
    }
}

/// Draws tokens until one isn't `taken`, up to [`MAX_TOKEN_ATTEMPTS`].
///
/// With a 128-bit or larger random source a retry is vanishingly rare;
/// each one is logged.
///
/// # Errors
/// [`SessionError::IdExhausted`] if every candidate was taken.
pub(crate) fn unique_token(
    source: &mut dyn TokenSource,
    taken: impl Fn(&str) -> bool,
) -> Result<String, SessionError> {
    for attempt in 1..=MAX_TOKEN_ATTEMPTS {
        let token = source.next_token();
        if !taken(&token) {
            return Ok(token);
        }
        tracing::warn!(attempt, "generated identifier collided with an existing one, retrying");
    }
    tracing::error!(attempts = MAX_TOKEN_ATTEMPTS, "no unused identifier found");
    Err(SessionError::IdExhausted {
        attempts: MAX_TOKEN_ATTEMPTS,
    })
}

// ---------------------------------------------------------------------------
// ManagerRegistry
// ---------------------------------------------------------------------------

/// The set of manager ids in use by one host process.
///
/// Construct one at startup and pass it to every
/// [`SessionManager::spawn`](crate::SessionManager::spawn). Clones share
/// the same set, so a registry can be handed to several components.
/// Ids are never released: a shut-down manager's id stays reserved.
#[derive(Clone)]
pub struct ManagerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

struct RegistryInner {
    ids: HashSet<ManagerId>,
    source: Box<dyn TokenSource>,
}

impl ManagerRegistry {
    /// An empty registry drawing random 128-bit ids.
    pub fn new() -> Self {
        Self::with_source(RandomTokens::managers())
    }

    /// An empty registry drawing ids from `source`.
    pub fn with_source(source: impl TokenSource) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                ids: HashSet::new(),
                source: Box::new(source),
            })),
        }
    }

    /// Allocates and records a fresh manager id.
    ///
    /// # Errors
    /// [`SessionError::IdExhausted`] if the source keeps producing ids
    /// that are already registered.
    pub fn register(&self) -> Result<ManagerId, SessionError> {
        let mut inner = self.lock();
        let RegistryInner { ids, source } = &mut *inner;
        let token = unique_token(source.as_mut(), |candidate| {
            ids.contains(&ManagerId::new(candidate))
        })?;
        let id = ManagerId::new(token);
        ids.insert(id.clone());
        Ok(id)
    }

    /// Records a specific id, as when a manager is restored from a
    /// snapshot. Returns `false` if the id is already taken.
    pub fn claim(&self, id: &ManagerId) -> bool {
        self.lock().ids.insert(id.clone())
    }

    pub fn contains(&self, id: &ManagerId) -> bool {
        self.lock().ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.lock().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().ids.is_empty()
    }

    // The set stays consistent even if a holder panicked: every critical
    // section is a bounded lookup followed by at most one insert.
    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManagerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ManagerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerRegistry")
            .field("len", &self.len())
            .finish()
    }
}
