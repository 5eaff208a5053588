//! Error types for the session layer.

use std::time::Duration;

use tollgate_hash::HashError;
use tollgate_types::{CodecError, ManagerId, SessionId};

/// Errors that can occur during session management.
///
/// Every variant is recoverable: the manager never stops because of one.
/// The caller decides what the user sees (deny, message, redirect).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The username already has a session in the table. Only one session
    /// per username may exist at a time.
    #[error("user {0:?} already has a session in progress")]
    DuplicateSession(String),

    /// No session exists for the given id.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// `login` on a session that is already logged in.
    #[error("session {0} is already logged in")]
    AlreadyAlive(SessionId),

    /// `logout` on a session that isn't logged in.
    #[error("session {0} is not logged in")]
    NotAlive(SessionId),

    /// The session exists but hasn't logged in (or has logged out).
    #[error("session {0} exists but is inactive")]
    Inactive(SessionId),

    /// The session is locked out after too many failed attempts.
    #[error("session {0} is locked")]
    Locked(SessionId),

    /// This failed attempt pushed the session over the limit. Carries the
    /// lockout duration so the caller can tell the user how long to wait.
    #[error(
        "maximum login attempts reached; session {session} locked for {}s",
        .duration.as_secs()
    )]
    LockoutTriggered {
        session: SessionId,
        duration: Duration,
    },

    /// Strict address policy: the request came from an address this
    /// session has never seen.
    #[error("address {address} is not known for session {session}")]
    UnknownAddress { session: SessionId, address: String },

    /// The request came from an address that was explicitly blocked.
    #[error("address {address} is blocked for session {session}")]
    BlockedAddress { session: SessionId, address: String },

    /// The session's role isn't in the set the route accepts.
    #[error("role mismatch: wanted one of {wanted:?}, got {actual:?}")]
    RoleMismatch {
        wanted: Vec<String>,
        actual: Option<String>,
    },

    /// The session outlived the configured session lifetime and has been
    /// removed.
    #[error("session {0} has expired")]
    Expired(SessionId),

    /// A configuration value was out of range. The nearest valid value
    /// has been applied; the message says which.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Hashing failed: unsupported strategy, password mismatch, or a
    /// malformed digest.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// The token source kept producing identifiers that were already in
    /// use. Nothing was created.
    #[error("no unused identifier after {attempts} attempts")]
    IdExhausted { attempts: u32 },

    /// A snapshot couldn't be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The blocking task that ran the hasher panicked or was cancelled.
    #[error("hashing task failed: {0}")]
    HashTask(#[from] tokio::task::JoinError),

    /// The manager's control loop has stopped; no further operations are
    /// possible through this handle.
    #[error("session manager {0} has shut down")]
    ManagerClosed(ManagerId),
}
