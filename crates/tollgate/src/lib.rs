//! # Tollgate
//!
//! An in-process session authority for web applications.
//!
//! Tollgate issues and tracks user sessions, locks a session out after
//! repeated failed logins and releases it on a timer, ties sessions to
//! the addresses they're used from, and answers role checks for request
//! middleware.
//!
//! ## Quick Start
//!
//! ```rust
//! use tollgate::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), TollgateError> {
//! let registry = ManagerRegistry::new();
//! let manager = SessionManager::spawn(ManagerConfig::default(), &registry)?;
//! let sessions = manager.handle();
//!
//! let id = sessions.create_session("alice", Some("admin"), "10.0.0.1").await?;
//! sessions.login(&id).await?;
//!
//! let guard = Guard::restricted(sessions.clone(), ["admin"]);
//! let access = guard.check(Some(id.as_str()), Some("10.0.0.1")).await;
//! assert_eq!(access, Access::Granted);
//!
//! manager.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod guard;
pub mod telemetry;

pub use error::TollgateError;
pub use tollgate_hash as hash;
pub use tollgate_session as session;
pub use tollgate_types as types;

pub mod prelude {
    pub use crate::TollgateError;
    pub use crate::guard::{Access, Denial, Guard, Rule, session_cookie_name};
    pub use crate::telemetry::{LogTarget, init_logging};
    pub use tollgate_hash::{CredentialHasher, Digest, HashStrategy, HashStrength};
    pub use tollgate_session::{
        AddressPolicy, ManagerConfig, ManagerRegistry, SessionError, SessionHandle,
        SessionInfo, SessionManager,
    };
    pub use tollgate_types::{Codec, JsonCodec, ManagerId, SessionId};
}
