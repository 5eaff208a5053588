//! Session management for Tollgate.
//!
//! This crate owns the server-side state of every login flow:
//!
//! 1. **Lifecycle**: create, login, logout, verify, remove
//! 2. **Lockout**: failed attempts are counted per session; reaching the
//!    limit locks the session until a timer releases it
//! 3. **Provenance**: each session remembers the addresses it has been
//!    used from, with an [`AddressPolicy`] for addresses it hasn't seen
//! 4. **Roles**: route-level role checks
//! 5. **Persistence**: snapshot to bytes and restore
//!
//! A [`SessionManager`] runs one control loop per manager. Request
//! handlers talk to it through [`SessionHandle`]s.
//!
//! ```rust
//! use tollgate_session::{ManagerConfig, ManagerRegistry, SessionError, SessionManager};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), SessionError> {
//! let registry = ManagerRegistry::new();
//! let manager = SessionManager::spawn(ManagerConfig::default(), &registry)?;
//! let sessions = manager.handle();
//!
//! let id = sessions.create_session("alice", Some("admin"), "10.0.0.1").await?;
//! sessions.login(&id).await?;
//! sessions.verify_with_address(&id, "10.0.0.1").await?;
//! sessions.check_role(&["admin"], &id).await?;
//!
//! manager.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod actor;
mod config;
mod error;
mod ids;
mod manager;
mod session;
mod snapshot;
mod table;

pub use config::{AddressPolicy, ManagerConfig};
pub use error::SessionError;
pub use ids::{
    MANAGER_TOKEN_BYTES, MAX_TOKEN_ATTEMPTS, MIN_TOKEN_BYTES, ManagerRegistry, RandomTokens,
    SESSION_TOKEN_BYTES, TokenSource,
};
pub use manager::{SessionHandle, SessionManager};
pub use session::{AddressState, SessionInfo};
pub use snapshot::ManagerSnapshot;
