//! Shared types for Tollgate.
//!
//! - **Identifiers** ([`SessionId`], [`ManagerId`]): opaque tokens that
//!   name sessions and managers.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how a manager snapshot
//!   is turned into bytes and back.
//! - **Errors** ([`CodecError`]): what can go wrong while doing so.
//!
//! ```text
//! Hash (digests) ─┐
//!                 ├─→ Session (manager, actor, snapshot) → Facade (guard)
//! Types (ids) ────┘
//! ```

mod codec;
mod error;
mod ids;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::CodecError;
pub use ids::{ManagerId, SessionId};
