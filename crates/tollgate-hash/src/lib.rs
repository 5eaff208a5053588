//! Credential hashing for Tollgate.
//!
//! A pure, stateless layer: [`hash`] turns a secret into an opaque
//! [`Digest`] and [`compare`] checks a secret against one. The
//! [`HashStrategy`] picks the algorithm family and [`HashStrength`] its
//! work factor or round count.
//!
//! ```rust
//! use tollgate_hash::{compare, hash, HashStrategy, HashStrength};
//!
//! let digest = hash("hunter2", HashStrategy::Sha512, HashStrength::MIN).unwrap();
//! assert!(compare("hunter2", &digest, HashStrategy::Sha512).is_ok());
//! assert!(compare("hunter3", &digest, HashStrategy::Sha512).is_err());
//! ```

mod error;
mod hasher;
mod strategy;

pub use error::HashError;
pub use hasher::{BCRYPT_MAX_SECRET, CredentialHasher, Digest, compare, hash};
pub use strategy::{HashStrategy, HashStrength};
