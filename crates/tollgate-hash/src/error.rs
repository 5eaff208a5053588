//! Error types for the hashing layer.

use crate::HashStrategy;

/// Errors produced while hashing or comparing credentials.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// The requested strategy name isn't one Tollgate offers.
    #[error("hash strategy {0:?} is not supported")]
    UnsupportedStrategy(String),

    /// The secret doesn't match the stored digest.
    #[error("password does not match")]
    PasswordMismatch,

    /// The digest bytes weren't produced by the given strategy
    /// (wrong length, bad header, not a bcrypt string).
    #[error("digest is not a valid {0} digest")]
    MalformedDigest(HashStrategy),

    /// A strength value fell outside the supported range.
    #[error("hash strength {requested} is outside {min}..={max}")]
    StrengthOutOfRange {
        requested: u32,
        min: u32,
        max: u32,
    },

    /// The secret is longer than bcrypt can take in full.
    #[error("secret is {len} bytes; bcrypt accepts at most {max}")]
    SecretTooLong { len: usize, max: usize },

    /// The bcrypt implementation rejected the input.
    #[error("bcrypt failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}
