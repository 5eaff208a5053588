//! Error types for snapshot encoding.

/// Errors that can occur while turning a manager snapshot into bytes or
/// reading one back.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The bytes are malformed, truncated, or don't describe a snapshot.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The bytes decoded but violate snapshot rules (for example two
    /// sessions sharing an id).
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}
