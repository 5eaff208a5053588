//! Codec trait and implementations for manager snapshots.
//!
//! The session manager can be persisted as an opaque byte blob and rebuilt
//! from it later. It doesn't care HOW the blob is laid out; it just needs
//! something that implements [`Codec`]. Hosts that want a binary format
//! can plug one in without touching the manager.

use serde::{Serialize, de::DeserializeOwned};

use crate::CodecError;

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` so a codec can be handed to the manager's
/// background task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `CodecError::Encode` if the value can't be represented in
    /// this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `CodecError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// Readable snapshots are handy when a session store needs inspecting by
/// hand. Behind the `json` feature (enabled by default).
///
/// ## Example
///
/// ```rust
/// use tollgate_types::{Codec, JsonCodec, SessionId};
///
/// let codec = JsonCodec;
/// let id = SessionId::new("abc123");
///
/// let bytes = codec.encode(&id).unwrap();
/// let decoded: SessionId = codec.decode(&bytes).unwrap();
/// assert_eq!(id, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(CodecError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(data).map_err(CodecError::Decode)
    }
}
