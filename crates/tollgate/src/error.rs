//! Unified error type for Tollgate.

use tollgate_hash::HashError;
use tollgate_session::SessionError;
use tollgate_types::CodecError;

use crate::telemetry::TelemetryError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` conversions let `?` lift sub-crate errors into this one.
#[derive(Debug, thiserror::Error)]
pub enum TollgateError {
    /// Session lifecycle, lockout, provenance, role or config error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Hashing or comparing a credential failed.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// A snapshot couldn't be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Logging couldn't be set up.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_types::SessionId;

    #[test]
    fn test_from_session_error() {
        let err = SessionError::NotFound(SessionId::new("abcdef0123456789"));
        let tollgate_err: TollgateError = err.into();
        assert!(matches!(tollgate_err, TollgateError::Session(_)));
        // Display goes through transparently and stays redacted.
        assert_eq!(tollgate_err.to_string(), "session S-abcdef01 not found");
    }

    #[test]
    fn test_from_hash_error() {
        let err = HashError::UnsupportedStrategy("md5".into());
        let tollgate_err: TollgateError = err.into();
        assert!(matches!(tollgate_err, TollgateError::Hash(_)));
        assert!(tollgate_err.to_string().contains("md5"));
    }

    #[test]
    fn test_from_codec_error() {
        let err = CodecError::InvalidSnapshot("bad".into());
        let tollgate_err: TollgateError = err.into();
        assert!(matches!(tollgate_err, TollgateError::Codec(_)));
    }
}
