//! Error types for inkstream-core
//!
//! Faults raised by the shared utilities in this crate: configuration that
//! fails fast at startup and serialization of alert/task payloads. Domain
//! faults (transport, persistence, payment) live in the crate that raises
//! them.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before any remote call (malformed value, out-of-range
    /// rate, zero timeout)
    #[error("validation error: {0}")]
    Validation(String),

    /// Required secret or endpoint is missing; the service refuses to start
    /// rather than attempt degraded operation
    #[error("service not configured: missing {0}")]
    NotConfigured(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::NotConfigured("CHAIN_RPC_URL".into());
        assert!(err.to_string().contains("service not configured"));
        let err = Error::Validation("streamer share must be a fraction".into());
        assert!(err.to_string().starts_with("validation error"));
    }

    #[test]
    fn test_serde_error_converts() {
        let parse = serde_json::from_str::<u64>("not a number").unwrap_err();
        assert!(matches!(Error::from(parse), Error::Serialization(_)));
    }
}
