//! Error types for inkstream-ledger

use thiserror::Error;

/// Ledger error type
#[derive(Debug, Error)]
pub enum Error {
    /// Local advisory balance has no credit of the needed kind
    #[error("insufficient credits: {0}")]
    InsufficientCredits(String),

    /// Input rejected before any RPC (negative gift, degenerate stroke)
    #[error("validation error: {0}")]
    Validation(String),

    /// Durable-store RPC failed
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Durable-store RPC rejected the request
    #[error("rpc rejected ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the store
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// RPC exceeded its deadline
    #[error("timeout after {waited_ms}ms: {operation}")]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// How long the caller waited
        waited_ms: u64,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a persistence error
    #[must_use]
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a validation error
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether retrying the same call could help. Spends are never retried
    /// regardless (duplicate-charge risk); this informs read paths only.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Timeout { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                operation: err
                    .url()
                    .map(|u| u.path().to_string())
                    .unwrap_or_else(|| "rpc".into()),
                waited_ms: 0,
            }
        } else {
            Self::Persistence(err.to_string())
        }
    }
}

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, Error>;
