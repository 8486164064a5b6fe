//! Error types for inkstream-realtime

use thiserror::Error;

/// Realtime transport error type
#[derive(Debug, Error)]
pub enum Error {
    /// No live subscription; messages sent while disconnected are lost
    #[error("not subscribed")]
    NotSubscribed,

    /// The subscription or channel was closed
    #[error("connection closed")]
    Closed,

    /// Transport-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The supervisor task is gone
    #[error("supervisor shut down")]
    SupervisorGone,

    /// Invalid wire message
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a transport error
    #[must_use]
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Whether the reconnect supervisor can recover from this error.
    /// Transport faults are never user-fatal.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Closed | Self::Transport(_) | Self::NotSubscribed)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for realtime operations
pub type Result<T> = std::result::Result<T, Error>;
