//! Error types for inkstream-canvas

use thiserror::Error;
use uuid::Uuid;

/// Canvas error type
#[derive(Debug, Error)]
pub enum Error {
    /// Session not found
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// No active session matches the join code
    #[error("unknown join code: {0}")]
    UnknownJoinCode(String),

    /// Join code failed validation before any lookup
    #[error("invalid join code: {0}")]
    InvalidJoinCode(String),

    /// Caller is not allowed to perform the operation
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Stroke has fewer than two points
    #[error("degenerate stroke: {points} point(s)")]
    DegenerateStroke {
        /// Points captured
        points: usize,
    },

    /// No stroke is currently being drawn
    #[error("no stroke in progress")]
    NoStrokeInProgress,
}

/// Result type alias for canvas operations
pub type Result<T> = std::result::Result<T, Error>;
