//! Error types for inkstream-chain

use thiserror::Error;

use crate::verify::VerifyFailure;

/// Chain error type
#[derive(Debug, Error)]
pub enum Error {
    /// Chain RPC transport fault
    #[error("chain rpc error: {0}")]
    Chain(String),

    /// Chain RPC returned a structured error object
    #[error("chain rpc rejected ({code}): {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
    },

    /// A submitted transfer expired without confirmation
    #[error("transfer {0} was not confirmed before its blockhash expired")]
    NotConfirmed(String),

    /// Claim requested with no revenue to pay out
    #[error("no unclaimed revenue")]
    NothingToClaim,

    /// Incoming payment failed verification; always fatal to the action
    #[error("payment verification failed: {0}")]
    Verification(#[from] VerifyFailure),

    /// The store committed a claim but the chain leg failed. Funds are
    /// reserved ledger-side and not paid out; requires manual
    /// reconciliation, never an automatic retry.
    #[error("reconciliation required: {lamports} lamports claimed but not paid out ({context})")]
    Reconciliation {
        /// Amount reserved by the store, in lamports
        lamports: u64,
        /// Which leg failed and why
        context: String,
    },

    /// Durable-store call failed
    #[error(transparent)]
    Ledger(#[from] inkstream_ledger::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Chain(err.to_string())
    }
}

/// Result type alias for chain operations
pub type Result<T> = std::result::Result<T, Error>;
