//! Inkstream Core - Shared Infrastructure
//!
//! This crate provides the shared infrastructure for the Inkstream realtime
//! whiteboard core:
//! - Config: fail-fast environment configuration
//! - Backoff: the capped exponential reconnect/retry schedule
//! - Alert: broadcast channel for operator-visible failures
//! - Tasks: at-least-once background task queue with observable failures

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alert;
pub mod backoff;
pub mod config;
pub mod error;
pub mod tasks;

pub use alert::{AlertBus, OperatorAlert, Severity};
pub use backoff::BackoffPolicy;
pub use config::{Config, DEFAULT_RPC_TIMEOUT};
pub use error::{Error, Result};
pub use tasks::{TaskFailure, TaskQueue};
