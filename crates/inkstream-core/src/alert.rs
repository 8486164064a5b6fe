//! Operator alert channel
//!
//! Broadcast-based channel for failures that need a human: exhausted
//! background tasks and two-phase claim/payout mismatches. Subscribers
//! (log shippers, pager integrations) receive every alert; slow subscribers
//! lag rather than block the publisher.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// How urgent an alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Degraded but self-healing
    Warning,
    /// Requires manual intervention (e.g. ledger debited but payout failed)
    Critical,
}

/// An operator-visible failure report.
#[derive(Debug, Clone, Serialize)]
pub struct OperatorAlert {
    /// Alert severity
    pub severity: Severity,
    /// Component that raised the alert
    pub source: String,
    /// Human-readable description
    pub message: String,
    /// When the alert was raised
    pub at: DateTime<Utc>,
}

/// Broadcast bus for operator alerts.
#[derive(Debug, Clone)]
pub struct AlertBus {
    tx: broadcast::Sender<OperatorAlert>,
}

impl AlertBus {
    /// Create a bus with the given buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to alerts.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OperatorAlert> {
        self.tx.subscribe()
    }

    /// Publish an alert. Also logs it so alerts are visible even with no
    /// subscriber attached.
    pub fn publish(&self, severity: Severity, source: impl Into<String>, message: impl Into<String>) {
        let alert = OperatorAlert {
            severity,
            source: source.into(),
            message: message.into(),
            at: Utc::now(),
        };
        match alert.severity {
            Severity::Warning => {
                tracing::warn!(source = %alert.source, message = %alert.message, "operator alert");
            }
            Severity::Critical => {
                tracing::error!(source = %alert.source, message = %alert.message, "operator alert");
            }
        }
        let _ = self.tx.send(alert);
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for AlertBus {
    fn default() -> Self {
        Self::new(256)
    }
}
