//! Durable store contract
//!
//! The relational store and its stored procedures are an external
//! collaborator: this module specifies only the request/response contract
//! the core depends on. Debit and action persistence are atomic on the
//! server. If persistence fails, no credit is consumed server-side.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use inkstream_canvas::Stroke;

use crate::error::Result;

/// Aggregate per-user stats for the dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserStats {
    /// Purchased line credits (global scope)
    pub line_credits: u64,
    /// Revenue not yet claimed, in lamports
    pub unclaimed_lamports: u64,
    /// Revenue claimed to date, in lamports
    pub total_claimed_lamports: u64,
    /// Display name, if set
    pub username: Option<String>,
    /// Lines gifted by this user this week
    pub lines_gifted_this_week: u64,
    /// Nukes gifted by this user this week
    pub nukes_gifted_this_week: u64,
    /// Session-scoped free lines currently held
    pub total_free_lines: u64,
    /// Session-scoped free nukes currently held
    pub total_free_nukes: u64,
}

/// Unaggregated revenue figures, used as the stats fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevenueSummary {
    /// Revenue not yet claimed, in lamports
    pub unclaimed_lamports: u64,
    /// Revenue claimed to date, in lamports
    pub total_claimed_lamports: u64,
}

/// Result of an admin revenue withdrawal reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Amount reserved, in lamports
    pub lamports: u64,
    /// Audit row created by the store for this withdrawal
    pub transaction_id: i64,
}

/// Kind of financial action recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Line credit purchase
    Purchase,
    /// Paid nuke
    NukePurchase,
    /// Streamer revenue claim
    RevenueClaim,
}

/// Immutable audit row for a completed financial action. Never mutated
/// after insertion except to append the fee once on-chain settlement is
/// known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// What kind of action this records
    pub kind: TransactionKind,
    /// Amount in lamports
    pub lamports: u64,
    /// On-chain signature, if the action settled on chain
    pub signature: Option<String>,
    /// Free-text note
    pub note: String,
    /// When the record was created
    pub at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Create a record stamped with the current time.
    #[must_use]
    pub fn new(kind: TransactionKind, lamports: u64, signature: Option<String>, note: impl Into<String>) -> Self {
        Self {
            kind,
            lamports,
            signature,
            note: note.into(),
            at: Utc::now(),
        }
    }
}

/// Named-procedure contract of the durable store.
///
/// Every call carries a bounded deadline; callers map deadline misses to
/// [`Error::Timeout`](crate::Error::Timeout). Credit debits are atomic with
/// the action they pay for.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Idempotent upsert of a user and their revenue record.
    async fn ensure_user(&self, wallet: &str) -> Result<()>;

    /// One-call aggregate of the user's credits, revenue, and gift stats.
    async fn user_aggregate_stats(&self, wallet: &str) -> Result<UserStats>;

    /// Unaggregated fallback: purchased line credits only.
    async fn line_credits(&self, wallet: &str) -> Result<u64>;

    /// Unaggregated fallback: revenue figures only.
    async fn revenue(&self, wallet: &str) -> Result<RevenueSummary>;

    /// Atomically spend one line credit and persist the stroke. Returns the
    /// server-assigned sequence id.
    async fn spend_credit_and_draw(
        &self,
        wallet: &str,
        stroke: &Stroke,
        session_id: Uuid,
    ) -> Result<i64>;

    /// Batch-persist strokes without a credit spend (viewer-broadcast path).
    async fn add_drawing_segments(&self, session_id: Uuid, strokes: &[Stroke]) -> Result<()>;

    /// Atomically debit the nuke revenue split and record the cleanup.
    async fn perform_nuke_cleanup(
        &self,
        wallet: &str,
        session_id: Uuid,
        revenue_per_nuke: u64,
        streamer_share: f64,
    ) -> Result<()>;

    /// Reserve and zero out all unclaimed revenue. Returns the claimed
    /// amount in lamports.
    async fn claim_all_revenue(&self, wallet: &str) -> Result<u64>;

    /// Reserve the platform's accumulated revenue for withdrawal.
    async fn admin_withdraw_revenue(&self) -> Result<Withdrawal>;

    /// Gift session-scoped free lines/nukes from the owner to a viewer.
    /// Returns a confirmation message.
    async fn gift_credits(
        &self,
        owner: &str,
        session_id: Uuid,
        viewer: &str,
        lines: u64,
        nukes: u64,
    ) -> Result<String>;

    /// Authoritative stroke set for a session, used for resync.
    async fn session_strokes(&self, session_id: Uuid) -> Result<Vec<Stroke>>;

    /// Append an immutable audit row. Returns its id.
    async fn record_transaction(&self, record: &TransactionRecord) -> Result<i64>;

    /// Append the settlement fee to an existing audit row.
    async fn append_claim_fee(&self, transaction_id: i64, fee_lamports: u64) -> Result<()>;
}
