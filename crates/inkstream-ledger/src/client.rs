//! Credit ledger client
//!
//! Implements the optimistic spend protocol: the caller's local balance is
//! debited before the RPC resolves, rolled back exactly if the store
//! reports failure, and the action is abandoned rather than resubmitted.
//! Without idempotency keys, a blind retry risks a duplicate charge. The
//! durable store is the sole authority on sufficiency of funds; local
//! checks and the display cache are advisory.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use inkstream_canvas::Stroke;
use inkstream_core::{TaskQueue, DEFAULT_RPC_TIMEOUT};

use crate::balance::CreditBalance;
use crate::cache::BalanceCache;
use crate::error::{Error, Result};
use crate::store::{DurableStore, RevenueSummary, UserStats};

/// Client for spend-and-persist calls against the durable store.
pub struct LedgerClient {
    store: Arc<dyn DurableStore>,
    cache: Arc<BalanceCache>,
    stats_timeout: Duration,
}

impl LedgerClient {
    /// Create a client over a store and an injected display cache.
    #[must_use]
    pub fn new(store: Arc<dyn DurableStore>, cache: Arc<BalanceCache>) -> Self {
        Self {
            store,
            cache,
            stats_timeout: DEFAULT_RPC_TIMEOUT,
        }
    }

    /// Override the aggregate-stats deadline.
    #[must_use]
    pub fn with_stats_timeout(mut self, timeout: Duration) -> Self {
        self.stats_timeout = timeout;
        self
    }

    /// Idempotent upsert of the user and their revenue record.
    pub async fn ensure_user(&self, wallet: &str) -> Result<()> {
        self.store.ensure_user(wallet).await
    }

    /// Spend one line credit and persist the stroke.
    ///
    /// The local balance is decremented before the call; on failure it is
    /// rolled back and the error surfaced; the action is abandoned, never
    /// retried. An empty local balance does not block the call: the server
    /// decides sufficiency. Returns the server-assigned sequence id.
    pub async fn spend_and_persist(
        &self,
        wallet: &str,
        session_id: Uuid,
        stroke: &Stroke,
        balance: &mut CreditBalance,
    ) -> Result<i64> {
        if !stroke.is_drawable() {
            return Err(Error::validation(format!(
                "degenerate stroke with {} point(s)",
                stroke.points.len()
            )));
        }

        // optimistic decrement; kept only if the server commits
        let receipt = balance.debit_line().ok();

        match self
            .store
            .spend_credit_and_draw(wallet, stroke, session_id)
            .await
        {
            Ok(seq) => {
                self.cache.invalidate(wallet);
                debug!(wallet, %session_id, seq, "stroke persisted");
                Ok(seq)
            }
            Err(e) => {
                if let Some(receipt) = receipt {
                    balance.refund(receipt);
                }
                self.cache.invalidate(wallet);
                warn!(wallet, %session_id, error = %e, "spend failed, rolled back");
                Err(e)
            }
        }
    }

    /// Spend a free nuke: local debit, then the atomic cleanup procedure.
    /// Rolls the debit back on failure; never retried.
    pub async fn spend_free_nuke(
        &self,
        wallet: &str,
        session_id: Uuid,
        balance: &mut CreditBalance,
        revenue_per_nuke: u64,
        streamer_share: f64,
    ) -> Result<()> {
        let receipt = balance.debit_nuke().ok();

        match self
            .store
            .perform_nuke_cleanup(wallet, session_id, revenue_per_nuke, streamer_share)
            .await
        {
            Ok(()) => {
                self.cache.invalidate(wallet);
                Ok(())
            }
            Err(e) => {
                if let Some(receipt) = receipt {
                    balance.refund(receipt);
                }
                self.cache.invalidate(wallet);
                Err(e)
            }
        }
    }

    /// Enqueue the post-nuke cleanup as an at-least-once background task.
    ///
    /// Failures surface on the queue's failure channel and the alert bus
    /// rather than disappearing into a log line.
    pub async fn schedule_nuke_cleanup(
        &self,
        queue: &TaskQueue,
        wallet: &str,
        session_id: Uuid,
        revenue_per_nuke: u64,
        streamer_share: f64,
    ) -> bool {
        let store = self.store.clone();
        let wallet = wallet.to_string();
        queue
            .submit("nuke_cleanup", move || {
                let store = store.clone();
                let wallet = wallet.clone();
                async move {
                    store
                        .perform_nuke_cleanup(&wallet, session_id, revenue_per_nuke, streamer_share)
                        .await
                        .map_err(|e| e.to_string())
                }
            })
            .await
    }

    /// Display stats for a wallet, through the cache.
    ///
    /// The aggregate procedure runs under a bounded deadline; on a miss the
    /// client falls back to the two unaggregated queries rather than
    /// blocking the dashboard.
    pub async fn stats(&self, wallet: &str) -> Result<UserStats> {
        if let Some(cached) = self.cache.get(wallet) {
            return Ok(cached);
        }

        let stats = match tokio::time::timeout(
            self.stats_timeout,
            self.store.user_aggregate_stats(wallet),
        )
        .await
        {
            Ok(Ok(stats)) => stats,
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                warn!(
                    wallet,
                    waited_ms = self.stats_timeout.as_millis() as u64,
                    "aggregate stats timed out, using unaggregated fallback"
                );
                let line_credits = self.store.line_credits(wallet).await?;
                let RevenueSummary {
                    unclaimed_lamports,
                    total_claimed_lamports,
                } = self.store.revenue(wallet).await?;
                UserStats {
                    line_credits,
                    unclaimed_lamports,
                    total_claimed_lamports,
                    ..UserStats::default()
                }
            }
        };

        self.cache.put(wallet, stats.clone());
        Ok(stats)
    }

    /// Gift session-scoped credits from the owner to a viewer.
    ///
    /// Negative or all-zero amounts are a synchronous validation fault; no
    /// RPC is made.
    pub async fn gift(
        &self,
        owner: &str,
        session_id: Uuid,
        viewer: &str,
        lines: i64,
        nukes: i64,
    ) -> Result<String> {
        if lines < 0 || nukes < 0 {
            return Err(Error::validation("gift amounts must be nonnegative"));
        }
        if lines == 0 && nukes == 0 {
            return Err(Error::validation("nothing to gift"));
        }

        let message = self
            .store
            .gift_credits(owner, session_id, viewer, lines as u64, nukes as u64)
            .await?;
        self.cache.invalidate(viewer);
        Ok(message)
    }

    /// Batch-persist strokes without a credit spend (viewer-broadcast
    /// path). Degenerate strokes are dropped before the call.
    pub async fn persist_segments(&self, session_id: Uuid, strokes: Vec<Stroke>) -> Result<()> {
        let strokes: Vec<Stroke> = strokes.into_iter().filter(|s| s.is_drawable()).collect();
        if strokes.is_empty() {
            return Ok(());
        }
        self.store.add_drawing_segments(session_id, &strokes).await
    }

    /// Authoritative stroke set for a session. Called by the session view
    /// whenever the supervisor signals a resync.
    pub async fn resync(&self, session_id: Uuid) -> Result<Vec<Stroke>> {
        self.store.session_strokes(session_id).await
    }
}
