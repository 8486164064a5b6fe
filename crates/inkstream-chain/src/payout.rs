//! Two-phase payouts
//!
//! Revenue claims and admin withdrawals coordinate two external systems
//! that cannot be committed atomically: the durable store reserves the
//! funds first, then the chain transfer is submitted and confirmed, then
//! the audit record is written. A chain-leg failure after the store commit
//! leaves funds decremented ledger-side but unpaid. That gap is inherent to
//! at-least-once claims over an at-most-once payout; the response is a
//! critical operator alert and manual reconciliation, never an automatic
//! retry, since a blind resubmit risks paying twice.

use std::sync::Arc;

use tracing::{error, info, warn};

use inkstream_core::{AlertBus, Severity};
use inkstream_ledger::{DurableStore, TransactionKind, TransactionRecord};

use crate::client::ChainClient;
use crate::error::{Error, Result};
use crate::verify::verify_incoming_payment;

/// Result of a completed payout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutOutcome {
    /// Amount paid out, in lamports
    pub lamports: u64,
    /// On-chain signature of the transfer
    pub signature: String,
    /// Network fee paid, in lamports
    pub fee_lamports: u64,
}

/// Coordinates store-side claims with on-chain transfers.
pub struct PayoutService {
    store: Arc<dyn DurableStore>,
    chain: Arc<dyn ChainClient>,
    alerts: AlertBus,
}

impl PayoutService {
    /// Create a payout service.
    #[must_use]
    pub fn new(store: Arc<dyn DurableStore>, chain: Arc<dyn ChainClient>, alerts: AlertBus) -> Self {
        Self {
            store,
            chain,
            alerts,
        }
    }

    /// Claim all of a streamer's unclaimed revenue and pay it out.
    ///
    /// The store zeroes the unclaimed balance before the transfer is
    /// submitted; see the module docs for what happens when the chain leg
    /// fails after that point.
    pub async fn claim_revenue(&self, streamer_wallet: &str) -> Result<PayoutOutcome> {
        let lamports = self.store.claim_all_revenue(streamer_wallet).await?;
        if lamports == 0 {
            return Err(Error::NothingToClaim);
        }

        let outcome = self.pay_out(streamer_wallet, lamports).await?;

        let record = TransactionRecord::new(
            TransactionKind::RevenueClaim,
            lamports,
            Some(outcome.signature.clone()),
            format!("revenue claim by {streamer_wallet}"),
        );
        let transaction_id = match self.store.record_transaction(&record).await {
            Ok(id) => id,
            Err(e) => {
                return Err(self.reconciliation(
                    streamer_wallet,
                    lamports,
                    format!("paid out in {} but audit record failed: {e}", outcome.signature),
                ));
            }
        };
        self.append_fee(transaction_id, outcome.fee_lamports).await;

        info!(
            wallet = streamer_wallet,
            lamports,
            signature = %outcome.signature,
            "revenue claim paid out"
        );
        Ok(outcome)
    }

    /// Withdraw the platform's accumulated revenue to `destination`.
    ///
    /// The store creates the audit row when it reserves the funds; only the
    /// settlement fee is appended here.
    pub async fn admin_withdraw(&self, destination: &str) -> Result<PayoutOutcome> {
        let withdrawal = self.store.admin_withdraw_revenue().await?;
        if withdrawal.lamports == 0 {
            return Err(Error::NothingToClaim);
        }

        let outcome = self.pay_out(destination, withdrawal.lamports).await?;
        self.append_fee(withdrawal.transaction_id, outcome.fee_lamports)
            .await;

        info!(
            destination,
            lamports = withdrawal.lamports,
            signature = %outcome.signature,
            "admin withdrawal paid out"
        );
        Ok(outcome)
    }

    /// Verify a claimed incoming payment and write its audit record.
    ///
    /// The caller grants entitlements only after this returns the record
    /// id. `kind` distinguishes line purchases from paid nukes.
    pub async fn verify_and_record_purchase(
        &self,
        signature: &str,
        buyer_wallet: &str,
        treasury_wallet: &str,
        expected_lamports: u64,
        kind: TransactionKind,
    ) -> Result<i64> {
        let transfer = verify_incoming_payment(
            self.chain.as_ref(),
            signature,
            buyer_wallet,
            treasury_wallet,
            expected_lamports,
        )
        .await?;

        let record = TransactionRecord::new(
            kind,
            transfer.lamports,
            Some(transfer.signature),
            format!("verified payment from {buyer_wallet}"),
        );
        Ok(self.store.record_transaction(&record).await?)
    }

    /// Submit and confirm a transfer. Both legs run after the store has
    /// already committed, so failures are reconciliation problems.
    async fn pay_out(&self, destination: &str, lamports: u64) -> Result<PayoutOutcome> {
        let submitted = match self.chain.submit_transfer(destination, lamports).await {
            Ok(submitted) => submitted,
            Err(e) => {
                return Err(self.reconciliation(
                    destination,
                    lamports,
                    format!("transfer submission failed: {e}"),
                ));
            }
        };

        match self.chain.confirm(&submitted).await {
            Ok(fee_lamports) => Ok(PayoutOutcome {
                lamports,
                signature: submitted.signature,
                fee_lamports,
            }),
            Err(e) => Err(self.reconciliation(
                destination,
                lamports,
                format!("transfer {} not confirmed: {e}", submitted.signature),
            )),
        }
    }

    /// The fee is an audit detail; its absence does not undo a payout.
    async fn append_fee(&self, transaction_id: i64, fee_lamports: u64) {
        if let Err(e) = self
            .store
            .append_claim_fee(transaction_id, fee_lamports)
            .await
        {
            warn!(transaction_id, fee_lamports, error = %e, "failed to append claim fee");
            self.alerts.publish(
                Severity::Warning,
                "payouts",
                format!("audit row {transaction_id} is missing its {fee_lamports} lamport fee: {e}"),
            );
        }
    }

    fn reconciliation(&self, wallet: &str, lamports: u64, context: String) -> Error {
        error!(wallet, lamports, %context, "payout requires manual reconciliation");
        self.alerts.publish(
            Severity::Critical,
            "payouts",
            format!("{lamports} lamports claimed for {wallet} but not paid out: {context}"),
        );
        Error::Reconciliation { lamports, context }
    }
}
