//! Incoming payment verification
//!
//! A purchase or paid nuke is only granted after the claimed transfer is
//! found finalized on chain with the expected sender, receiver, and amount.
//! Sender and receiver must match exactly; the amount tolerates up to 1%
//! relative deviation for rounding at the wallet side. Any mismatch is a
//! hard failure with a typed reason, never a partial grant.
//!
//! The tolerance applies here and only here. Balance arithmetic elsewhere
//! is exact.

use thiserror::Error;
use tracing::info;

use crate::client::{ChainClient, FinalizedTransfer};
use crate::error::Result;

/// Maximum relative deviation of the transferred amount, in percent.
pub const AMOUNT_TOLERANCE_PERCENT: u128 = 1;

/// Why an incoming payment was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyFailure {
    /// No finalized transaction exists for the signature
    #[error("transaction {0} not found or not finalized")]
    NotFound(String),

    /// The transaction finalized with an execution error
    #[error("transaction {signature} failed on chain: {err}")]
    TransactionFailed {
        /// Signature of the failed transaction
        signature: String,
        /// Error recorded on chain
        err: String,
    },

    /// The transfer came from the wrong wallet
    #[error("sender mismatch: expected {expected}, found {actual}")]
    SenderMismatch {
        /// Wallet the payment was expected from
        expected: String,
        /// Wallet that actually sent it
        actual: String,
    },

    /// The transfer went to the wrong wallet
    #[error("receiver mismatch: expected {expected}, found {actual}")]
    ReceiverMismatch {
        /// Wallet the payment was expected to reach
        expected: String,
        /// Wallet that actually received it
        actual: String,
    },

    /// The amount deviates more than the tolerance allows
    #[error("amount {actual} lamports outside {AMOUNT_TOLERANCE_PERCENT}% of expected {expected}")]
    AmountOutOfTolerance {
        /// Expected amount in lamports
        expected: u64,
        /// Transferred amount in lamports
        actual: u64,
    },
}

/// Whether `actual` is within the tolerance of `expected`.
///
/// Integer arithmetic in u128: `|actual - expected| * 100 <= expected *
/// tolerance`, so the boundary itself passes.
#[must_use]
pub fn amount_within_tolerance(expected: u64, actual: u64) -> bool {
    let expected = u128::from(expected);
    let actual = u128::from(actual);
    let deviation = expected.abs_diff(actual);
    deviation * 100 <= expected * AMOUNT_TOLERANCE_PERCENT
}

/// Verify a claimed incoming payment against expectations.
///
/// Returns the finalized transfer on success so the caller can record its
/// fee and signature. Entitlements may be granted only after this returns
/// `Ok`.
pub async fn verify_incoming_payment(
    chain: &dyn ChainClient,
    signature: &str,
    expected_sender: &str,
    expected_receiver: &str,
    expected_lamports: u64,
) -> Result<FinalizedTransfer> {
    let transfer = chain
        .finalized_transfer(signature)
        .await?
        .ok_or_else(|| VerifyFailure::NotFound(signature.to_string()))?;

    if let Some(err) = &transfer.err {
        return Err(VerifyFailure::TransactionFailed {
            signature: signature.to_string(),
            err: err.clone(),
        }
        .into());
    }
    if transfer.sender != expected_sender {
        return Err(VerifyFailure::SenderMismatch {
            expected: expected_sender.to_string(),
            actual: transfer.sender,
        }
        .into());
    }
    if transfer.receiver != expected_receiver {
        return Err(VerifyFailure::ReceiverMismatch {
            expected: expected_receiver.to_string(),
            actual: transfer.receiver,
        }
        .into());
    }
    if !amount_within_tolerance(expected_lamports, transfer.lamports) {
        return Err(VerifyFailure::AmountOutOfTolerance {
            expected: expected_lamports,
            actual: transfer.lamports,
        }
        .into());
    }

    info!(
        signature,
        sender = %transfer.sender,
        lamports = transfer.lamports,
        "incoming payment verified"
    );
    Ok(transfer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockChainClient;
    use crate::error::Error;

    const SENDER: &str = "Buyer1111";
    const TREASURY: &str = "Treasury1111";

    fn transfer(lamports: u64) -> FinalizedTransfer {
        FinalizedTransfer {
            signature: "5Sig".into(),
            sender: SENDER.into(),
            receiver: TREASURY.into(),
            lamports,
            err: None,
            fee_lamports: 5_000,
        }
    }

    fn chain_with(result: Option<FinalizedTransfer>) -> MockChainClient {
        let mut chain = MockChainClient::new();
        chain
            .expect_finalized_transfer()
            .returning(move |_| Ok(result.clone()));
        chain
    }

    async fn verify(chain: &MockChainClient, expected_lamports: u64) -> Result<FinalizedTransfer> {
        verify_incoming_payment(chain, "5Sig", SENDER, TREASURY, expected_lamports).await
    }

    #[tokio::test]
    async fn test_exact_amount_verifies() {
        let chain = chain_with(Some(transfer(1_000_000)));
        assert!(verify(&chain, 1_000_000).await.is_ok());
    }

    #[tokio::test]
    async fn test_half_percent_short_passes() {
        let chain = chain_with(Some(transfer(995_000)));
        assert!(verify(&chain, 1_000_000).await.is_ok());
    }

    #[tokio::test]
    async fn test_two_percent_short_fails() {
        let chain = chain_with(Some(transfer(980_000)));
        let err = verify(&chain, 1_000_000).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Verification(VerifyFailure::AmountOutOfTolerance {
                expected: 1_000_000,
                actual: 980_000,
            })
        ));
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        // exactly 1% off passes, one lamport past it fails
        assert!(amount_within_tolerance(1_000_000, 990_000));
        assert!(!amount_within_tolerance(1_000_000, 989_999));
        // overpayment is held to the same bound
        assert!(amount_within_tolerance(1_000_000, 1_010_000));
        assert!(!amount_within_tolerance(1_000_000, 1_010_001));
    }

    #[tokio::test]
    async fn test_missing_transaction_fails() {
        let chain = chain_with(None);
        let err = verify(&chain, 1_000_000).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Verification(VerifyFailure::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_errored_transaction_fails() {
        let mut failed = transfer(1_000_000);
        failed.err = Some("InstructionError".into());
        let chain = chain_with(Some(failed));
        let err = verify(&chain, 1_000_000).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Verification(VerifyFailure::TransactionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_wrong_receiver_fails_even_with_exact_amount() {
        let mut diverted = transfer(1_000_000);
        diverted.receiver = "Mallory1111".into();
        let chain = chain_with(Some(diverted));
        let err = verify(&chain, 1_000_000).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Verification(VerifyFailure::ReceiverMismatch { .. })
        ));
    }
}
