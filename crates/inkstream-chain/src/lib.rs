//! Inkstream Chain - Payments
//!
//! This crate handles the on-chain side of the whiteboard economy:
//! - Client: the chain node's JSON-RPC boundary (`ChainClient`) for
//!   submitting treasury transfers, fetching finalized transactions, and
//!   confirming submissions
//! - Verify: incoming payment verification with exact sender/receiver
//!   matching and a 1% amount tolerance, applied nowhere else
//! - Payout: two-phase revenue claims and admin withdrawals, with critical
//!   operator alerting when the chain leg fails after the store commit
//!
//! Payment faults are always fatal to the current action and never applied
//! partially.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod payout;
pub mod verify;

pub use client::{ChainClient, FinalizedTransfer, RpcChain, SubmittedTransfer};
pub use error::{Error, Result};
pub use payout::{PayoutOutcome, PayoutService};
pub use verify::{
    amount_within_tolerance, verify_incoming_payment, VerifyFailure, AMOUNT_TOLERANCE_PERCENT,
};
