//! Inkstream Ledger - Credit Consistency
//!
//! This crate ties drawing and nuke actions to a spendable balance:
//! - Store: the durable store's named-procedure contract (`DurableStore`)
//!   and its reqwest-backed implementation
//! - Balance: nonnegative credit counters with exact-rollback debits
//! - Cache: the injected TTL display cache (advisory only; the server is
//!   the authority on sufficiency of funds)
//! - Client: optimistic spend-and-persist with rollback on failure and no
//!   automatic retry (a failed spend is abandoned, never resubmitted)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod cache;
pub mod client;
pub mod error;
pub mod rpc;
pub mod store;

pub use balance::{CreditBalance, DebitReceipt};
pub use cache::BalanceCache;
pub use client::LedgerClient;
pub use error::{Error, Result};
pub use rpc::RpcStore;
pub use store::{
    DurableStore, RevenueSummary, TransactionKind, TransactionRecord, UserStats, Withdrawal,
};
