//! Credit balance arithmetic
//!
//! Counters are nonnegative and never wrap. Debits hand back a receipt so
//! a failed spend can be rolled back exactly, leaving the
//! externally-observable balance unchanged. Session-scoped free credits are
//! consumed before purchased ones.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Advisory local copy of a user's spendable credits. The durable store is
/// the authority; this copy exists for optimistic UI only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBalance {
    /// Purchased lines at the standard price (global scope)
    pub purchased_lines: u64,
    /// Purchased lines at the discounted price (global scope)
    pub discounted_lines: u64,
    /// Gifted free lines (session scope)
    pub free_lines: u64,
    /// Gifted free nukes (session scope)
    pub free_nukes: u64,
}

/// Which counter a debit came from; used for exact rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitReceipt {
    /// One free line was consumed
    FreeLine,
    /// One discounted line was consumed
    DiscountedLine,
    /// One standard purchased line was consumed
    PurchasedLine,
    /// One free nuke was consumed
    FreeNuke,
}

impl CreditBalance {
    /// Total lines available to draw with.
    #[must_use]
    pub fn total_lines(&self) -> u64 {
        self.purchased_lines + self.discounted_lines + self.free_lines
    }

    /// Advisory check: can the user draw? Never gates the server call.
    #[must_use]
    pub fn can_draw(&self) -> bool {
        self.total_lines() > 0
    }

    /// Advisory check: does the user hold a free nuke?
    #[must_use]
    pub fn can_nuke_free(&self) -> bool {
        self.free_nukes > 0
    }

    /// Consume one line, free credits first, then discounted, then
    /// standard.
    pub fn debit_line(&mut self) -> Result<DebitReceipt> {
        if self.free_lines > 0 {
            self.free_lines -= 1;
            Ok(DebitReceipt::FreeLine)
        } else if self.discounted_lines > 0 {
            self.discounted_lines -= 1;
            Ok(DebitReceipt::DiscountedLine)
        } else if self.purchased_lines > 0 {
            self.purchased_lines -= 1;
            Ok(DebitReceipt::PurchasedLine)
        } else {
            Err(Error::InsufficientCredits("no line credits".into()))
        }
    }

    /// Consume one free nuke.
    pub fn debit_nuke(&mut self) -> Result<DebitReceipt> {
        if self.free_nukes > 0 {
            self.free_nukes -= 1;
            Ok(DebitReceipt::FreeNuke)
        } else {
            Err(Error::InsufficientCredits("no free nukes".into()))
        }
    }

    /// Roll a debit back exactly.
    pub fn refund(&mut self, receipt: DebitReceipt) {
        match receipt {
            DebitReceipt::FreeLine => self.free_lines += 1,
            DebitReceipt::DiscountedLine => self.discounted_lines += 1,
            DebitReceipt::PurchasedLine => self.purchased_lines += 1,
            DebitReceipt::FreeNuke => self.free_nukes += 1,
        }
    }
}
