//! Capped exponential backoff schedule
//!
//! The reconnect supervisor and the background task queue share the same
//! jitter-free schedule: `min(cap, base * 2^(attempt-1))`.

use std::time::Duration;

/// Backoff schedule for reconnects and background retries.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    pub base: Duration,
    /// Ceiling applied to the doubled delay
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        // 1s, 2s, 4s, 8s, 16s, then 30s forever
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    /// Create a policy with an explicit base and cap.
    #[must_use]
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Delay to wait before the given attempt (1-based).
    ///
    /// Attempt 0 is treated as attempt 1. The doubling saturates at the cap,
    /// so attempts are unbounded without overflow.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let factor = 1u64 << exponent;
        let delay_ms = (self.base.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.cap.as_millis() as u64))
    }
}
