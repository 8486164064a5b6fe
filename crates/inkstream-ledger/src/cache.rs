//! Display balance cache
//!
//! An explicit, injected read-through cache for display stats, replacing
//! ambient module-level maps. Capacity and TTL are fixed at construction;
//! write paths that mutate the underlying record (spend, gift, purchase,
//! cleanup) call [`invalidate`](BalanceCache::invalidate) explicitly.
//!
//! Cached values are advisory: they are never consulted to decide whether
//! an action may proceed to the server.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::store::UserStats;

/// Default freshness window for display stats.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

struct Entry {
    stats: UserStats,
    inserted: Instant,
}

/// TTL + capacity bounded cache keyed by wallet.
pub struct BalanceCache {
    ttl: Duration,
    capacity: usize,
    inner: Mutex<HashMap<String, Entry>>,
}

impl BalanceCache {
    /// Create a cache with the given capacity and TTL.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            ttl,
            capacity,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh stats for a wallet, if cached.
    #[must_use]
    pub fn get(&self, wallet: &str) -> Option<UserStats> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.get(wallet) {
            Some(entry) if entry.inserted.elapsed() < self.ttl => Some(entry.stats.clone()),
            Some(_) => {
                inner.remove(wallet);
                None
            }
            None => None,
        }
    }

    /// Insert stats, evicting the oldest entry when at capacity.
    pub fn put(&self, wallet: impl Into<String>, stats: UserStats) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let wallet = wallet.into();
        if !inner.contains_key(&wallet) && inner.len() >= self.capacity {
            if let Some(oldest) = inner
                .iter()
                .min_by_key(|(_, e)| e.inserted)
                .map(|(k, _)| k.clone())
            {
                inner.remove(&oldest);
            }
        }
        inner.insert(
            wallet,
            Entry {
                stats,
                inserted: Instant::now(),
            },
        );
    }

    /// Drop a wallet's entry. Called by every write path that changes the
    /// underlying record.
    pub fn invalidate(&self, wallet: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.remove(wallet);
    }

    /// Number of entries, fresh or stale.
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BalanceCache {
    fn default() -> Self {
        Self::new(1024, DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(lines: u64) -> UserStats {
        UserStats {
            line_credits: lines,
            ..UserStats::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = BalanceCache::new(16, Duration::from_secs(30));
        cache.put("wallet1", stats(5));
        assert_eq!(cache.get("wallet1").unwrap().line_credits, 5);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cache.get("wallet1").is_none());
        // the stale entry was dropped on read
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let cache = BalanceCache::default();
        cache.put("wallet1", stats(5));
        cache.invalidate("wallet1");
        assert!(cache.get("wallet1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_oldest() {
        let cache = BalanceCache::new(2, Duration::from_secs(300));
        cache.put("a", stats(1));
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put("b", stats(2));
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.put("c", stats(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[tokio::test]
    async fn test_overwrite_same_wallet_does_not_evict() {
        let cache = BalanceCache::new(1, Duration::from_secs(300));
        cache.put("a", stats(1));
        cache.put("a", stats(2));
        assert_eq!(cache.get("a").unwrap().line_credits, 2);
        assert_eq!(cache.len(), 1);
    }
}
