//! Cache usage counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of live cache hits.
    pub hits: u64,
    /// Number of lookups that found nothing.
    pub misses: u64,
    /// Number of lookups that found only an expired entry.
    pub expired_reads: u64,
    /// Number of values stored.
    pub stores: u64,
    /// Number of entries removed by explicit invalidation or clear.
    pub invalidations: u64,
    /// Number of expired entries removed by sweeps.
    pub swept: u64,
    /// Number of entries currently in cache (expired ones included).
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0). Expired reads count as misses.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.expired_reads;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Live counters behind [`CacheStats`].
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub expired_reads: AtomicU64,
    pub stores: AtomicU64,
    pub invalidations: AtomicU64,
    pub swept: AtomicU64,
}

impl CacheCounters {
    pub fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub fn snapshot(&self, entry_count: u64) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired_reads: self.expired_reads.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
            entry_count,
        }
    }
}
