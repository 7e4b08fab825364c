//! The concurrent TTL store.

use crate::clock::{Clock, SystemClock};
use crate::entry::{CacheEntry, CacheLookup};
use crate::key::CacheKey;
use crate::stats::{CacheCounters, CacheStats};
use aspectra_core::{PrincipalId, Timestamp};
use dashmap::DashMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Concurrent keyed store of cached invocation results.
///
/// Backed by a sharded map: readers and writers on different shards never
/// contend, and a writer replaces an entry atomically under its shard lock.
/// None of the operations can fail; absence and expiry are ordinary lookup
/// outcomes.
///
/// Memory is bounded only by removal. An expired entry stays resident until
/// [`sweep_expired`](Self::sweep_expired), an invalidation or
/// [`clear`](Self::clear) removes it, or a `put` replaces it. Run an
/// [`ExpirySweeper`](crate::ExpirySweeper) when distinct keys keep arriving.
pub struct CacheStore {
    entries: DashMap<CacheKey, CacheEntry>,
    clock: Arc<dyn Clock>,
    counters: CacheCounters,
}

impl CacheStore {
    /// Create an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store on the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            counters: CacheCounters::default(),
        }
    }

    /// Current time on the store clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Look up `key`, deciding expiry against the store clock.
    ///
    /// Expired entries are reported but left in place for
    /// [`sweep_expired`](Self::sweep_expired).
    pub fn get(&self, key: &CacheKey) -> CacheLookup {
        // Clone out of the shard guard before touching anything else
        let entry = self.entries.get(key).map(|guard| guard.value().clone());
        match entry {
            None => {
                CacheCounters::bump(&self.counters.misses, 1);
                CacheLookup::Miss
            }
            Some(entry) if entry.is_expired_at(self.clock.now()) => {
                CacheCounters::bump(&self.counters.expired_reads, 1);
                CacheLookup::Expired(entry)
            }
            Some(entry) => {
                CacheCounters::bump(&self.counters.hits, 1);
                CacheLookup::Hit(entry)
            }
        }
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn put(&self, key: CacheKey, value: Value, ttl: Duration) -> CacheEntry {
        let entry = CacheEntry::new(value, self.clock.now(), ttl);
        self.entries.insert(key, entry.clone());
        CacheCounters::bump(&self.counters.stores, 1);
        entry
    }

    /// Remove one entry. Returns whether anything was removed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            CacheCounters::bump(&self.counters.invalidations, 1);
            tracing::debug!(cache_key = %key, "Cache entry invalidated");
        }
        removed
    }

    /// Remove every derived entry of `operation`. Returns the count removed.
    ///
    /// Explicit keys carry no operation and are left alone.
    pub fn invalidate_operation(&self, operation: &str) -> u64 {
        let removed = self.remove_where(|key| key.operation() == Some(operation));
        CacheCounters::bump(&self.counters.invalidations, removed);
        tracing::debug!(operation, removed, "Cache entries invalidated for operation");
        removed
    }

    /// Remove every entry scoped to `caller`. Returns the count removed.
    pub fn invalidate_caller(&self, caller: &PrincipalId) -> u64 {
        let removed = self.remove_where(|key| key.caller() == Some(caller));
        CacheCounters::bump(&self.counters.invalidations, removed);
        tracing::debug!(caller = %caller, removed, "Cache entries invalidated for caller");
        removed
    }

    /// Remove all entries.
    pub fn clear(&self) {
        let removed = self.entries.len() as u64;
        self.entries.clear();
        CacheCounters::bump(&self.counters.invalidations, removed);
        tracing::debug!(removed, "Cache cleared");
    }

    /// Number of resident entries, expired ones included.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove every entry that is expired now. Returns the count removed.
    ///
    /// Live entries are never touched, and an entry replaced by a fresh value
    /// while the sweep runs is kept.
    pub fn sweep_expired(&self) -> u64 {
        let now = self.clock.now();
        let removed = self.remove_where_entry(|_, entry| entry.is_expired_at(now));
        CacheCounters::bump(&self.counters.swept, removed);
        if removed > 0 {
            tracing::debug!(removed, remaining = self.entries.len(), "Expired cache entries swept");
        }
        removed
    }

    /// Snapshot of the usage counters.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.entries.len() as u64)
    }

    fn remove_where<F>(&self, pred: F) -> u64
    where
        F: Fn(&CacheKey) -> bool,
    {
        self.remove_where_entry(|key, _| pred(key))
    }

    fn remove_where_entry<F>(&self, pred: F) -> u64
    where
        F: Fn(&CacheKey, &CacheEntry) -> bool,
    {
        let mut removed = 0u64;
        self.entries.retain(|key, entry| {
            if pred(key, entry) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
