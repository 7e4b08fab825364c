//! Cache entries and lookup outcomes.

use aspectra_core::Timestamp;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// An immutable cached result.
///
/// Entries are replaced whole on overwrite and never mutated in place, so a
/// reader holding a clone always sees a consistent value/timestamp/ttl triple.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    value: Arc<Value>,
    created_at: Timestamp,
    ttl: Duration,
}

impl CacheEntry {
    pub fn new(value: Value, created_at: Timestamp, ttl: Duration) -> Self {
        Self {
            value: Arc::new(value),
            created_at,
            ttl,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Clone the cached value out of the entry.
    pub fn to_value(&self) -> Value {
        self.value.as_ref().clone()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Instant after which the entry counts as expired.
    pub fn expires_at(&self) -> Timestamp {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        self.created_at
            .checked_add_signed(ttl)
            .unwrap_or(Timestamp::MAX_UTC)
    }

    /// `now > created_at + ttl`. An entry is still valid at exactly its
    /// expiry instant.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now > self.expires_at()
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining_ttl(&self, now: Timestamp) -> Duration {
        (self.expires_at() - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Outcome of [`CacheStore::get`](crate::CacheStore::get).
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// Present and within its TTL.
    Hit(CacheEntry),
    /// Present but past its TTL. Callers treat this as absent.
    Expired(CacheEntry),
    /// No entry under the key.
    Miss,
}

impl CacheLookup {
    /// The entry if it is a live hit.
    pub fn hit(self) -> Option<CacheEntry> {
        match self {
            Self::Hit(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    /// Whether an entry was found at all, expired or not.
    pub fn is_found(&self) -> bool {
        !matches!(self, Self::Miss)
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Expired(_))
    }
}
