//! In-memory result cache with explicit expiry semantics.
//!
//! The store is a sharded concurrent map of immutable [`CacheEntry`] values.
//! Expiry is decided lazily on read against an injectable [`Clock`]; expired
//! entries stay resident until [`CacheStore::sweep_expired`] (or the
//! background [`ExpirySweeper`]) removes them.
//!
//! # Caller Isolation
//!
//! A [`CacheKey`] may be qualified by a caller identity. With
//! [`KeyScope::PerCaller`](aspectra_core::KeyScope::PerCaller) (the default)
//! every derived and explicit key carries the caller, so a result computed for
//! one principal is never served to another.
//!
//! # Example
//!
//! ```
//! use aspectra_cache::{CacheKey, CacheLookup, CacheStore};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! let store = CacheStore::new();
//! let key = CacheKey::explicit("top-transaction");
//!
//! store.put(key.clone(), json!(120.5), Duration::from_secs(60));
//! assert!(matches!(store.get(&key), CacheLookup::Hit(_)));
//! ```

pub mod clock;
pub mod entry;
pub mod key;
pub mod stats;
pub mod store;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, CacheLookup};
pub use key::CacheKey;
pub use stats::CacheStats;
pub use store::CacheStore;
pub use sweeper::{ExpirySweeper, SweeperHandle, SweeperSnapshot};
