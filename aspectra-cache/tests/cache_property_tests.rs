//! Property-Based Tests for the Result Cache
//!
//! **Property 1: Sweep Precision**
//!
//! For any set of entries and any elapsed time, a sweep SHALL remove exactly
//! the entries whose `created_at + ttl` lies strictly before now, AND the
//! store size SHALL drop by exactly the reported count.
//!
//! **Property 2: Lookup Agrees With Expiry**
//!
//! For any entry, a lookup SHALL be a hit iff the elapsed time does not
//! exceed its TTL.

use aspectra_cache::{CacheKey, CacheLookup, CacheStore, ManualClock};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn arb_ttls() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..120, 1..24)
}

proptest! {
    #[test]
    fn prop_sweep_removes_exactly_expired(ttls in arb_ttls(), elapsed in 0u64..150) {
        let clock = Arc::new(ManualClock::new());
        let store = CacheStore::with_clock(clock.clone());

        for (i, ttl) in ttls.iter().enumerate() {
            store.put(CacheKey::explicit(format!("k{i}")), json!(i), Duration::from_secs(*ttl));
        }
        clock.advance(Duration::from_secs(elapsed));

        let before = store.size();
        let expected = ttls.iter().filter(|ttl| elapsed > **ttl).count();
        let removed = store.sweep_expired();

        prop_assert_eq!(removed as usize, expected);
        prop_assert_eq!(store.size(), before - expected);

        for (i, ttl) in ttls.iter().enumerate() {
            let present = store.contains(&CacheKey::explicit(format!("k{i}")));
            prop_assert_eq!(present, elapsed <= *ttl);
        }
    }

    #[test]
    fn prop_lookup_hit_iff_within_ttl(ttl in 0u64..600, elapsed in 0u64..900) {
        let clock = Arc::new(ManualClock::new());
        let store = CacheStore::with_clock(clock.clone());
        let key = CacheKey::derived("op", "target", vec!["1".into()]);

        store.put(key.clone(), json!("value"), Duration::from_secs(ttl));
        clock.advance(Duration::from_secs(elapsed));

        match store.get(&key) {
            CacheLookup::Hit(entry) => {
                prop_assert!(elapsed <= ttl);
                prop_assert_eq!(entry.value(), &json!("value"));
            }
            CacheLookup::Expired(_) => prop_assert!(elapsed > ttl),
            CacheLookup::Miss => prop_assert!(false, "entry vanished without a sweep"),
        }
    }
}
