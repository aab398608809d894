//! Property-Based Tests for the Cache Engine
//!
//! Uses proptest to verify engine invariants over an in-process store.

use proptest::prelude::*;
use std::collections::HashSet;

use crate::cache::SimpleCache;
use crate::error::CacheError;
use crate::store::MemoryStore;

// == Test Configuration ==
const TEST_LIMIT: usize = 50;

fn test_cache(limit: usize) -> SimpleCache {
    SimpleCache::with_store("prop", MemoryStore::new(), limit, None)
}

// == Strategies ==
/// Generates logical keys, colons included (caller sub-namespacing)
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:]{1,32}"
}

/// Generates stored values
fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,64}"
}

#[derive(Debug, Clone)]
enum CacheOp {
    Store { key: String, value: String },
    Get { key: String },
    Invalidate { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Store { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Invalidate { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing then reading returns the exact value, before any TTL or
    // capacity eviction can interfere.
    #[test]
    fn prop_roundtrip_storage(key in key_strategy(), value in value_strategy()) {
        let cache = test_cache(TEST_LIMIT);

        cache.store(&key, &value, None).unwrap();

        let retrieved = cache.get(&key).unwrap();
        prop_assert_eq!(retrieved, value, "Round-trip value mismatch");
    }

    // A key that was never stored is always a CacheMiss, never ExpiredKey.
    #[test]
    fn prop_never_stored_is_cache_miss(key in key_strategy()) {
        let cache = test_cache(TEST_LIMIT);

        let result = cache.get(&key);
        prop_assert!(matches!(result, Err(CacheError::CacheMiss(_))));
    }

    // The membership set never exceeds the limit after any store, for a
    // single-threaded caller.
    #[test]
    fn prop_soft_capacity_bound(
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..150)
    ) {
        let limit = 20;
        let cache = test_cache(limit);

        for (key, value) in entries {
            cache.store(&key, &value, None).unwrap();
            prop_assert!(
                cache.len().unwrap() <= limit,
                "Tracked keys {} exceed limit {}",
                cache.len().unwrap(),
                limit
            );
        }
    }

    // Invalidation always downgrades a key to CacheMiss.
    #[test]
    fn prop_invalidate_yields_cache_miss(key in key_strategy(), value in value_strategy()) {
        let cache = test_cache(TEST_LIMIT);

        cache.store(&key, &value, None).unwrap();
        cache.invalidate(&key).unwrap();

        prop_assert!(matches!(cache.get(&key), Err(CacheError::CacheMiss(_))));
        prop_assert!(!cache.contains(&key).unwrap());
    }

    // mget returns exactly the subset of keys retrievable via get, and
    // never raises for the missing ones.
    #[test]
    fn prop_mget_matches_get_subset(
        stored in prop::collection::hash_set(key_strategy(), 0..10),
        probed in prop::collection::vec(key_strategy(), 1..15)
    ) {
        let cache = test_cache(TEST_LIMIT);

        for key in &stored {
            cache.store(key, "v", None).unwrap();
        }

        let probe_refs: Vec<&str> = probed.iter().map(String::as_str).collect();
        let found = cache.mget(&probe_refs).unwrap();

        let probed_set: HashSet<&String> = probed.iter().collect();
        for key in &probed {
            if stored.contains(key) {
                prop_assert_eq!(found.get(key).map(String::as_str), Some("v"));
            } else {
                prop_assert!(!found.contains_key(key));
            }
        }
        for key in found.keys() {
            prop_assert!(probed_set.contains(key), "mget invented key {}", key);
        }
    }

    // After any operation sequence, every tracked key with a live value is
    // retrievable, and len() equals the tracked-key count.
    #[test]
    fn prop_membership_is_upper_bound(
        ops in prop::collection::vec(cache_op_strategy(), 1..60)
    ) {
        let cache = test_cache(TEST_LIMIT);

        for op in ops {
            match op {
                CacheOp::Store { key, value } => cache.store(&key, &value, None).unwrap(),
                CacheOp::Get { key } => {
                    let _ = cache.get(&key);
                }
                CacheOp::Invalidate { key } => cache.invalidate(&key).unwrap(),
            }
        }

        let keys = cache.keys().unwrap();
        prop_assert_eq!(keys.len(), cache.len().unwrap());
        // No TTLs in play, so every tracked key must still be live
        for key in keys {
            prop_assert!(cache.get(&key).is_ok(), "tracked key {} not retrievable", key);
        }
    }
}
