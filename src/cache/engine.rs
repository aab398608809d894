//! Cache Engine Module
//!
//! The bounded keyspace engine: capacity-bounded, TTL-qualified stores into
//! an external key-value store, with a membership set per namespace tracking
//! which logical keys are believed cached.
//!
//! The membership set is an upper bound, not a guarantee: the store expires
//! entries on its own schedule and never notifies us, so a key can sit in
//! the set after its value is gone. Reads reconcile lazily.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::{KeyCodec, Serializer};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::store::{KeyTtl, RedisStore, Store};

// == Expiry ==
/// TTL diagnostic for a logical key, reported by [`SimpleCache::is_expired`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// No remaining time-to-live: the entry is gone or its TTL fired
    Expired,
    /// Entry exists and never expires
    Never,
    /// Entry exists with this many seconds left
    Remaining(u64),
}

impl Expiry {
    /// True when the key has no remaining time-to-live.
    pub fn is_expired(&self) -> bool {
        matches!(self, Expiry::Expired)
    }
}

// == Simple Cache ==
/// Bounded, namespaced cache-aside engine over an external key-value store.
///
/// Multiple engines with different namespaces share one physical store
/// without collision. The capacity limit is soft: enforced at store time by
/// evicting arbitrary members, with transient overshoot possible under
/// concurrent writers (there is no cross-client locking).
pub struct SimpleCache {
    /// None when the store was unreachable at construction; every operation
    /// then fails fast with ConnectionFailure (pass-through mode)
    store: Option<Box<dyn Store>>,
    codec: KeyCodec,
    limit: usize,
    default_ttl: Option<u64>,
}

impl SimpleCache {
    // == Constructors ==
    /// Connects to the configured store and binds a namespace.
    ///
    /// Never fails: if the store is unreachable the engine comes up
    /// disconnected and callers (notably memoization) degrade to
    /// pass-through. Use [`SimpleCache::is_connected`] to observe which.
    pub fn open(namespace: impl Into<String>, config: &CacheConfig) -> Self {
        let namespace = namespace.into();
        let store: Option<Box<dyn Store>> = match RedisStore::connect(config) {
            Ok(store) => Some(Box::new(store)),
            Err(err) => {
                warn!(
                    "Cache namespace '{}' starting without a store: {}",
                    namespace, err
                );
                None
            }
        };
        Self {
            store,
            codec: KeyCodec::new(namespace),
            limit: config.limit,
            default_ttl: config.default_ttl,
        }
    }

    /// Binds a namespace to an explicit store backend.
    pub fn with_store<S: Store + 'static>(
        namespace: impl Into<String>,
        store: S,
        limit: usize,
        default_ttl: Option<u64>,
    ) -> Self {
        Self {
            store: Some(Box::new(store)),
            codec: KeyCodec::new(namespace),
            limit,
            default_ttl,
        }
    }

    /// Whether the engine holds a live store connection.
    pub fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    /// The logical namespace this engine serves.
    pub fn namespace(&self) -> &str {
        self.codec.namespace()
    }

    fn backend(&self) -> Result<&dyn Store> {
        self.store
            .as_deref()
            .ok_or_else(|| CacheError::ConnectionFailure(self.codec.namespace().to_string()))
    }

    // == Store ==
    /// Stores a value under a logical key, evicting first if the namespace
    /// is at capacity.
    ///
    /// Eviction removes arbitrary members (not LRU: O(1), no recency
    /// tracking) until the membership set is under the limit, then writes
    /// the entry and its membership in one batch. `ttl` in seconds; None
    /// falls back to the engine default, and 0 (or no default) means the
    /// entry never expires.
    pub fn store(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<()> {
        let store = self.backend()?;
        let set = self.codec.set_key();

        while store.set_card(&set)? >= self.limit as u64 {
            let Some(victim) = store.set_pop(&set)? else {
                break;
            };
            debug!(
                "Capacity eviction of '{}' from namespace '{}'",
                victim,
                self.codec.namespace()
            );
            store.delete(&[self.codec.entry_key(&victim)])?;
        }

        let effective_ttl = ttl.or(self.default_ttl);
        store.put_tracked(
            &self.codec.entry_key(key),
            value,
            effective_ttl,
            &set,
            key,
        )
    }

    /// Stores a value encoded with the given strategy.
    pub fn store_with<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<u64>,
        serializer: Serializer,
    ) -> Result<()> {
        let encoded = serializer.encode(value)?;
        self.store(key, &encoded, ttl)
    }

    /// Stores a value as JSON text.
    pub fn store_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.store_with(key, value, None, Serializer::Json)
    }

    /// Stores a value in the binary encoding.
    pub fn store_bin<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.store_with(key, value, None, Serializer::Binary)
    }

    // == Get ==
    /// Retrieves a value by logical key.
    ///
    /// The entry read is authoritative; the membership set is only consulted
    /// to tell the two absence cases apart. An absent entry with a live
    /// membership record means the store's TTL fired first: that surfaces as
    /// `ExpiredKey` and the stale membership record is removed as a side
    /// effect. Absent from both is a plain `CacheMiss`.
    pub fn get(&self, key: &str) -> Result<String> {
        let store = self.backend()?;
        match store.get(&self.codec.entry_key(key))? {
            Some(value) => Ok(value),
            None => {
                let set = self.codec.set_key();
                if store.set_contains(&set, key)? {
                    store.set_remove(&set, &[key.to_string()])?;
                    Err(CacheError::ExpiredKey(key.to_string()))
                } else {
                    Err(CacheError::CacheMiss(key.to_string()))
                }
            }
        }
    }

    /// Retrieves and decodes a value with the given strategy.
    pub fn get_with<T: DeserializeOwned>(&self, key: &str, serializer: Serializer) -> Result<T> {
        let raw = self.get(key)?;
        serializer.decode(&raw)
    }

    /// Retrieves a JSON-encoded value.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get_with(key, Serializer::Json)
    }

    /// Retrieves a binary-encoded value.
    pub fn get_bin<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get_with(key, Serializer::Binary)
    }

    // == Multi-Get ==
    /// Batch-reads logical keys in one store round trip.
    ///
    /// Keys with no live value are silently omitted from the result rather
    /// than raised, and their stale membership records are removed in a
    /// follow-up batch. Partial success over all-or-nothing.
    pub fn mget(&self, keys: &[&str]) -> Result<HashMap<String, String>> {
        let store = self.backend()?;
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let physical: Vec<String> = keys.iter().map(|k| self.codec.entry_key(k)).collect();
        let values = store.mget(&physical)?;

        let mut found = HashMap::new();
        let mut stale = Vec::new();
        for (key, value) in keys.iter().zip(values) {
            match value {
                Some(value) => {
                    found.insert((*key).to_string(), value);
                }
                None => stale.push((*key).to_string()),
            }
        }

        if !stale.is_empty() {
            store.set_remove(&self.codec.set_key(), &stale)?;
        }
        Ok(found)
    }

    /// Batch-reads and JSON-decodes logical keys.
    pub fn mget_json<T: DeserializeOwned>(&self, keys: &[&str]) -> Result<HashMap<String, T>> {
        self.mget(keys)?
            .into_iter()
            .map(|(key, raw)| Ok((key, Serializer::Json.decode(&raw)?)))
            .collect()
    }

    // == Invalidate ==
    /// Removes a key's membership record and entry unconditionally.
    ///
    /// Idempotent; a subsequent `get` is always `CacheMiss`, never
    /// `ExpiredKey`.
    pub fn invalidate(&self, key: &str) -> Result<()> {
        let store = self.backend()?;
        store.remove_tracked(
            &self.codec.set_key(),
            &[key.to_string()],
            &[self.codec.entry_key(key)],
        )?;
        Ok(())
    }

    // == Bulk Expiry ==
    /// Forces immediate expiry of every tracked key.
    ///
    /// Entries are deleted but membership records are kept, so subsequent
    /// reads surface `ExpiredKey` exactly as if every TTL had fired at once.
    /// Returns `(total_tracked, number_expired)`.
    pub fn expire_all_in_set(&self) -> Result<(usize, usize)> {
        let store = self.backend()?;
        let members = store.set_members(&self.codec.set_key())?;
        let physical: Vec<String> = members.iter().map(|m| self.codec.entry_key(m)).collect();
        let expired = store.delete(&physical)?;
        Ok((members.len(), expired as usize))
    }

    /// Forces immediate expiry of every entry under a caller sub-namespace
    /// (keys stored as `"<sub>:<rest>"`).
    ///
    /// Pattern-scans the store, which is O(keyspace size) store-side:
    /// expensive, for bulk staleness only. Membership records are kept, so
    /// reads surface `ExpiredKey`. Returns `(total_tracked, number_matched)`.
    pub fn expire_namespace(&self, sub_namespace: &str) -> Result<(usize, usize)> {
        let store = self.backend()?;
        let total = store.set_card(&self.codec.set_key())? as usize;
        let matched = store.scan_keys(&self.codec.namespace_pattern(sub_namespace))?;
        store.delete(&matched)?;
        Ok((total, matched.len()))
    }

    /// Removes every entry under a caller sub-namespace along with its
    /// membership record, in one batch.
    ///
    /// Unlike [`SimpleCache::expire_namespace`], subsequent reads are
    /// `CacheMiss`. Same O(keyspace) scan cost. Returns
    /// `(total_tracked, number_matched)`.
    pub fn flush_namespace(&self, sub_namespace: &str) -> Result<(usize, usize)> {
        let store = self.backend()?;
        let set = self.codec.set_key();
        let total = store.set_card(&set)? as usize;
        let matched = store.scan_keys(&self.codec.namespace_pattern(sub_namespace))?;
        let members: Vec<String> = matched
            .iter()
            .filter_map(|physical| self.codec.logical_key(physical))
            .collect();
        store.remove_tracked(&set, &members, &matched)?;
        Ok((total, matched.len()))
    }

    // == TTL Introspection ==
    /// Reports the remaining time-to-live of a logical key.
    ///
    /// Diagnostics only; `get` never consults this.
    pub fn is_expired(&self, key: &str) -> Result<Expiry> {
        let store = self.backend()?;
        Ok(match store.ttl(&self.codec.entry_key(key))? {
            KeyTtl::Missing => Expiry::Expired,
            KeyTtl::Persistent => Expiry::Never,
            KeyTtl::Remaining(secs) => Expiry::Remaining(secs),
        })
    }

    // == Flush ==
    /// Deletes every tracked entry plus the membership set itself, in one
    /// batch. Full namespace reset; entries outside the namespace are
    /// untouched.
    pub fn flush(&self) -> Result<()> {
        let store = self.backend()?;
        let set = self.codec.set_key();
        let members = store.set_members(&set)?;
        let mut targets: Vec<String> =
            members.iter().map(|m| self.codec.entry_key(m)).collect();
        targets.push(set);
        store.delete(&targets)?;
        Ok(())
    }

    // == Membership ==
    /// Whether a logical key is currently tracked. Membership does not
    /// imply a live value.
    pub fn contains(&self, key: &str) -> Result<bool> {
        self.backend()?.set_contains(&self.codec.set_key(), key)
    }

    /// Number of tracked keys: an upper bound on live entries.
    pub fn len(&self) -> Result<usize> {
        Ok(self.backend()?.set_card(&self.codec.set_key())? as usize)
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// The tracked logical keys.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.backend()?.set_members(&self.codec.set_key())
    }

    /// Iterates fully-qualified identifiers (`namespace:key`).
    ///
    /// Re-reads the membership set on each call: a finite, restartable
    /// snapshot, not a live view.
    pub fn iterate(&self) -> Result<impl Iterator<Item = String>> {
        let qualified: Vec<String> = self
            .keys()?
            .iter()
            .map(|key| self.codec.qualified(key))
            .collect();
        Ok(qualified.into_iter())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde::Deserialize;
    use std::thread::sleep;
    use std::time::Duration;

    fn test_cache(limit: usize) -> SimpleCache {
        SimpleCache::with_store("test", MemoryStore::new(), limit, None)
    }

    #[test]
    fn test_store_and_get() {
        let cache = test_cache(10);

        cache.store("foo", "bar", None).unwrap();
        assert_eq!(cache.get("foo").unwrap(), "bar");
        assert_eq!(cache.len().unwrap(), 1);
        assert!(cache.contains("foo").unwrap());
    }

    #[test]
    fn test_get_never_stored_is_cache_miss() {
        let cache = test_cache(10);

        let result = cache.get("blablabla");
        assert!(matches!(result, Err(CacheError::CacheMiss(_))));
    }

    #[test]
    fn test_ttl_expiry_surfaces_expired_key_then_reconciles() {
        let cache = test_cache(10);

        cache.store("foo", "bar", Some(1)).unwrap();
        sleep(Duration::from_millis(1100));

        // The store's TTL fired while the key is still tracked
        let result = cache.get("foo");
        assert!(matches!(result, Err(CacheError::ExpiredKey(_))));

        // The read lazily removed the stale membership record
        assert!(!cache.contains("foo").unwrap());
        assert!(cache.keys().unwrap().is_empty());

        // A second read is a plain miss
        let result = cache.get("foo");
        assert!(matches!(result, Err(CacheError::CacheMiss(_))));
    }

    #[test]
    fn test_capacity_limit_is_enforced_at_store_time() {
        let cache = test_cache(10);

        for i in 0..100 {
            cache.store(&format!("foo{}", i), "foobar", None).unwrap();
            assert!(cache.len().unwrap() <= 10);
            assert!(cache.keys().unwrap().len() <= 10);
        }
    }

    #[test]
    fn test_default_ttl_applies_when_store_gives_none() {
        let cache = SimpleCache::with_store("test", MemoryStore::new(), 10, Some(100));

        cache.store("foo", "bar", None).unwrap();
        assert!(matches!(
            cache.is_expired("foo").unwrap(),
            Expiry::Remaining(n) if n > 0
        ));

        // An explicit 0 overrides the default: never expires
        cache.store("pinned", "bar", Some(0)).unwrap();
        assert_eq!(cache.is_expired("pinned").unwrap(), Expiry::Never);
    }

    #[test]
    fn test_mget_returns_found_subset_only() {
        let cache = test_cache(10);

        cache.store("a1", "a", None).unwrap();
        cache.store("a2", "aa", None).unwrap();
        cache.store("a3", "aaa", None).unwrap();

        let found = cache.mget(&["a1", "a2", "a3"]).unwrap();
        assert_eq!(found["a1"], "a");
        assert_eq!(found["a2"], "aa");
        assert_eq!(found["a3"], "aaa");

        let found = cache.mget(&["a1", "missing", "a3"]).unwrap();
        assert_eq!(found.len(), 2);
        assert!(!found.contains_key("missing"));
    }

    #[test]
    fn test_mget_reconciles_expired_members() {
        let cache = test_cache(10);

        cache.store("c1", "c", None).unwrap();
        cache.store("c2", "cc", Some(1)).unwrap();
        cache.store("c3", "ccc", None).unwrap();
        sleep(Duration::from_millis(1100));

        let found = cache.mget(&["c1", "c2", "c3"]).unwrap();
        assert_eq!(found.len(), 2);
        assert!(!found.contains_key("c2"));

        // The expired member was cleaned out of the set as a side effect
        assert!(!cache.contains("c2").unwrap());
    }

    #[test]
    fn test_invalidate_is_idempotent_and_yields_cache_miss() {
        let cache = test_cache(10);

        cache.store("d2", "dd", None).unwrap();
        cache.invalidate("d2").unwrap();

        assert!(matches!(cache.get("d2"), Err(CacheError::CacheMiss(_))));
        assert!(!cache.contains("d2").unwrap());

        // Invalidating again is a no-op
        cache.invalidate("d2").unwrap();
        cache.invalidate("never_stored").unwrap();
    }

    #[test]
    fn test_expire_all_in_set() {
        let cache = test_cache(10);

        cache.store("foo", "bir", None).unwrap();
        cache.store("fuu", "bor", None).unwrap();
        cache.store("fii", "bur", None).unwrap();

        assert_eq!(cache.expire_all_in_set().unwrap(), (3, 3));

        // Membership survives, so reads report expiry rather than a miss
        assert!(matches!(cache.get("foo"), Err(CacheError::ExpiredKey(_))));
        assert!(matches!(cache.get("fuu"), Err(CacheError::ExpiredKey(_))));
        assert!(matches!(cache.get("fii"), Err(CacheError::ExpiredKey(_))));
    }

    #[test]
    fn test_expire_namespace_keeps_membership() {
        let cache = test_cache(10);

        cache.store("foo:one", "bir", None).unwrap();
        cache.store("foo:two", "bor", None).unwrap();
        cache.store("fii", "bur", Some(100)).unwrap();

        assert_eq!(cache.expire_namespace("foo").unwrap(), (3, 2));

        assert!(matches!(cache.get("foo:one"), Err(CacheError::ExpiredKey(_))));
        assert!(matches!(cache.get("foo:two"), Err(CacheError::ExpiredKey(_))));
        assert!(cache.is_expired("foo:one").unwrap().is_expired());
        assert!(matches!(
            cache.is_expired("fii").unwrap(),
            Expiry::Remaining(n) if n > 0
        ));
    }

    #[test]
    fn test_flush_namespace_removes_membership_too() {
        let cache = test_cache(10);

        cache.store("foo:one", "bir", None).unwrap();
        cache.store("foo:two", "bor", None).unwrap();
        cache.store("fii", "bur", None).unwrap();

        let before = cache.keys().unwrap().len();
        assert_eq!(cache.flush_namespace("foo").unwrap(), (3, 2));
        let after = cache.keys().unwrap().len();

        assert_eq!(before - after, 2);
        assert_eq!(cache.get("fii").unwrap(), "bur");
        assert!(matches!(cache.get("foo:one"), Err(CacheError::CacheMiss(_))));
        assert!(matches!(cache.get("foo:two"), Err(CacheError::CacheMiss(_))));
    }

    #[test]
    fn test_flush_resets_namespace_only() {
        let store = MemoryStore::new();
        store.put("untracked", "42", None).unwrap();

        let cache = SimpleCache::with_store("test", store, 10, None);
        cache.store("tracked", "10", None).unwrap();
        assert!(cache.len().unwrap() > 0);

        cache.flush().unwrap();

        assert_eq!(cache.len().unwrap(), 0);
        assert!(matches!(cache.get("tracked"), Err(CacheError::CacheMiss(_))));
    }

    #[test]
    fn test_flush_leaves_other_namespaces_alone() {
        // Two engines over one physical store, distinct namespaces
        let store = std::sync::Arc::new(MemoryStore::new());
        let c1 = SimpleCache::with_store("ns1", store.clone(), 10, None);
        let c2 = SimpleCache::with_store("ns2", store, 10, None);

        c1.store("foo", "bar", None).unwrap();
        c2.store("foo", "bar", None).unwrap();

        c1.flush().unwrap();
        assert_eq!(c1.len().unwrap(), 0);
        assert_eq!(c2.len().unwrap(), 1);
        assert_eq!(c2.get("foo").unwrap(), "bar");
    }

    #[test]
    fn test_iterate_yields_qualified_identifiers() {
        let cache = test_cache(10);

        cache.store("foo", "1", None).unwrap();
        cache.store("bar", "2", None).unwrap();

        let mut ids: Vec<String> = cache.iterate().unwrap().collect();
        ids.sort();
        assert_eq!(ids, vec!["test:bar", "test:foo"]);

        // Restartable: a fresh call re-reads the set
        assert_eq!(cache.iterate().unwrap().count(), 2);
    }

    #[test]
    fn test_json_and_binary_roundtrips() {
        #[derive(Debug, PartialEq, serde::Serialize, Deserialize)]
        struct Payload {
            example: String,
        }

        let cache = test_cache(10);
        let payload = Payload {
            example: "data".to_string(),
        };

        cache.store_json("json", &payload).unwrap();
        assert_eq!(cache.get_json::<Payload>("json").unwrap(), payload);

        cache.store_bin("bin", &payload).unwrap();
        assert_eq!(cache.get_bin::<Payload>("bin").unwrap(), payload);
    }

    #[test]
    fn test_mget_json() {
        let cache = test_cache(10);

        cache.store_json("j1", &vec![1, 2, 3]).unwrap();
        cache.store_json("j3", &vec![7, 8, 9]).unwrap();

        let found: HashMap<String, Vec<i32>> = cache.mget_json(&["j1", "j2", "j3"]).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found["j1"], vec![1, 2, 3]);
        assert!(!found.contains_key("j2"));
        assert_eq!(found["j3"], vec![7, 8, 9]);
    }

    #[test]
    fn test_disconnected_engine_fails_fast() {
        let cache = SimpleCache {
            store: None,
            codec: KeyCodec::new("test"),
            limit: 10,
            default_ttl: None,
        };

        assert!(!cache.is_connected());
        assert!(matches!(
            cache.store("k", "v", None),
            Err(CacheError::ConnectionFailure(_))
        ));
        assert!(matches!(
            cache.get("k"),
            Err(CacheError::ConnectionFailure(_))
        ));
    }
}
