//! Store Module
//!
//! The key-value primitives the cache engine consumes, behind one interface.
//! Any store offering these operations satisfies the contract; the crate
//! ships a Redis connector and an in-process implementation.

mod memory;
mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use crate::error::Result;

// == Key TTL ==
/// Remaining time-to-live reported by the store for a physical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key does not exist (never stored, deleted, or its TTL fired)
    Missing,
    /// Key exists and never expires
    Persistent,
    /// Key exists with this many seconds left
    Remaining(u64),
}

// == Store Trait ==
/// Key-value store primitives required by the cache engine.
///
/// Implementations take `&self`; interior locking is the backend's concern.
/// Multi-command methods (`put_tracked`, `remove_tracked`) are sent as one
/// batch where the backend supports it, which bounds them to a single
/// network round trip but does not make them mutually exclusive across
/// concurrent clients.
pub trait Store: Send + Sync {
    /// Reads a value; None when the key is absent or expired.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value. `ttl` in seconds; None or 0 means no expiry.
    fn put(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<()>;

    /// Writes a value and adds `member` to `set` in one batch.
    fn put_tracked(
        &self,
        key: &str,
        value: &str,
        ttl: Option<u64>,
        set: &str,
        member: &str,
    ) -> Result<()>;

    /// Batch-reads values in key order; absent keys yield None.
    fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// Deletes keys, returning how many actually existed.
    fn delete(&self, keys: &[String]) -> Result<u64>;

    /// Removes `members` from `set` and deletes `keys` in one batch,
    /// returning how many of `keys` actually existed.
    fn remove_tracked(&self, set: &str, members: &[String], keys: &[String]) -> Result<u64>;

    /// Adds a member to a set.
    fn set_add(&self, set: &str, member: &str) -> Result<()>;

    /// Removes members from a set.
    fn set_remove(&self, set: &str, members: &[String]) -> Result<()>;

    /// Removes and returns an arbitrary member of a set.
    fn set_pop(&self, set: &str) -> Result<Option<String>>;

    /// Set cardinality; 0 for a missing set.
    fn set_card(&self, set: &str) -> Result<u64>;

    /// All members of a set.
    fn set_members(&self, set: &str) -> Result<Vec<String>>;

    /// Membership test.
    fn set_contains(&self, set: &str, member: &str) -> Result<bool>;

    /// Keys matching a glob pattern. Scans the whole keyspace store-side;
    /// callers treat this as expensive.
    fn scan_keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// TTL introspection for a physical key.
    fn ttl(&self, key: &str) -> Result<KeyTtl>;
}

// Engines own their store; sharing one physical store across several
// namespaced engines goes through an Arc.
impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<()> {
        (**self).put(key, value, ttl)
    }

    fn put_tracked(
        &self,
        key: &str,
        value: &str,
        ttl: Option<u64>,
        set: &str,
        member: &str,
    ) -> Result<()> {
        (**self).put_tracked(key, value, ttl, set, member)
    }

    fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        (**self).mget(keys)
    }

    fn delete(&self, keys: &[String]) -> Result<u64> {
        (**self).delete(keys)
    }

    fn remove_tracked(&self, set: &str, members: &[String], keys: &[String]) -> Result<u64> {
        (**self).remove_tracked(set, members, keys)
    }

    fn set_add(&self, set: &str, member: &str) -> Result<()> {
        (**self).set_add(set, member)
    }

    fn set_remove(&self, set: &str, members: &[String]) -> Result<()> {
        (**self).set_remove(set, members)
    }

    fn set_pop(&self, set: &str) -> Result<Option<String>> {
        (**self).set_pop(set)
    }

    fn set_card(&self, set: &str) -> Result<u64> {
        (**self).set_card(set)
    }

    fn set_members(&self, set: &str) -> Result<Vec<String>> {
        (**self).set_members(set)
    }

    fn set_contains(&self, set: &str, member: &str) -> Result<bool> {
        (**self).set_contains(set, member)
    }

    fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        (**self).scan_keys(pattern)
    }

    fn ttl(&self, key: &str) -> Result<KeyTtl> {
        (**self).ttl(key)
    }
}
