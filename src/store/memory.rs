//! Memory Store Module
//!
//! In-process Store implementation: a HashMap keyspace with per-entry expiry
//! deadlines plus named member sets. Expired entries are detected lazily on
//! read, the same contract a networked store enforces server-side. Backs the
//! test suites and works as an embedded stand-in for a real store.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::store::{KeyTtl, Store};

// == Memory Entry ==
/// A stored value with an optional expiry deadline.
#[derive(Debug, Clone)]
struct MemEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemEntry {
    fn new(value: String, ttl: Option<u64>) -> Self {
        let expires_at = match ttl {
            Some(secs) if secs > 0 => Some(Instant::now() + Duration::from_secs(secs)),
            _ => None,
        };
        Self { value, expires_at }
    }

    /// An entry is expired once its deadline has been reached.
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}

// == Inner State ==
#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, MemEntry>,
    sets: HashMap<String, HashSet<String>>,
}

impl Inner {
    /// Drops the entry if its TTL has fired, mirroring store-side expiry.
    fn reap(&mut self, key: &str) {
        if self.entries.get(key).is_some_and(MemEntry::is_expired) {
            self.entries.remove(key);
        }
    }

    /// Deletes a key of either kind, reporting whether it was live.
    fn delete_key(&mut self, key: &str) -> bool {
        self.reap(key);
        let had_entry = self.entries.remove(key).is_some();
        let had_set = self.sets.remove(key).is_some();
        had_entry || had_set
    }
}

// == Memory Store ==
/// In-process Store over a single mutex, so every multi-command batch is
/// trivially atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut inner = self.lock();
        inner.reap(key);
        Ok(inner.entries.get(key).map(|e| e.value.clone()))
    }

    fn put(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<()> {
        let mut inner = self.lock();
        inner
            .entries
            .insert(key.to_string(), MemEntry::new(value.to_string(), ttl));
        Ok(())
    }

    fn put_tracked(
        &self,
        key: &str,
        value: &str,
        ttl: Option<u64>,
        set: &str,
        member: &str,
    ) -> Result<()> {
        let mut inner = self.lock();
        inner
            .entries
            .insert(key.to_string(), MemEntry::new(value.to_string(), ttl));
        inner
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let mut inner = self.lock();
        Ok(keys
            .iter()
            .map(|key| {
                inner.reap(key);
                inner.entries.get(key).map(|e| e.value.clone())
            })
            .collect())
    }

    fn delete(&self, keys: &[String]) -> Result<u64> {
        let mut inner = self.lock();
        Ok(keys.iter().filter(|key| inner.delete_key(key)).count() as u64)
    }

    fn remove_tracked(&self, set: &str, members: &[String], keys: &[String]) -> Result<u64> {
        let mut inner = self.lock();
        if let Some(tracked) = inner.sets.get_mut(set) {
            for member in members {
                tracked.remove(member);
            }
        }
        Ok(keys.iter().filter(|key| inner.delete_key(key)).count() as u64)
    }

    fn set_add(&self, set: &str, member: &str) -> Result<()> {
        let mut inner = self.lock();
        inner
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    fn set_remove(&self, set: &str, members: &[String]) -> Result<()> {
        let mut inner = self.lock();
        if let Some(tracked) = inner.sets.get_mut(set) {
            for member in members {
                tracked.remove(member);
            }
        }
        Ok(())
    }

    fn set_pop(&self, set: &str) -> Result<Option<String>> {
        let mut inner = self.lock();
        let Some(tracked) = inner.sets.get_mut(set) else {
            return Ok(None);
        };
        // HashSet iteration order makes this the arbitrary-member pop the
        // engine's eviction relies on.
        let member = tracked.iter().next().cloned();
        if let Some(ref member) = member {
            tracked.remove(member);
        }
        Ok(member)
    }

    fn set_card(&self, set: &str) -> Result<u64> {
        let inner = self.lock();
        Ok(inner.sets.get(set).map_or(0, |s| s.len() as u64))
    }

    fn set_members(&self, set: &str) -> Result<Vec<String>> {
        let inner = self.lock();
        Ok(inner
            .sets
            .get(set)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn set_contains(&self, set: &str, member: &str) -> Result<bool> {
        let inner = self.lock();
        Ok(inner.sets.get(set).is_some_and(|s| s.contains(member)))
    }

    fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut inner = self.lock();
        let stale: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired())
            .map(|(k, _)| k.clone())
            .collect();
        for key in stale {
            inner.entries.remove(&key);
        }
        Ok(inner
            .entries
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect())
    }

    fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let mut inner = self.lock();
        inner.reap(key);
        Ok(match inner.entries.get(key) {
            None => KeyTtl::Missing,
            Some(MemEntry {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(MemEntry {
                expires_at: Some(deadline),
                ..
            }) => KeyTtl::Remaining(deadline.saturating_duration_since(Instant::now()).as_secs()),
        })
    }
}

// == Glob Matching ==
/// Matches `*` wildcards the way store-side KEYS patterns do.
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let (first, rest_parts) = (parts[0], &parts[1..]);
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    let last = rest_parts[rest_parts.len() - 1];
    for part in &rest_parts[..rest_parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match rest.find(part) {
            Some(i) => rest = &rest[i + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}
