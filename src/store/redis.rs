//! Redis Store Module
//!
//! Blocking Redis connector implementing the Store trait. Connecting probes
//! the server with PING so a successful connect means the store is actually
//! reachable, not merely that a client handle exists.

use std::sync::{Mutex, MutexGuard, PoisonError};

use redis::{Commands, Connection};
use tracing::{debug, info};

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::store::{KeyTtl, Store};

// == Redis Store ==
/// Store implementation over a blocking Redis connection.
pub struct RedisStore {
    /// Single connection shared behind a lock; commands take `&self`
    conn: Mutex<Connection>,
}

impl RedisStore {
    // == Connect ==
    /// Opens a connection and validates reachability with PING.
    ///
    /// Any failure along the way (bad URL, refused connection, failed probe)
    /// maps to `CacheError::ConnectionFailure` so callers can fall back to
    /// degraded mode instead of treating it as a store-command error.
    pub fn connect(config: &CacheConfig) -> Result<Self> {
        let url = config.url();
        let client = redis::Client::open(url.as_str())
            .map_err(|e| CacheError::ConnectionFailure(e.to_string()))?;
        let mut conn = client
            .get_connection()
            .map_err(|e| CacheError::ConnectionFailure(e.to_string()))?;

        redis::cmd("PING")
            .query::<String>(&mut conn)
            .map_err(|e| CacheError::ConnectionFailure(e.to_string()))?;

        info!("Connected to store at {}:{}/{}", config.host, config.port, config.db);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for RedisStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.lock();
        Ok(conn.get(key)?)
    }

    fn put(&self, key: &str, value: &str, ttl: Option<u64>) -> Result<()> {
        let mut conn = self.lock();
        match ttl {
            Some(secs) if secs > 0 => conn.set_ex::<_, _, ()>(key, value, secs)?,
            _ => conn.set::<_, _, ()>(key, value)?,
        }
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
        let mut conn = self.lock();
        let mut pipe = redis::pipe();
        match ttl {
            Some(secs) if secs > 0 => {
                pipe.set_ex(key, value, secs).ignore();
            }
            _ => {
                pipe.set(key, value).ignore();
            }
        }
        pipe.sadd(set, member).ignore();
        pipe.query::<()>(&mut *conn)?;
        debug!("Stored {} (ttl={:?})", key, ttl);
        Ok(())
    }

    fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.lock();
        Ok(conn.mget(keys)?)
    }

    fn delete(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.lock();
        Ok(conn.del(keys)?)
    }

    fn remove_tracked(&self, set: &str, members: &[String], keys: &[String]) -> Result<u64> {
        if members.is_empty() && keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.lock();
        let mut pipe = redis::pipe();
        if !members.is_empty() {
            pipe.srem(set, members).ignore();
        }
        if keys.is_empty() {
            pipe.query::<()>(&mut *conn)?;
            return Ok(0);
        }
        pipe.del(keys);
        let (removed,): (u64,) = pipe.query(&mut *conn)?;
        Ok(removed)
    }

    fn set_add(&self, set: &str, member: &str) -> Result<()> {
        let mut conn = self.lock();
        conn.sadd::<_, _, ()>(set, member)?;
        Ok(())
    }

    fn set_remove(&self, set: &str, members: &[String]) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.lock();
        conn.srem::<_, _, ()>(set, members)?;
        Ok(())
    }

    fn set_pop(&self, set: &str) -> Result<Option<String>> {
        let mut conn = self.lock();
        Ok(conn.spop(set)?)
    }

    fn set_card(&self, set: &str) -> Result<u64> {
        let mut conn = self.lock();
        Ok(conn.scard(set)?)
    }

    fn set_members(&self, set: &str) -> Result<Vec<String>> {
        let mut conn = self.lock();
        Ok(conn.smembers(set)?)
    }

    fn set_contains(&self, set: &str, member: &str) -> Result<bool> {
        let mut conn = self.lock();
        Ok(conn.sismember(set, member)?)
    }

    fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.lock();
        Ok(conn.keys(pattern)?)
    }

    fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let mut conn = self.lock();
        let secs: i64 = conn.ttl(key)?;
        Ok(match secs {
            -2 => KeyTtl::Missing,
            -1 => KeyTtl::Persistent,
            n => KeyTtl::Remaining(n as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_unreachable_store() {
        // Nothing listens on port 1; the probe must surface a
        // ConnectionFailure, not a generic store error.
        let config = CacheConfig {
            port: 1,
            ..CacheConfig::default()
        };

        let result = RedisStore::connect(&config);
        assert!(matches!(result, Err(CacheError::ConnectionFailure(_))));
    }
}
