//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;

/// Cache and store connection parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Store host
    pub host: String,
    /// Store port
    pub port: u16,
    /// Store database number
    pub db: i64,
    /// Optional store password
    pub password: Option<String>,
    /// Soft cap on the number of tracked keys per namespace
    pub limit: usize,
    /// Default TTL in seconds for entries stored without an explicit TTL.
    /// None or 0 means entries never expire unless a TTL is given per store.
    pub default_ttl: Option<u64>,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_HOST` - Store host (default: 127.0.0.1)
    /// - `REDIS_PORT` - Store port (default: 6379)
    /// - `REDIS_DB` - Store database number (default: 0)
    /// - `REDIS_PASSWORD` - Store password (default: none)
    /// - `CACHE_LIMIT` - Tracked-key soft cap per namespace (default: 1000)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 86400)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("REDIS_HOST").unwrap_or(defaults.host),
            port: env::var("REDIS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            db: env::var("REDIS_DB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.db),
            password: env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
            limit: env::var("CACHE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.limit),
            default_ttl: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .or(defaults.default_ttl),
        }
    }

    /// Connection URL for the store client.
    ///
    /// Password and database number are included only when set.
    pub fn url(&self) -> String {
        let auth = match &self.password {
            Some(password) => format!(":{}@", password),
            None => String::new(),
        };
        format!("redis://{}{}:{}/{}", auth, self.host, self.port, self.db)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 0,
            password: None,
            limit: 1000,
            default_ttl: Some(60 * 60 * 24),
        }
    }
}
