//! Simple Cache - a bounded, namespaced cache-aside layer
//!
//! Fronts an external key-value store with per-namespace membership
//! tracking, soft capacity limits, TTL reconciliation, and best-effort
//! function memoization.

pub mod cache;
pub mod config;
pub mod error;
pub mod memo;
pub mod store;

pub use cache::{Expiry, KeyCodec, Serializer, SimpleCache};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use memo::{Computed, MemoOptions, Memoized};
pub use store::{KeyTtl, MemoryStore, RedisStore, Store};
