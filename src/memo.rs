//! Memoization Module
//!
//! Wraps a function so results are served from a bounded keyspace engine,
//! keyed by the function's identity plus its serialized arguments. Caching
//! is strictly best-effort: every caching-layer failure degrades to direct
//! invocation, and the wrapped function runs at most once per call.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::cache::{Serializer, SimpleCache};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Computed ==
/// What a wrapped function hands back on each invocation.
///
/// `Bypass` is the escape hatch: the carried value is returned to the
/// caller without touching the store. The payload is the caller's own type,
/// so it can just as well carry an application-level `Result` when the
/// point is to not cache a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Computed<T> {
    /// Cache this result under the derived key, then return it
    Store(T),
    /// Return this result without storing anything
    Bypass(T),
}

impl<T> Computed<T> {
    /// Unwraps the carried value, either variant.
    pub fn into_inner(self) -> T {
        match self {
            Computed::Store(value) | Computed::Bypass(value) => value,
        }
    }
}

// == Memo Options ==
/// Configuration for a memoized function's backing engine and key scheme.
#[derive(Debug, Clone)]
pub struct MemoOptions {
    /// Soft cap on tracked keys for the backing engine
    pub limit: usize,
    /// Default TTL in seconds for stored results; None or 0 = no expiry
    pub ttl: Option<u64>,
    /// Encoding used for both argument keys and stored results
    pub serializer: Serializer,
    /// Digest argument encodings into fixed-length keys
    pub hashed_keys: bool,
    /// Engine namespace override; defaults to the function name
    pub namespace: Option<String>,
}

impl Default for MemoOptions {
    fn default() -> Self {
        Self {
            limit: 1000,
            ttl: Some(60 * 60 * 24),
            serializer: Serializer::Json,
            hashed_keys: true,
            namespace: None,
        }
    }
}

// == Memoized ==
/// A function wrapped with cache-aside memoization.
///
/// `A` is the argument tuple (anything serializable), `T` the result. The
/// wrapped function returns [`Computed`] so it can opt any single call out
/// of storage while still returning a value.
pub struct Memoized<A, T, F> {
    name: String,
    cache: SimpleCache,
    serializer: Serializer,
    hashed_keys: bool,
    func: F,
    _marker: PhantomData<fn(&A) -> T>,
}

impl<A, T, F> Memoized<A, T, F>
where
    A: Serialize,
    T: Serialize + DeserializeOwned,
    F: Fn(&A) -> Computed<T>,
{
    // == Constructors ==
    /// Wraps a function with default options, connecting a fresh engine
    /// from environment configuration. `name` is the function identity
    /// used in every derived key.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self::with_options(name, MemoOptions::default(), func)
    }

    /// Wraps a function, building the backing engine from the given
    /// options on top of environment store configuration.
    pub fn with_options(name: impl Into<String>, options: MemoOptions, func: F) -> Self {
        let name = name.into();
        let namespace = options.namespace.unwrap_or_else(|| name.clone());
        let config = CacheConfig {
            limit: options.limit,
            default_ttl: options.ttl,
            ..CacheConfig::from_env()
        };
        let cache = SimpleCache::open(namespace, &config);
        Self {
            name,
            cache,
            serializer: options.serializer,
            hashed_keys: options.hashed_keys,
            func,
            _marker: PhantomData,
        }
    }

    /// Wraps a function around an explicit engine instance. The engine's
    /// own limit and default TTL apply.
    pub fn with_cache(name: impl Into<String>, cache: SimpleCache, func: F) -> Self {
        Self {
            name: name.into(),
            cache,
            serializer: Serializer::Json,
            hashed_keys: true,
            func,
            _marker: PhantomData,
        }
    }

    /// Switches the encoding used for keys and stored results.
    pub fn serializer(mut self, serializer: Serializer) -> Self {
        self.serializer = serializer;
        self
    }

    /// Uses raw serialized arguments as keys instead of digests. Keys grow
    /// with argument size; digests trade that for a documented hash
    /// collision risk.
    pub fn raw_keys(mut self) -> Self {
        self.hashed_keys = false;
        self
    }

    /// The engine backing this wrapper.
    pub fn cache(&self) -> &SimpleCache {
        &self.cache
    }

    // == Call ==
    /// Invokes the wrapped function through the cache.
    ///
    /// With no live store connection this is a plain function call. A
    /// cache hit skips invocation entirely; `CacheMiss`/`ExpiredKey` fall
    /// through to invocation; any other caching-layer failure is logged
    /// and also falls through. The function runs at most once per call,
    /// and repeated hits return independently decoded copies.
    pub fn call(&self, args: &A) -> T {
        if !self.cache.is_connected() {
            return (self.func)(args).into_inner();
        }

        let cache_key = match self.cache_key(args) {
            Ok(key) => key,
            Err(err) => {
                warn!("Key derivation failed for '{}': {}", self.name, err);
                return (self.func)(args).into_inner();
            }
        };

        match self.cache.get_with::<T>(&cache_key, self.serializer) {
            Ok(value) => return value,
            Err(CacheError::CacheMiss(_)) | Err(CacheError::ExpiredKey(_)) => {}
            Err(err) => {
                warn!("Cache fetch failed for '{}': {}", cache_key, err);
            }
        }

        match (self.func)(args) {
            Computed::Bypass(value) => value,
            Computed::Store(value) => {
                if let Err(err) =
                    self.cache
                        .store_with(&cache_key, &value, None, self.serializer)
                {
                    warn!("Cache store failed for '{}': {}", cache_key, err);
                }
                value
            }
        }
    }

    // == Key Derivation ==
    /// `<name>:<digest-or-serialized(args)>`. Two calls are
    /// cache-equivalent iff their serialized arguments are byte-identical
    /// (or collide under the digest, when enabled).
    fn cache_key(&self, args: &A) -> Result<String> {
        let encoded = self.serializer.encode(args)?;
        let key = if self.hashed_keys {
            hex::encode(Sha256::digest(encoded.as_bytes()))
        } else {
            encoded
        };
        Ok(format!("{}:{}", self.name, key))
    }
}
