//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
///
/// Engine-level operations raise these to their direct caller. The
/// memoization path treats every variant as non-fatal and falls back to
/// direct invocation.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key was never stored, or has already been fully reconciled
    #[error("Cache miss: {0}")]
    CacheMiss(String),

    /// Key is still tracked but its value's TTL fired in the store
    #[error("Key expired: {0}")]
    ExpiredKey(String),

    /// Store unreachable; the engine operates in pass-through mode
    #[error("No store connection: {0}")]
    ConnectionFailure(String),

    /// Value or arguments could not be encoded/decoded
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Any other store-command failure
    #[error("Store error: {0}")]
    Store(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::CacheMiss("foo".to_string());
        assert_eq!(err.to_string(), "Cache miss: foo");

        let err = CacheError::ExpiredKey("bar".to_string());
        assert_eq!(err.to_string(), "Key expired: bar");
    }

    #[test]
    fn test_serialization_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: CacheError = json_err.into();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
