//! Cache Module
//!
//! The bounded keyspace engine plus its pure helpers: key derivation and
//! value serialization.

mod engine;
mod keys;
mod serializer;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use engine::{Expiry, SimpleCache};
pub use keys::{KeyCodec, CACHE_TAG};
pub use serializer::Serializer;
