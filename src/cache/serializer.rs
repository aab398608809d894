//! Serializer Module
//!
//! Pluggable value encodings. Every encoding produces a UTF-8 string so
//! entries stay uniform store-side regardless of strategy.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CacheError, Result};

// == Serializer ==
/// Value encoding strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Serializer {
    /// Structured text: serde_json
    #[default]
    Json,
    /// Binary object encoding, base64-wrapped: bincode
    Binary,
}

impl Serializer {
    // == Encode ==
    /// Encodes a value to its stored string form.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            Serializer::Json => Ok(serde_json::to_string(value)?),
            Serializer::Binary => {
                let bytes = bincode::serialize(value)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?;
                Ok(BASE64.encode(bytes))
            }
        }
    }

    // == Decode ==
    /// Decodes a stored string back into a value.
    pub fn decode<T: DeserializeOwned>(&self, raw: &str) -> Result<T> {
        match self {
            Serializer::Json => Ok(serde_json::from_str(raw)?),
            Serializer::Binary => {
                let bytes = BASE64
                    .decode(raw)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?;
                bincode::deserialize(&bytes).map_err(|e| CacheError::Serialization(e.to_string()))
            }
        }
    }
}
