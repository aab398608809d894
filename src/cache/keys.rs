//! Key Codec Module
//!
//! Pure derivation of physical key names and the membership-set name from a
//! logical namespace and key. No I/O. The physical format is stable wire
//! state shared with other clients of the same store:
//!
//! - entries: `SimpleCache-<namespace>:<key>`
//! - membership set: `SimpleCache-<namespace>-keys`

/// Prefix tag shared by every key this crate writes.
pub const CACHE_TAG: &str = "SimpleCache";

// == Key Codec ==
/// Derives physical names for one namespace, fixed at engine construction.
///
/// Distinct `(namespace, key)` pairs never collide: the namespace cannot
/// contain the `:` that ends the prefix, and everything after the first `:`
/// belongs verbatim to the logical key. Colons inside logical keys are a
/// caller-side sub-namespacing convention (`"foo:one"`), not a codec
/// separator.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    namespace: String,
}

impl KeyCodec {
    /// Creates a codec for a namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// The logical namespace this codec serves.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Physical key for a logical key.
    pub fn entry_key(&self, key: &str) -> String {
        format!("{}-{}:{}", CACHE_TAG, self.namespace, key)
    }

    /// Physical name of the namespace's membership set.
    pub fn set_key(&self) -> String {
        format!("{}-{}-keys", CACHE_TAG, self.namespace)
    }

    /// Glob pattern matching every entry under a caller sub-namespace.
    pub fn namespace_pattern(&self, sub_namespace: &str) -> String {
        self.entry_key(&format!("{}:*", sub_namespace))
    }

    /// Recovers the logical key from a physical entry key, or None if the
    /// key belongs to another namespace.
    pub fn logical_key(&self, physical: &str) -> Option<String> {
        physical
            .strip_prefix(&format!("{}-{}:", CACHE_TAG, self.namespace))
            .map(str::to_string)
    }

    /// Fully-qualified identifier exposed by iteration: `namespace:key`.
    pub fn qualified(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }
}
