//! Property values and the reserved key conventions

use serde::Serialize;
use std::collections::BTreeMap;

/// Reserved key a source may carry to override its own ordinal
pub const ORDINAL_KEY: &str = "_ordinal";

/// Prefix marking metadata entries
pub const META_PREFIX: &str = "_";

/// Suffix of the per-key provenance entry (`_<key>.source`)
pub const SOURCE_SUFFIX: &str = ".source";

/// Meta entry holding the name of the source a value came from
pub const META_SOURCE: &str = "source";

/// Meta entry holding the ordinal of the source a value came from
pub const META_ORDINAL: &str = "ordinal";

/// Meta entry holding the time a value was read
pub const META_TIMESTAMP: &str = "timestamp";

/// Check whether a key is a metadata entry
pub fn is_meta_key(key: &str) -> bool {
    key.starts_with(META_PREFIX)
}

/// Build the snapshot metadata key for one meta entry of `key`
///
/// `meta_key("db.url", "source")` is `_db.url.source`.
pub fn meta_key(key: &str, entry: &str) -> String {
    format!("{META_PREFIX}{key}.{entry}")
}

/// A single configuration value together with its provenance
///
/// Values are immutable; the `with_*` methods return modified copies.
/// A `value` of `None` means the source holds the key with an explicit null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyValue {
    key: String,
    value: Option<String>,
    source: String,
    meta_entries: BTreeMap<String, String>,
}

impl PropertyValue {
    /// Create a value read from `source`
    pub fn new(key: impl Into<String>, value: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            source: source.into(),
            meta_entries: BTreeMap::new(),
        }
    }

    /// Create an explicit null for `key`
    pub fn null(key: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            source: source.into(),
            meta_entries: BTreeMap::new(),
        }
    }

    /// The property key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value, `None` for an explicit null
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Name of the source that produced this value
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Provenance entries
    pub fn meta_entries(&self) -> &BTreeMap<String, String> {
        &self.meta_entries
    }

    /// Look up a single provenance entry
    pub fn meta(&self, entry: &str) -> Option<&str> {
        self.meta_entries.get(entry).map(String::as_str)
    }

    /// Check whether the value is an explicit null
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Replace the value, keeping key, source and meta entries
    #[must_use = "values are immutable, use the returned copy"]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Turn the value into an explicit null
    #[must_use = "values are immutable, use the returned copy"]
    pub fn without_value(mut self) -> Self {
        self.value = None;
        self
    }

    /// Add a provenance entry
    #[must_use = "values are immutable, use the returned copy"]
    pub fn with_meta(mut self, entry: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta_entries.insert(entry.into(), value.into());
        self
    }

    /// Consume the value, returning the inner string
    pub fn into_value(self) -> Option<String> {
        self.value
    }
}
