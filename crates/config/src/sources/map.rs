//! In-memory property source

use crate::core::{ConfigResult, DEFAULT_ORDINAL, Properties, PropertySource, PropertyValue};
use parking_lot::RwLock;

/// A single pending write against a [`MapSource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapChange {
    /// Insert or replace a key
    Put(String, String),
    /// Remove a key
    Remove(String),
}

/// In-memory property source
///
/// Used for defaults, programmatic overrides, and as the writable source of a
/// context. Reads and writes go through a lock. A context never writes to its
/// writable source in place; it publishes a copy made by
/// [`with_changes`](Self::with_changes).
pub struct MapSource {
    name: String,
    ordinal: Option<i32>,
    default_ordinal: i32,
    scannable: bool,
    properties: RwLock<Properties>,
}

impl MapSource {
    /// Create an empty, scannable source
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ordinal: None,
            default_ordinal: DEFAULT_ORDINAL,
            scannable: true,
            properties: RwLock::new(Properties::new()),
        }
    }

    /// Create a source from existing pairs
    pub fn from_pairs<K, V>(name: impl Into<String>, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let source = Self::new(name);
        source
            .properties
            .write()
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        source
    }

    /// Add a property
    #[must_use = "builder methods must be chained or built"]
    pub fn with_property(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.write().insert(key.into(), value.into());
        self
    }

    /// Set an explicit ordinal
    #[must_use = "builder methods must be chained or built"]
    pub fn with_ordinal(mut self, ordinal: i32) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    /// Set the ordinal used when no explicit or `_ordinal` entry is present
    #[must_use = "builder methods must be chained or built"]
    pub fn with_default_ordinal(mut self, ordinal: i32) -> Self {
        self.default_ordinal = ordinal;
        self
    }

    /// Exclude the source from bulk snapshots
    #[must_use = "builder methods must be chained or built"]
    pub fn lookup_only(mut self) -> Self {
        self.scannable = false;
        self
    }

    /// Insert or replace a key
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.write().insert(key.into(), value.into());
    }

    /// Remove a key, returning the previous value
    pub fn remove(&self, key: &str) -> Option<String> {
        self.properties.write().remove(key)
    }

    /// Apply a batch of changes under one write lock
    pub fn apply(&self, changes: &[MapChange]) {
        apply_changes(&mut self.properties.write(), changes);
    }

    /// A copy of this source with `changes` applied
    ///
    /// Name, ordinals and scannability carry over; `self` is left untouched.
    #[must_use]
    pub fn with_changes(&self, changes: &[MapChange]) -> Self {
        let mut properties = self.properties.read().clone();
        apply_changes(&mut properties, changes);
        Self {
            name: self.name.clone(),
            ordinal: self.ordinal,
            default_ordinal: self.default_ordinal,
            scannable: self.scannable,
            properties: RwLock::new(properties),
        }
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.properties.read().len()
    }

    /// Check if the source holds no keys
    pub fn is_empty(&self) -> bool {
        self.properties.read().is_empty()
    }
}

fn apply_changes(properties: &mut Properties, changes: &[MapChange]) {
    for change in changes {
        match change {
            MapChange::Put(key, value) => {
                properties.insert(key.clone(), value.clone());
            }
            MapChange::Remove(key) => {
                properties.remove(key);
            }
        }
    }
}

impl PropertySource for MapSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn explicit_ordinal(&self) -> Option<i32> {
        self.ordinal
    }

    fn default_ordinal(&self) -> i32 {
        self.default_ordinal
    }

    fn properties(&self) -> ConfigResult<Properties> {
        if !self.scannable {
            return Ok(Properties::new());
        }
        Ok(self.properties.read().clone())
    }

    fn get(&self, key: &str) -> ConfigResult<Option<PropertyValue>> {
        Ok(self
            .properties
            .read()
            .get(key)
            .map(|value| PropertyValue::new(key, value.as_str(), self.name.as_str())))
    }

    fn is_scannable(&self) -> bool {
        self.scannable
    }
}

impl std::fmt::Debug for MapSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapSource")
            .field("name", &self.name)
            .field("ordinal", &self.ordinal)
            .field("scannable", &self.scannable)
            .field("keys", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ORDINAL_KEY;

    #[test]
    fn ordinal_entry_is_honoured() {
        let source = MapSource::new("m").with_property(ORDINAL_KEY, "250");
        assert_eq!(source.ordinal(), 250);
        assert_eq!(source.with_ordinal(3).ordinal(), 3);
    }

    #[test]
    fn lookup_only_hides_from_enumeration() {
        let source = MapSource::from_pairs("m", [("k", "v")]).lookup_only();
        assert!(source.properties().unwrap().is_empty());
        assert_eq!(source.get("k").unwrap().unwrap().value(), Some("v"));
        assert!(!source.is_scannable());
    }

    #[test]
    fn apply_batches_changes() {
        let source = MapSource::from_pairs("m", [("a", "1"), ("b", "2")]);
        source.apply(&[
            MapChange::Put("a".into(), "10".into()),
            MapChange::Remove("b".into()),
            MapChange::Put("c".into(), "3".into()),
        ]);
        let props = source.properties().unwrap();
        assert_eq!(props.get("a").map(String::as_str), Some("10"));
        assert!(!props.contains_key("b"));
        assert_eq!(props.get("c").map(String::as_str), Some("3"));
    }

    #[test]
    fn with_changes_leaves_the_original() {
        let source = MapSource::from_pairs("m", [("a", "1")])
            .with_ordinal(42)
            .lookup_only();
        let changed = source.with_changes(&[
            MapChange::Put("a".into(), "2".into()),
            MapChange::Put("b".into(), "3".into()),
        ]);

        assert_eq!(source.get("a").unwrap().unwrap().value(), Some("1"));
        assert_eq!(changed.get("a").unwrap().unwrap().value(), Some("2"));
        assert_eq!(changed.len(), 2);
        assert_eq!(changed.name(), "m");
        assert_eq!(changed.ordinal(), 42);
        assert!(!changed.is_scannable());
    }
}
