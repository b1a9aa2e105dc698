//! Aggregation of property sources
//!
//! Sources are ordered ascending by `(ordinal, name)` once, when a
//! [`SourceSet`] is built. Merging walks that order so the last write wins;
//! single-key lookup walks it in reverse and stops at the first non-null value.

use super::{
    ConfigResultExt, META_ORDINAL, META_SOURCE, META_TIMESTAMP, PropertySource, PropertyValue,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// A source together with the ordinal resolved at registration
#[derive(Clone)]
pub struct RegisteredSource {
    source: Arc<dyn PropertySource>,
    name: String,
    ordinal: i32,
}

impl RegisteredSource {
    /// Resolve the ordinal of `source` and register it
    pub fn new(source: Arc<dyn PropertySource>) -> Self {
        let name = source.name().to_string();
        let ordinal = source.ordinal();
        Self {
            source,
            name,
            ordinal,
        }
    }

    /// Source name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective ordinal
    pub fn ordinal(&self) -> i32 {
        self.ordinal
    }

    /// The underlying source
    pub fn source(&self) -> &Arc<dyn PropertySource> {
        &self.source
    }

    fn annotate(&self, value: PropertyValue, read_at: &str) -> PropertyValue {
        value
            .with_meta(META_SOURCE, self.name.as_str())
            .with_meta(META_ORDINAL, self.ordinal.to_string())
            .with_meta(META_TIMESTAMP, read_at)
    }
}

impl std::fmt::Debug for RegisteredSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredSource")
            .field("name", &self.name)
            .field("ordinal", &self.ordinal)
            .field("scannable", &self.source.is_scannable())
            .finish()
    }
}

fn sort_entries(entries: &mut [RegisteredSource]) {
    entries.sort_by(|a, b| a.ordinal.cmp(&b.ordinal).then_with(|| a.name.cmp(&b.name)));
}

/// An immutable, ordinal-sorted set of sources
///
/// The set carries the version it was published under so snapshots can be
/// matched to the sources they were built from.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    entries: Vec<RegisteredSource>,
    version: u64,
}

impl SourceSet {
    /// Register and sort `sources`
    ///
    /// A source whose name is already taken is dropped with a warning.
    pub fn new(sources: impl IntoIterator<Item = Arc<dyn PropertySource>>, version: u64) -> Self {
        let mut seen = HashSet::new();
        let mut entries: Vec<RegisteredSource> = sources
            .into_iter()
            .filter(|source| {
                let fresh = seen.insert(source.name().to_string());
                if !fresh {
                    tracing::warn!(
                        action = "register_source",
                        source = source.name(),
                        "Dropping property source with duplicate name"
                    );
                }
                fresh
            })
            .map(RegisteredSource::new)
            .collect();

        sort_entries(&mut entries);

        Self { entries, version }
    }

    /// Swap the entry holding `old` for `new` under a new version
    ///
    /// Every other entry keeps its registration; the replacement has its
    /// ordinal resolved again. Sets not containing `old` are copied as is.
    pub fn replacing<T: ?Sized>(
        &self,
        old: &Arc<T>,
        new: &Arc<dyn PropertySource>,
        version: u64,
    ) -> Self {
        let mut entries: Vec<RegisteredSource> = self
            .entries
            .iter()
            .map(|entry| {
                if std::ptr::addr_eq(Arc::as_ptr(&entry.source), Arc::as_ptr(old)) {
                    RegisteredSource::new(Arc::clone(new))
                } else {
                    entry.clone()
                }
            })
            .collect();
        sort_entries(&mut entries);

        Self { entries, version }
    }

    /// The same sources under a new version
    pub fn with_version(&self, version: u64) -> Self {
        Self {
            entries: self.entries.clone(),
            version,
        }
    }

    /// Version this set was published under
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Sources in ascending precedence
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &RegisteredSource> {
        self.entries.iter()
    }

    /// Number of sources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the set has no sources
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge every scannable source into one map
    pub fn merge(&self) -> BTreeMap<String, PropertyValue> {
        merge(&self.entries)
    }

    /// Look up one key across all sources, highest precedence first
    ///
    /// Returns the first non-null value. If sources only hold explicit nulls
    /// for the key, the highest-precedence null is returned; `None` means no
    /// source knows the key.
    pub fn lookup(&self, key: &str) -> Option<PropertyValue> {
        let read_at = chrono::Utc::now().to_rfc3339();
        let mut first_null = None;

        for entry in self.entries.iter().rev() {
            let found = entry
                .source
                .get(key)
                .skip_logged("lookup", &entry.name)
                .flatten();

            match found {
                Some(value) if !value.is_null() => {
                    return Some(entry.annotate(value, &read_at));
                }
                Some(null) => {
                    if first_null.is_none() {
                        first_null = Some(entry.annotate(null, &read_at));
                    }
                }
                None => {}
            }
        }

        first_null
    }
}

/// Merge scannable sources, already sorted ascending by `(ordinal, name)`
///
/// Later entries overwrite earlier ones. A source whose enumeration fails is
/// logged and skipped.
pub fn merge(sources: &[RegisteredSource]) -> BTreeMap<String, PropertyValue> {
    let read_at = chrono::Utc::now().to_rfc3339();
    let mut merged = BTreeMap::new();

    for entry in sources {
        if !entry.source.is_scannable() {
            tracing::trace!(source = %entry.name, "Skipping non-scannable source in merge");
            continue;
        }

        let Some(properties) = entry
            .source
            .properties()
            .skip_logged("load_source", &entry.name)
        else {
            continue;
        };

        tracing::debug!(
            action = "source_merged",
            source = %entry.name,
            ordinal = entry.ordinal,
            keys = properties.len(),
            "Merged property source"
        );

        for (key, value) in properties {
            let value = entry.annotate(
                PropertyValue::new(key.as_str(), value, entry.name.as_str()),
                &read_at,
            );
            merged.insert(key, value);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ConfigError, ConfigResult, Properties};
    use crate::sources::{LookupSource, MapSource};
    use pretty_assertions::assert_eq;

    fn map(name: &str, ordinal: i32, pairs: &[(&str, &str)]) -> Arc<dyn PropertySource> {
        let mut source = MapSource::new(name).with_ordinal(ordinal);
        for (k, v) in pairs {
            source = source.with_property(*k, *v);
        }
        Arc::new(source)
    }

    struct Broken;

    impl PropertySource for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn properties(&self) -> ConfigResult<Properties> {
            Err(ConfigError::source_load("broken", "disk on fire"))
        }

        fn get(&self, _key: &str) -> ConfigResult<Option<PropertyValue>> {
            Err(ConfigError::source_load("broken", "disk on fire"))
        }
    }

    #[test]
    fn higher_ordinal_wins() {
        let set = SourceSet::new(
            [map("a", 10, &[("k", "a")]), map("b", 20, &[("k", "b")])],
            1,
        );
        assert_eq!(set.merge()["k"].value(), Some("b"));
        assert_eq!(set.lookup("k").unwrap().value(), Some("b"));
    }

    #[test]
    fn tie_break_is_independent_of_load_order() {
        let forward = SourceSet::new(
            [map("alpha", 10, &[("k", "alpha")]), map("beta", 10, &[("k", "beta")])],
            1,
        );
        let backward = SourceSet::new(
            [map("beta", 10, &[("k", "beta")]), map("alpha", 10, &[("k", "alpha")])],
            1,
        );
        assert_eq!(forward.merge()["k"].value(), Some("beta"));
        assert_eq!(backward.merge()["k"].value(), Some("beta"));

        let (f, b) = (forward.lookup("k").unwrap(), backward.lookup("k").unwrap());
        assert_eq!((f.value(), f.source()), (b.value(), b.source()));
    }

    #[test]
    fn merged_values_carry_provenance() {
        let set = SourceSet::new([map("defaults", 7, &[("k", "v")])], 1);
        let merged = set.merge();
        let value = &merged["k"];
        assert_eq!(value.source(), "defaults");
        assert_eq!(value.meta(META_SOURCE), Some("defaults"));
        assert_eq!(value.meta(META_ORDINAL), Some("7"));
        assert!(value.meta(META_TIMESTAMP).is_some());
    }

    #[test]
    fn non_scannable_sources_are_lookup_only() {
        let lazy: Arc<dyn PropertySource> = Arc::new(LookupSource::new("remote", |key| {
            (key == "remote.key").then(|| "remote-value".to_string())
        }));
        let set = SourceSet::new([lazy, map("local", 0, &[("local.key", "x")])], 1);

        assert!(!set.merge().contains_key("remote.key"));
        assert_eq!(
            set.lookup("remote.key").unwrap().value(),
            Some("remote-value")
        );
    }

    #[test]
    fn failing_source_is_skipped() {
        let broken: Arc<dyn PropertySource> = Arc::new(Broken);
        let set = SourceSet::new([broken, map("ok", 0, &[("k", "v")])], 1);
        let merged = set.merge();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged["k"].value(), Some("v"));
        assert_eq!(set.lookup("k").unwrap().value(), Some("v"));
    }

    #[test]
    fn lookup_falls_through_nulls() {
        let nulls: Arc<dyn PropertySource> = Arc::new(
            LookupSource::with_nulls("nulls", |key| (key == "k").then_some(None)).with_ordinal(100),
        );
        let set = SourceSet::new([nulls.clone(), map("low", 0, &[("k", "low")])], 1);
        assert_eq!(set.lookup("k").unwrap().value(), Some("low"));

        let only_null = SourceSet::new([nulls], 1);
        let value = only_null.lookup("k").unwrap();
        assert!(value.is_null());
        assert_eq!(value.source(), "nulls");
        assert!(only_null.lookup("other").is_none());
    }

    #[test]
    fn duplicate_names_keep_the_first() {
        let set = SourceSet::new(
            [map("same", 0, &[("k", "first")]), map("same", 5, &[("k", "second")])],
            1,
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.merge()["k"].value(), Some("first"));
    }

    #[test]
    fn replacing_swaps_one_entry() {
        let old = map("runtime", 10, &[("k", "old")]);
        let other = map("defaults", 0, &[("k", "default"), ("d", "x")]);
        let set = SourceSet::new([Arc::clone(&old), other], 1);

        let new = map("runtime", 10, &[("k", "new")]);
        let next = set.replacing(&old, &new, 2);

        assert_eq!(next.version(), 2);
        assert_eq!(next.len(), 2);
        assert_eq!(next.lookup("k").unwrap().value(), Some("new"));
        assert_eq!(next.lookup("d").unwrap().value(), Some("x"));
        assert_eq!(set.lookup("k").unwrap().value(), Some("old"));

        let untouched = set.replacing(&map("stranger", 0, &[]), &new, 3);
        assert_eq!(untouched.lookup("k").unwrap().value(), Some("old"));
    }
}
