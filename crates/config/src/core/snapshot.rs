//! Resolved configuration snapshots and change events

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// The merged, filtered and resolved view of a context at one point in time
///
/// Snapshots are immutable and shared behind an `Arc`; a reader holding one
/// keeps seeing the same data across reloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSnapshot {
    values: BTreeMap<String, String>,
    metadata: BTreeMap<String, String>,
    version: u64,
    built_at: DateTime<Utc>,
}

impl ConfigSnapshot {
    pub(crate) fn new(
        values: BTreeMap<String, String>,
        metadata: BTreeMap<String, String>,
        version: u64,
    ) -> Self {
        Self {
            values,
            metadata,
            version,
            built_at: Utc::now(),
        }
    }

    /// Value of a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Check if a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// All values, ordered by key
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Keys in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Key/value pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the snapshot has no keys
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Provenance entries, keyed `_<key>.source`, `_<key>.ordinal`, ...
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Name of the source a key came from
    pub fn source_of(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(&super::meta_key(key, super::META_SOURCE))
            .map(String::as_str)
    }

    /// Version of the source set the snapshot was built from
    pub fn version(&self) -> u64 {
        self.version
    }

    /// When the snapshot was built
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

/// How a key changed between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Key appeared
    Added,
    /// Key disappeared
    Removed,
    /// Key changed value
    Updated,
}

/// A single key change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyChange {
    /// The key
    pub key: String,
    /// What happened
    pub kind: ChangeKind,
    /// Previous value
    pub old_value: Option<String>,
    /// New value
    pub new_value: Option<String>,
}

/// Notification sent to listeners after a reload or write-back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    /// Version before the change
    pub old_version: u64,
    /// Version after the change
    pub new_version: u64,
    /// Changed keys, ordered by key
    pub changes: Vec<PropertyChange>,
    /// When the change was published
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Diff two snapshots
    pub fn between(old: &ConfigSnapshot, new: &ConfigSnapshot) -> Self {
        let keys: BTreeSet<&String> = old.values.keys().chain(new.values.keys()).collect();
        let changes = keys
            .into_iter()
            .filter_map(|key| {
                let before = old.values.get(key);
                let after = new.values.get(key);
                let kind = match (before, after) {
                    (None, Some(_)) => ChangeKind::Added,
                    (Some(_), None) => ChangeKind::Removed,
                    (Some(b), Some(a)) if b != a => ChangeKind::Updated,
                    _ => return None,
                };
                Some(PropertyChange {
                    key: key.clone(),
                    kind,
                    old_value: before.cloned(),
                    new_value: after.cloned(),
                })
            })
            .collect();

        Self {
            old_version: old.version,
            new_version: new.version,
            changes,
            timestamp: Utc::now(),
        }
    }

    /// Check if nothing changed
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Look up the change for a key
    pub fn change(&self, key: &str) -> Option<&PropertyChange> {
        self.changes.iter().find(|change| change.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn snapshot(pairs: &[(&str, &str)], version: u64) -> ConfigSnapshot {
        ConfigSnapshot::new(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            BTreeMap::new(),
            version,
        )
    }

    #[test]
    fn diff_reports_each_kind() {
        let old = snapshot(&[("kept", "1"), ("gone", "x"), ("moved", "a")], 1);
        let new = snapshot(&[("kept", "1"), ("moved", "b"), ("fresh", "y")], 2);
        let event = ChangeEvent::between(&old, &new);

        assert_eq!((event.old_version, event.new_version), (1, 2));
        let kinds: Vec<_> = event.changes.iter().map(|c| (c.key.as_str(), c.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("fresh", ChangeKind::Added),
                ("gone", ChangeKind::Removed),
                ("moved", ChangeKind::Updated),
            ]
        );
        assert_eq!(event.change("moved").unwrap().old_value.as_deref(), Some("a"));
        assert!(event.change("kept").is_none());
    }

    #[test]
    fn serializes_values_and_version() {
        let json = serde_json::to_value(snapshot(&[("a", "1")], 3)).unwrap();
        assert_eq!(json["values"]["a"], "1");
        assert_eq!(json["version"], 3);
    }
}
