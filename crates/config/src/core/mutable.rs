//! Write-back transactions

use super::{ChangeEvent, ConfigContext, ConfigResult};
use crate::sources::MapChange;

/// Pending changes against a context's writable source
///
/// Nothing is visible until [`commit`](Self::commit); dropping the
/// transaction discards it.
#[derive(Debug)]
pub struct MutableConfig {
    context: ConfigContext,
    changes: Vec<MapChange>,
}

impl MutableConfig {
    pub(crate) fn new(context: ConfigContext) -> Self {
        Self {
            context,
            changes: Vec::new(),
        }
    }

    /// Set a key
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.changes.push(MapChange::Put(key.into(), value.into()));
        self
    }

    /// Remove a key from the writable source
    ///
    /// Lower-precedence sources holding the key become visible again.
    pub fn remove(&mut self, key: impl Into<String>) -> &mut Self {
        self.changes.push(MapChange::Remove(key.into()));
        self
    }

    /// Changes queued so far, in order
    pub fn pending(&self) -> &[MapChange] {
        &self.changes
    }

    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Apply every change atomically and notify listeners
    pub fn commit(self) -> ConfigResult<ChangeEvent> {
        self.context.commit(&self.changes)
    }
}
