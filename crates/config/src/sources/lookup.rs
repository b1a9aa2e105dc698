//! Closure-backed, lookup-only source

use crate::core::{ConfigResult, DEFAULT_ORDINAL, Properties, PropertySource, PropertyValue};

type LookupFn = dyn Fn(&str) -> Option<Option<String>> + Send + Sync;

/// A non-scannable source answering single-key lookups through a closure
///
/// Models lazy or remote stores that cannot enumerate their keys. The
/// source never appears in bulk snapshots, only in `get`.
pub struct LookupSource {
    name: String,
    ordinal: Option<i32>,
    lookup: Box<LookupFn>,
}

impl LookupSource {
    /// Create a source from a closure returning the value for a key
    pub fn new<F>(name: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self::with_nulls(name, move |key| lookup(key).map(Some))
    }

    /// Create a source whose closure can report explicit nulls
    ///
    /// `Some(None)` means the key is present with a null value.
    pub fn with_nulls<F>(name: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<Option<String>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            ordinal: None,
            lookup: Box::new(lookup),
        }
    }

    /// Set an explicit ordinal
    #[must_use = "builder methods must be chained or built"]
    pub fn with_ordinal(mut self, ordinal: i32) -> Self {
        self.ordinal = Some(ordinal);
        self
    }
}

impl PropertySource for LookupSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn explicit_ordinal(&self) -> Option<i32> {
        self.ordinal
    }

    fn default_ordinal(&self) -> i32 {
        DEFAULT_ORDINAL
    }

    fn properties(&self) -> ConfigResult<Properties> {
        Ok(Properties::new())
    }

    fn get(&self, key: &str) -> ConfigResult<Option<PropertyValue>> {
        Ok((self.lookup)(key).map(|found| match found {
            Some(value) => PropertyValue::new(key, value, self.name.as_str()),
            None => PropertyValue::null(key, self.name.as_str()),
        }))
    }

    fn is_scannable(&self) -> bool {
        false
    }
}

impl std::fmt::Debug for LookupSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupSource")
            .field("name", &self.name)
            .field("ordinal", &self.ordinal)
            .finish_non_exhaustive()
    }
}
