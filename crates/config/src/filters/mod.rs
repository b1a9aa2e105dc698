//! Property filter pipeline
//!
//! Filters run in descending [`priority`](PropertyFilter::priority); equal
//! priorities fall back to [`type_name`](PropertyFilter::type_name) ascending.
//! The order is computed once when the pipeline is built.
//!
//! A filter may pass a value through, rewrite it (keeping the key), or veto
//! it with `Ok(None)`, which stops the chain and makes the key absent. A
//! filter returning `Err` is logged and the value passes through unchanged.

mod function;
mod masking;
mod metadata;
mod pattern;

pub use function::FnFilter;
pub use masking::{DEFAULT_MASK, MaskingFilter};
pub use metadata::MetadataFilter;
pub use pattern::RegexFilter;

use crate::core::{ConfigError, ConfigResult, PropertyValue};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A pipeline stage that may veto or rewrite a property value
pub trait PropertyFilter: Send + Sync {
    /// Filter one value
    ///
    /// Returning `Ok(None)` removes the key. A rewritten value must keep the
    /// key of the input.
    fn filter_property(
        &self,
        value: PropertyValue,
        ctx: &FilterContext<'_>,
    ) -> ConfigResult<Option<PropertyValue>>;

    /// Ordering priority, higher runs first
    fn priority(&self) -> i32 {
        0
    }

    /// Name used for the ordering tie-break and in logs
    fn type_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// What a filter knows about the value it is given
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    /// The key being filtered
    pub key: &'a str,
    /// The value as it entered the pipeline, before any rewrite
    pub current_value: &'a PropertyValue,
    /// The whole merge, available in bulk mode
    pub prior_values: Option<&'a BTreeMap<String, PropertyValue>>,
    /// `true` for direct single-key access, `false` for snapshot builds
    pub single_property_scoped: bool,
}

impl<'a> FilterContext<'a> {
    /// Context for a direct single-key access
    pub fn single(value: &'a PropertyValue) -> Self {
        Self {
            key: value.key(),
            current_value: value,
            prior_values: None,
            single_property_scoped: true,
        }
    }

    /// Context for one key of a bulk snapshot build
    pub fn bulk(value: &'a PropertyValue, prior_values: &'a BTreeMap<String, PropertyValue>) -> Self {
        Self {
            key: value.key(),
            current_value: value,
            prior_values: Some(prior_values),
            single_property_scoped: false,
        }
    }
}

/// Which access modes a filter applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterScope {
    /// Only snapshot builds
    #[default]
    Bulk,
    /// Snapshot builds and single-key access
    Always,
}

impl FilterScope {
    /// Check whether a filter with this scope runs for `ctx`
    pub fn applies(self, ctx: &FilterContext<'_>) -> bool {
        self == FilterScope::Always || !ctx.single_property_scoped
    }
}

/// Ordered chain of filters
#[derive(Clone, Default)]
pub struct FilterPipeline {
    filters: Vec<Arc<dyn PropertyFilter>>,
}

impl FilterPipeline {
    /// Build a pipeline, fixing the run order
    pub fn new(filters: impl IntoIterator<Item = Arc<dyn PropertyFilter>>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().collect();
        filters.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.type_name().cmp(b.type_name()))
        });
        Self { filters }
    }

    /// Filter names in run order
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.type_name()).collect()
    }

    /// Number of filters
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if the pipeline has no filters
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run every filter over `value`
    ///
    /// `None` means a filter vetoed the value.
    pub fn apply(&self, mut value: PropertyValue, ctx: &FilterContext<'_>) -> Option<PropertyValue> {
        for filter in &self.filters {
            let fallback = value.clone();
            match filter.filter_property(value, ctx) {
                Ok(Some(rewritten)) if rewritten.key() == fallback.key() => value = rewritten,
                Ok(Some(rewritten)) => {
                    let err = ConfigError::filter(
                        filter.type_name(),
                        fallback.key(),
                        format!("rewrote the key to '{}'", rewritten.key()),
                    );
                    tracing::warn!(action = "filter", error = %err, "Ignoring filter result");
                    value = fallback;
                }
                Ok(None) => {
                    tracing::trace!(
                        filter = filter.type_name(),
                        key = ctx.key,
                        "Property vetoed"
                    );
                    return None;
                }
                Err(e) => {
                    tracing::warn!(
                        action = "filter",
                        filter = filter.type_name(),
                        key = ctx.key,
                        error = %e,
                        "Filter failed, passing value through"
                    );
                    value = fallback;
                }
            }
        }
        Some(value)
    }

    /// Filter a value read through direct single-key access
    pub fn apply_single(&self, value: PropertyValue) -> Option<PropertyValue> {
        if self.filters.is_empty() {
            return Some(value);
        }
        let original = value.clone();
        self.apply(value, &FilterContext::single(&original))
    }

    /// Filter every value of a merge for a snapshot build
    pub fn apply_bulk(
        &self,
        merged: &BTreeMap<String, PropertyValue>,
    ) -> BTreeMap<String, PropertyValue> {
        merged
            .values()
            .filter_map(|value| {
                self.apply(value.clone(), &FilterContext::bulk(value, merged))
                    .map(|kept| (kept.key().to_string(), kept))
            })
            .collect()
    }
}

impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("filters", &self.names())
            .finish()
    }
}
