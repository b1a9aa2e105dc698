//! Closure-backed filter

use super::{FilterContext, PropertyFilter};
use crate::core::{ConfigResult, PropertyValue};

type FilterFn =
    dyn Fn(PropertyValue, &FilterContext<'_>) -> ConfigResult<Option<PropertyValue>> + Send + Sync;

/// A filter defined by a closure, with an explicit name and priority
pub struct FnFilter {
    name: String,
    priority: i32,
    filter: Box<FilterFn>,
}

impl FnFilter {
    /// Create a filter
    pub fn new<F>(name: impl Into<String>, priority: i32, filter: F) -> Self
    where
        F: Fn(PropertyValue, &FilterContext<'_>) -> ConfigResult<Option<PropertyValue>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            priority,
            filter: Box::new(filter),
        }
    }

    /// Create a filter that vetoes every key for which `predicate` holds
    pub fn veto<P>(name: impl Into<String>, predicate: P) -> Self
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::new(name, 0, move |value, ctx| {
            Ok((!predicate(ctx.key)).then_some(value))
        })
    }
}

impl PropertyFilter for FnFilter {
    fn filter_property(
        &self,
        value: PropertyValue,
        ctx: &FilterContext<'_>,
    ) -> ConfigResult<Option<PropertyValue>> {
        (self.filter)(value, ctx)
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn type_name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for FnFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFilter")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
