//! Hides metadata entries from snapshots

use super::{FilterContext, PropertyFilter};
use crate::core::{ConfigResult, PropertyValue, is_meta_key};

/// Removes `_`-prefixed keys from bulk snapshots
///
/// Single-key access always sees metadata entries: `get("_ordinal")` returns
/// the entry while `properties()` omits it.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataFilter;

impl MetadataFilter {
    /// Priority of the filter; runs before user filters
    pub const PRIORITY: i32 = 10_000;
}

impl PropertyFilter for MetadataFilter {
    fn filter_property(
        &self,
        value: PropertyValue,
        ctx: &FilterContext<'_>,
    ) -> ConfigResult<Option<PropertyValue>> {
        if !ctx.single_property_scoped && is_meta_key(ctx.key) {
            return Ok(None);
        }
        Ok(Some(value))
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn type_name(&self) -> &str {
        "MetadataFilter"
    }
}
