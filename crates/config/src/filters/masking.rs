//! Masking of sensitive values

use super::{FilterContext, PropertyFilter};
use crate::core::{ConfigError, ConfigResult, PropertyValue};
use regex::RegexSet;

/// Replacement used by [`MaskingFilter`] unless configured otherwise
pub const DEFAULT_MASK: &str = "*****";

/// Replaces the value of sensitive keys with a mask
///
/// Applies to both single-key access and snapshots. Explicit nulls stay
/// null so absence is still visible.
#[derive(Debug, Clone)]
pub struct MaskingFilter {
    patterns: RegexSet,
    mask: String,
    priority: i32,
}

impl MaskingFilter {
    /// Mask keys matching any of `patterns`
    pub fn new<I, S>(patterns: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = RegexSet::new(patterns)
            .map_err(|e| ConfigError::parse("masking patterns", e.to_string()))?;
        Ok(Self {
            patterns,
            mask: DEFAULT_MASK.to_string(),
            priority: -100,
        })
    }

    /// Use a different replacement
    #[must_use = "builder methods must be chained or built"]
    pub fn with_mask(mut self, mask: impl Into<String>) -> Self {
        self.mask = mask.into();
        self
    }

    /// Override the priority
    #[must_use = "builder methods must be chained or built"]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Check whether `key` is masked
    pub fn is_sensitive(&self, key: &str) -> bool {
        self.patterns.is_match(key)
    }
}

impl PropertyFilter for MaskingFilter {
    fn filter_property(
        &self,
        value: PropertyValue,
        ctx: &FilterContext<'_>,
    ) -> ConfigResult<Option<PropertyValue>> {
        if value.is_null() || !self.is_sensitive(ctx.key) {
            return Ok(Some(value));
        }
        Ok(Some(value.with_value(self.mask.as_str())))
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn type_name(&self) -> &str {
        "MaskingFilter"
    }
}
