//! Regex-based key inclusion and exclusion

use super::{FilterContext, FilterScope, PropertyFilter};
use crate::core::{ConfigError, ConfigResult, PropertyValue};
use regex::Regex;

/// Keeps keys matching any include pattern and no exclude pattern
///
/// With no include patterns every key is a candidate. By default the filter
/// only shapes snapshots; use [`with_scope`](Self::with_scope) to apply it to
/// single-key access too.
#[derive(Debug, Clone, Default)]
pub struct RegexFilter {
    includes: Vec<Regex>,
    excludes: Vec<Regex>,
    scope: FilterScope,
    priority: i32,
}

fn compile(pattern: &str) -> ConfigResult<Regex> {
    Regex::new(pattern).map_err(|e| ConfigError::parse(format!("key pattern '{pattern}'"), e.to_string()))
}

impl RegexFilter {
    /// Create a filter that keeps everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an include pattern
    pub fn include(mut self, pattern: &str) -> ConfigResult<Self> {
        self.includes.push(compile(pattern)?);
        Ok(self)
    }

    /// Add an exclude pattern
    pub fn exclude(mut self, pattern: &str) -> ConfigResult<Self> {
        self.excludes.push(compile(pattern)?);
        Ok(self)
    }

    /// Choose which access modes the filter applies to
    #[must_use = "builder methods must be chained or built"]
    pub fn with_scope(mut self, scope: FilterScope) -> Self {
        self.scope = scope;
        self
    }

    /// Override the priority
    #[must_use = "builder methods must be chained or built"]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Check whether `key` is kept
    pub fn keeps(&self, key: &str) -> bool {
        let included = self.includes.is_empty() || self.includes.iter().any(|re| re.is_match(key));
        included && !self.excludes.iter().any(|re| re.is_match(key))
    }
}

impl PropertyFilter for RegexFilter {
    fn filter_property(
        &self,
        value: PropertyValue,
        ctx: &FilterContext<'_>,
    ) -> ConfigResult<Option<PropertyValue>> {
        if !self.scope.applies(ctx) || self.keeps(ctx.key) {
            return Ok(Some(value));
        }
        Ok(None)
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn type_name(&self) -> &str {
        "RegexFilter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("db.url", true)]
    #[case("db.password", false)]
    #[case("http.port", false)]
    fn include_then_exclude(#[case] key: &str, #[case] kept: bool) {
        let filter = RegexFilter::new()
            .include(r"^db\.")
            .and_then(|f| f.exclude("password$"))
            .unwrap();
        assert_eq!(filter.keeps(key), kept);
    }

    #[test]
    fn bulk_scope_ignores_single_access() {
        let filter = RegexFilter::new().exclude("^secret$").unwrap();
        let value = PropertyValue::new("secret", "s3cr3t", "s");
        let single = filter.filter_property(value.clone(), &FilterContext::single(&value));
        assert!(single.unwrap().is_some());

        let always = filter.with_scope(FilterScope::Always);
        let single = always.filter_property(value.clone(), &FilterContext::single(&value));
        assert!(single.unwrap().is_none());
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = RegexFilter::new().include("(").unwrap_err();
        assert!(err.to_string().contains("key pattern '('"));
    }
}
