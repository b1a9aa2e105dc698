//! Integration tests for the filter pipeline

use pretty_assertions::assert_eq;
use strata_config::filters::DEFAULT_MASK;
use strata_config::prelude::*;

fn source() -> MapSource {
    MapSource::new("app")
        .with_property("secret", "s3cr3t")
        .with_property("other", "visible")
        .with_property("_internal", "meta")
        .with_property("db.password", "hunter2")
        .with_property("db.url", "postgres://db")
}

/// A vetoing filter makes the key absent without touching other keys
#[test]
fn test_filter_veto() {
    let ctx = ConfigContext::builder()
        .with_source(source())
        .with_filter(FnFilter::veto("hide-secret", |key| key == "secret"))
        .build()
        .unwrap();

    assert_eq!(ctx.get("secret"), None);
    assert!(ctx.get_value("secret").is_none());
    assert_eq!(ctx.get("other").as_deref(), Some("visible"));
    assert!(!ctx.properties().contains_key("secret"));
}

/// Metadata keys are hidden from snapshots only
#[test]
fn test_metadata_hiding_asymmetry() {
    let ctx = ConfigContext::builder().with_source(source()).build().unwrap();

    assert!(!ctx.properties().contains_key("_internal"));
    assert_eq!(ctx.get("_internal").as_deref(), Some("meta"));

    let unfiltered = ConfigContext::builder()
        .with_source(source())
        .without_metadata_filter()
        .build()
        .unwrap();
    assert_eq!(unfiltered.properties().get("_internal"), Some("meta"));
}

/// A filter that errors leaves the value unchanged
#[test]
fn test_failing_filter_passes_through() {
    let ctx = ConfigContext::builder()
        .with_source(source())
        .with_filter(FnFilter::new("broken", 10, |value, ctx| {
            Err(ConfigError::filter("broken", ctx.key, format!("cannot read {}", value.key())))
        }))
        .build()
        .unwrap();

    assert_eq!(ctx.get("other").as_deref(), Some("visible"));
    assert_eq!(ctx.properties().get("db.url"), Some("postgres://db"));
}

/// Filters run by priority and each sees the previous rewrite
#[test]
fn test_filters_chain_rewrites() {
    let ctx = ConfigContext::builder()
        .with_source(source())
        .with_filter(FnFilter::new("suffix", 1, |value, _ctx| {
            let next = format!("{}-suffix", value.value().unwrap_or_default());
            Ok(Some(value.with_value(next)))
        }))
        .with_filter(FnFilter::new("upper", 5, |value, _ctx| {
            let next = value.value().unwrap_or_default().to_uppercase();
            Ok(Some(value.with_value(next)))
        }))
        .build()
        .unwrap();

    assert_eq!(ctx.get("other").as_deref(), Some("VISIBLE-suffix"));
}

/// Sensitive keys are masked in both access modes
#[test]
fn test_masking_filter() {
    let ctx = ConfigContext::builder()
        .with_source(source())
        .with_filter(MaskingFilter::new(["password$", "^secret$"]).unwrap())
        .build()
        .unwrap();

    assert_eq!(ctx.get("db.password").as_deref(), Some(DEFAULT_MASK));
    let snapshot = ctx.properties();
    assert_eq!(snapshot.get("secret"), Some(DEFAULT_MASK));
    assert_eq!(snapshot.get("db.url"), Some("postgres://db"));
}

/// A bulk-scoped regex filter shapes snapshots but not direct access
#[test]
fn test_regex_filter_scopes() {
    let bulk_only = ConfigContext::builder()
        .with_source(source())
        .with_filter(RegexFilter::new().include(r"^db\.").unwrap())
        .build()
        .unwrap();

    let snapshot = bulk_only.properties();
    let keys: Vec<&str> = snapshot.keys().collect();
    assert_eq!(keys, vec!["db.password", "db.url"]);
    assert_eq!(bulk_only.get("other").as_deref(), Some("visible"));

    let everywhere = ConfigContext::builder()
        .with_source(source())
        .with_filter(
            RegexFilter::new()
                .exclude("password")
                .unwrap()
                .with_scope(FilterScope::Always),
        )
        .build()
        .unwrap();
    assert_eq!(everywhere.get("db.password"), None);
    assert!(!everywhere.properties().contains_key("db.password"));
}

/// Bulk filters can look at sibling keys of the merge
#[test]
fn test_bulk_filter_sees_prior_values() {
    let ctx = ConfigContext::builder()
        .with_source(
            MapSource::new("features")
                .with_property("cache.enabled", "false")
                .with_property("cache.size", "512")
                .with_property("log.enabled", "true")
                .with_property("log.level", "debug"),
        )
        .with_filter(FnFilter::new("disabled-sections", 0, |value, ctx| {
            let Some(merged) = ctx.prior_values else {
                return Ok(Some(value));
            };
            let section = ctx.key.split('.').next().unwrap_or_default();
            let enabled = merged
                .get(&format!("{section}.enabled"))
                .and_then(PropertyValue::value)
                .is_none_or(|flag| flag == "true");
            Ok(enabled.then_some(value))
        }))
        .build()
        .unwrap();

    let snapshot = ctx.properties();
    assert!(!snapshot.contains_key("cache.size"));
    assert!(!snapshot.contains_key("cache.enabled"));
    assert_eq!(snapshot.get("log.level"), Some("debug"));
    assert_eq!(ctx.get("cache.size").as_deref(), Some("512"));
}
