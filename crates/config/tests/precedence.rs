//! Integration tests for source aggregation and ordinal precedence

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::{Duration, Instant};
use strata_config::core::{META_ORDINAL, META_SOURCE, meta_key};
use strata_config::prelude::*;

fn map(name: &str, ordinal: i32, pairs: &[(&str, &str)]) -> MapSource {
    pairs
        .iter()
        .fold(MapSource::new(name).with_ordinal(ordinal), |source, (k, v)| {
            source.with_property(*k, *v)
        })
}

struct Unreachable;

impl PropertySource for Unreachable {
    fn name(&self) -> &str {
        "unreachable"
    }

    fn explicit_ordinal(&self) -> Option<i32> {
        Some(OVERRIDE_ORDINAL)
    }

    fn properties(&self) -> ConfigResult<Properties> {
        Err(ConfigError::source_load("unreachable", "connection refused"))
    }

    fn get(&self, _key: &str) -> ConfigResult<Option<PropertyValue>> {
        Err(ConfigError::source_load("unreachable", "connection refused"))
    }
}

struct Hanging;

impl PropertySourceProvider for Hanging {
    fn name(&self) -> &str {
        "hanging"
    }

    fn property_sources(&self) -> ConfigResult<Vec<Arc<dyn PropertySource>>> {
        std::thread::sleep(Duration::from_secs(3));
        Ok(vec![Arc::new(MapSource::new("late").with_property("k", "late"))])
    }
}

/// Higher ordinal wins on key collision
#[test]
fn test_higher_ordinal_wins() {
    let ctx = ConfigContext::builder()
        .with_source(map("a", 10, &[("k", "a")]))
        .with_source(map("b", 20, &[("k", "b")]))
        .build()
        .unwrap();

    assert_eq!(ctx.get("k").as_deref(), Some("b"));
    assert_eq!(ctx.properties().get("k"), Some("b"));
}

/// Equal ordinals are ordered by name, whatever the registration order
#[test]
fn test_tie_break_is_independent_of_load_order() {
    let forward = ConfigContext::builder()
        .with_source(map("alpha", 10, &[("k", "alpha")]))
        .with_source(map("beta", 10, &[("k", "beta")]))
        .build()
        .unwrap();
    let backward = ConfigContext::builder()
        .with_source(map("beta", 10, &[("k", "beta")]))
        .with_source(map("alpha", 10, &[("k", "alpha")]))
        .build()
        .unwrap();

    assert_eq!(forward.get("k"), backward.get("k"));
    assert_eq!(forward.properties().values(), backward.properties().values());
    assert_eq!(forward.sources(), backward.sources());
}

/// The `_ordinal` entry beats the type default, an explicit ordinal beats both
#[test]
fn test_ordinal_entry_and_explicit_ordinal() {
    let ctx = ConfigContext::builder()
        .with_source(
            MapSource::new("file")
                .with_property(ORDINAL_KEY, "500")
                .with_property("k", "file"),
        )
        .with_source(EnvSource::from_vars([("k", "env")]))
        .build()
        .unwrap();
    assert_eq!(ctx.get("k").as_deref(), Some("file"));

    let ctx = ConfigContext::builder()
        .with_source(
            MapSource::new("file")
                .with_property(ORDINAL_KEY, "500")
                .with_property("k", "file")
                .with_ordinal(1),
        )
        .with_source(EnvSource::from_vars([("k", "env")]))
        .build()
        .unwrap();
    assert_eq!(ctx.get("k").as_deref(), Some("env"));
}

/// Arguments beat the environment, which beats plain sources
#[test]
fn test_builtin_default_ordinals() {
    let ctx = ConfigContext::builder()
        .with_source(map(
            "defaults",
            DEFAULT_ORDINAL,
            &[("port", "80"), ("host", "localhost"), ("mode", "dev")],
        ))
        .with_source(EnvSource::from_vars([("port", "8080"), ("host", "0.0.0.0")]))
        .with_source(ArgsSource::parse(["--port=9090"]))
        .build()
        .unwrap();

    let snapshot = ctx.properties();
    assert_eq!(snapshot.get("port"), Some("9090"));
    assert_eq!(snapshot.get("host"), Some("0.0.0.0"));
    assert_eq!(snapshot.get("mode"), Some("dev"));
    assert_eq!(
        ctx.sources(),
        vec![
            ("defaults".to_string(), DEFAULT_ORDINAL),
            ("env".to_string(), ENV_ORDINAL),
            ("args".to_string(), ARGS_ORDINAL),
        ]
    );
}

/// A lookup-only source is visible to `get` but not to snapshots
#[test]
fn test_non_scannable_fallback() {
    let ctx = ConfigContext::builder()
        .with_source(LookupSource::new("vault", |key| {
            (key == "db.password").then(|| "from-vault".to_string())
        }))
        .with_source(map("local", 0, &[("db.url", "postgres://local")]))
        .build()
        .unwrap();

    let snapshot = ctx.properties();
    assert!(!snapshot.contains_key("db.password"));
    assert_eq!(snapshot.get("db.url"), Some("postgres://local"));
    assert_eq!(ctx.get("db.password").as_deref(), Some("from-vault"));
}

/// A source that fails to enumerate or look up is skipped
#[test]
fn test_failing_source_is_skipped() {
    let ctx = ConfigContext::builder()
        .with_source(Unreachable)
        .with_source(map("ok", 0, &[("k", "v")]))
        .build()
        .unwrap();

    assert_eq!(ctx.get("k").as_deref(), Some("v"));
    assert_eq!(ctx.properties().len(), 1);
}

/// Absent and present-but-null are distinguishable
#[test]
fn test_absent_is_distinct_from_null() {
    let ctx = ConfigContext::builder()
        .with_source(LookupSource::with_nulls("nulls", |key| {
            (key == "feature.flag").then_some(None)
        }))
        .with_source(map("m", -1, &[("empty", "")]))
        .build()
        .unwrap();

    let null = ctx.get_value("feature.flag").unwrap();
    assert!(null.is_null());
    assert_eq!(null.source(), "nulls");
    assert!(ctx.get_value("missing").is_none());
    assert_eq!(ctx.get("empty").as_deref(), Some(""));
    assert!(matches!(
        ctx.get_required("missing"),
        Err(ConfigError::MissingKey { key, .. }) if key == "missing"
    ));
}

/// A hanging provider is abandoned after the timeout
#[test]
fn test_provider_timeout_is_skipped() {
    let started = Instant::now();
    let ctx = ConfigContext::builder()
        .with_provider(Hanging)
        .with_source(map("fast", 0, &[("k", "fast")]))
        .with_provider_timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(ctx.get("k").as_deref(), Some("fast"));
}

/// Provenance is exported as snapshot metadata
#[test]
fn test_snapshot_metadata() {
    let ctx = ConfigContext::builder()
        .with_source(map("defaults", 7, &[("db.url", "x")]))
        .build()
        .unwrap();

    let snapshot = ctx.properties();
    let metadata = snapshot.metadata();
    assert_eq!(metadata[&meta_key("db.url", META_SOURCE)], "defaults");
    assert_eq!(metadata[&meta_key("db.url", META_ORDINAL)], "7");
    assert_eq!(snapshot.source_of("db.url"), Some("defaults"));
    assert!(metadata.contains_key("_db.url.timestamp"));

    let value = ctx.get_value("db.url").unwrap();
    assert_eq!(value.meta(META_SOURCE), Some("defaults"));
}

/// Snapshots are cached until something invalidates them
#[test]
fn test_snapshot_is_cached_until_refresh() {
    let shared = Arc::new(map("m", 0, &[("k", "1")]));
    let ctx = ConfigContext::builder()
        .with_shared_source(shared.clone())
        .build()
        .unwrap();

    let first = ctx.properties();
    assert!(Arc::ptr_eq(&first, &ctx.properties()));

    shared.set("k", "2");
    assert_eq!(ctx.properties().get("k"), Some("1"));

    ctx.refresh();
    let refreshed = ctx.properties();
    assert_eq!(refreshed.get("k"), Some("2"));
    assert!(refreshed.version() > first.version());
    assert_eq!(first.get("k"), Some("1"));
}
