//! The configuration context
//!
//! A [`ConfigContext`] owns a published [`SourceSet`] and a cached
//! [`ConfigSnapshot`], both behind `arc-swap` so reads never lock. Reloads and
//! write-backs serialise on one writer mutex, swap in a new source set under
//! a fresh version, and notify listeners once the lock is released. Published
//! source sets are never changed afterwards: a write-back replaces the
//! writable source with an updated copy instead of editing it.

use super::{
    ChangeEvent, ConfigError, ConfigResult, ConfigSnapshot, PropertySource,
    PropertySourceProvider, PropertyValue, SourceSet, binding, meta_key,
};
use crate::filters::FilterPipeline;
use crate::providers::load_providers;
use crate::resolvers::{ExpressionEvaluator, ResolverScope};
use crate::sources::{MapChange, MapSource};
use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Handle returned by [`ConfigContext::on_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

pub(crate) struct ContextParts {
    pub(crate) static_sources: Vec<Arc<dyn PropertySource>>,
    pub(crate) providers: Vec<Arc<dyn PropertySourceProvider>>,
    pub(crate) filters: FilterPipeline,
    pub(crate) evaluator: ExpressionEvaluator,
    pub(crate) mask_unresolved: bool,
    pub(crate) provider_timeout: Duration,
    pub(crate) writable: Option<Arc<MapSource>>,
}

/// State only touched with the writer lock held
struct Writer {
    static_sources: Vec<Arc<dyn PropertySource>>,
    writable: Option<Arc<MapSource>>,
    /// Ticket of the reload whose sources are published
    published_reload: u64,
}

struct ContextInner {
    providers: Vec<Arc<dyn PropertySourceProvider>>,
    sources: ArcSwap<SourceSet>,
    snapshot: ArcSwapOption<ConfigSnapshot>,
    filters: FilterPipeline,
    evaluator: ExpressionEvaluator,
    mask_unresolved: bool,
    provider_timeout: Duration,
    writer: Mutex<Writer>,
    reload_tickets: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
    version: AtomicU64,
}

/// Aggregated, filtered and resolved configuration
///
/// Cloning is cheap and yields a handle to the same context. All read methods
/// are safe to call concurrently with [`reload`](Self::reload) and with
/// write-backs: a reader sees either the configuration before or after a
/// change, never a mix.
#[derive(Clone)]
pub struct ConfigContext {
    inner: Arc<ContextInner>,
}

/// Non-owning handle to a context
#[derive(Clone)]
pub struct WeakContext(Weak<ContextInner>);

impl WeakContext {
    /// Get the context back if it is still alive
    pub fn upgrade(&self) -> Option<ConfigContext> {
        self.0.upgrade().map(|inner| ConfigContext { inner })
    }
}

impl std::fmt::Debug for WeakContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakContext")
            .field("alive", &(self.0.strong_count() > 0))
            .finish()
    }
}

impl ConfigContext {
    /// Start building a context
    pub fn builder() -> super::ConfigContextBuilder {
        super::ConfigContextBuilder::new()
    }

    /// Load providers and publish the first source set
    pub(crate) fn load(parts: ContextParts) -> ConfigResult<Self> {
        let loaded = load_providers(&parts.providers, parts.provider_timeout);
        if !parts.providers.is_empty()
            && loaded.failed == parts.providers.len()
            && parts.static_sources.is_empty()
        {
            return Err(ConfigError::NoSources {
                attempted: parts.providers.len(),
            });
        }

        let sources = SourceSet::new(
            parts.static_sources.iter().cloned().chain(loaded.sources),
            1,
        );
        tracing::info!(
            action = "load",
            sources = sources.len(),
            providers = parts.providers.len(),
            failed_providers = loaded.failed,
            "Configuration loaded"
        );

        Ok(Self {
            inner: Arc::new(ContextInner {
                providers: parts.providers,
                sources: ArcSwap::from_pointee(sources),
                snapshot: ArcSwapOption::empty(),
                filters: parts.filters,
                evaluator: parts.evaluator,
                mask_unresolved: parts.mask_unresolved,
                provider_timeout: parts.provider_timeout,
                writer: Mutex::new(Writer {
                    static_sources: parts.static_sources,
                    writable: parts.writable,
                    published_reload: 0,
                }),
                reload_tickets: AtomicU64::new(0),
                listeners: RwLock::new(Vec::new()),
                next_listener: AtomicU64::new(0),
                version: AtomicU64::new(1),
            }),
        })
    }

    /// A non-owning handle, for background tasks that must not keep the
    /// context alive
    pub fn downgrade(&self) -> WeakContext {
        WeakContext(Arc::downgrade(&self.inner))
    }

    /// Version of the currently published source set
    pub fn version(&self) -> u64 {
        self.inner.sources.load().version()
    }

    /// Names and ordinals of the active sources, lowest precedence first
    pub fn sources(&self) -> Vec<(String, i32)> {
        self.inner
            .sources
            .load()
            .iter()
            .map(|entry| (entry.name().to_string(), entry.ordinal()))
            .collect()
    }

    /// Providers registered with the context
    pub fn providers(&self) -> &[Arc<dyn PropertySourceProvider>] {
        &self.inner.providers
    }

    /// Look up a key through the single-key filter path, without resolution
    fn lookup_filtered(&self, sources: &SourceSet, key: &str) -> Option<PropertyValue> {
        sources
            .lookup(key)
            .and_then(|value| self.inner.filters.apply_single(value))
    }

    /// Value of `key` with its provenance
    ///
    /// `None` means no source has the key or a filter vetoed it. A value whose
    /// [`value()`](PropertyValue::value) is `None` is present but null.
    pub fn get_value(&self, key: &str) -> Option<PropertyValue> {
        let sources = self.inner.sources.load_full();
        let value = self.lookup_filtered(&sources, key)?;
        if value.is_null() {
            return Some(value);
        }
        let raw = value.value().unwrap_or_default();

        let conf = |other: &str| {
            self.lookup_filtered(&sources, other)
                .and_then(PropertyValue::into_value)
        };
        let resolved =
            self.inner
                .evaluator
                .resolve_key(key, raw, self.inner.mask_unresolved, &ResolverScope::new(&conf));
        Some(value.with_value(resolved))
    }

    /// Resolved value of `key`
    ///
    /// Absent and null keys both yield `None`; use
    /// [`get_value`](Self::get_value) to tell them apart.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_value(key).and_then(PropertyValue::into_value)
    }

    /// Resolved value of `key`, or `default`
    pub fn get_or(&self, key: &str, default: impl Into<String>) -> String {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Resolved value of a key that must be present
    pub fn get_required(&self, key: &str) -> ConfigResult<String> {
        self.get(key).ok_or_else(|| ConfigError::missing_key(key))
    }

    /// Resolved value of `key` converted with [`FromStr`]
    pub fn get_as<T>(&self, key: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| binding::convert(key, &raw))
            .transpose()
    }

    /// Bind a typed configuration struct
    pub fn bind<T: binding::FromConfig>(&self) -> ConfigResult<T> {
        T::from_config(self)
    }

    /// Read every field of a binding table
    pub fn bind_table(&self, table: &binding::BindingTable) -> ConfigResult<binding::BoundValues> {
        table.bind(self)
    }

    /// The full snapshot
    ///
    /// Built on first access after a change and cached until the next one.
    /// Metadata keys are left out; single-key access still sees them.
    pub fn properties(&self) -> Arc<ConfigSnapshot> {
        let sources = self.inner.sources.load_full();
        if let Some(cached) = self.inner.snapshot.load_full() {
            if cached.version() == sources.version() {
                return cached;
            }
        }

        let built = Arc::new(self.build_snapshot(&sources));
        self.publish(&built);
        built
    }

    fn build_snapshot(&self, sources: &SourceSet) -> ConfigSnapshot {
        let merged = sources.merge();
        let filtered = self.inner.filters.apply_bulk(&merged);
        let conf = |key: &str| {
            self.lookup_filtered(sources, key)
                .and_then(PropertyValue::into_value)
        };
        let scope = ResolverScope::new(&conf);

        let mut values = BTreeMap::new();
        let mut metadata = BTreeMap::new();
        for (key, value) in &filtered {
            let Some(raw) = value.value() else {
                continue;
            };
            let resolved =
                self.inner
                    .evaluator
                    .resolve_key(key, raw, self.inner.mask_unresolved, &scope);
            values.insert(key.clone(), resolved);
            for (entry, meta) in value.meta_entries() {
                metadata.insert(meta_key(key, entry), meta.clone());
            }
        }

        tracing::debug!(
            action = "build_snapshot",
            version = sources.version(),
            keys = values.len(),
            hidden = merged.len().saturating_sub(filtered.len()),
            "Built configuration snapshot"
        );
        ConfigSnapshot::new(values, metadata, sources.version())
    }

    /// Store a snapshot unless a newer one is already cached
    fn publish(&self, built: &Arc<ConfigSnapshot>) {
        self.inner.snapshot.rcu(|cached| match cached {
            Some(current) if current.version() >= built.version() => Some(Arc::clone(current)),
            _ => Some(Arc::clone(built)),
        });
    }

    fn next_version(&self) -> u64 {
        self.inner.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Reload every provider and swap in the new source set
    ///
    /// Providers load outside the writer lock, each bounded by the provider
    /// timeout. Overlapping reloads publish in the order they started: a load
    /// that finishes after a later-started reload was published is discarded
    /// and its call returns an empty event. Listeners are notified when the
    /// resolved view changed.
    pub fn reload(&self) -> ConfigResult<ChangeEvent> {
        let ticket = self.inner.reload_tickets.fetch_add(1, Ordering::AcqRel) + 1;
        let providers = &self.inner.providers;
        let loaded = load_providers(providers, self.inner.provider_timeout);

        let event = {
            let mut writer = self.inner.writer.lock();
            if !providers.is_empty()
                && loaded.failed == providers.len()
                && writer.static_sources.is_empty()
            {
                return Err(ConfigError::NoSources {
                    attempted: providers.len(),
                });
            }
            if ticket < writer.published_reload {
                tracing::debug!(
                    action = "reload",
                    ticket,
                    published = writer.published_reload,
                    "Discarding reload superseded by a newer one"
                );
                let current = self.properties();
                return Ok(ChangeEvent::between(&current, &current));
            }
            writer.published_reload = ticket;

            let old = self.properties();
            let version = self.next_version();
            let sources = SourceSet::new(
                writer.static_sources.iter().cloned().chain(loaded.sources),
                version,
            );
            self.inner.sources.store(Arc::new(sources));
            self.inner.snapshot.store(None);
            ChangeEvent::between(&old, &self.properties())
        };

        tracing::info!(
            action = "reload",
            version = event.new_version,
            changes = event.changes.len(),
            failed_providers = loaded.failed,
            "Configuration reloaded"
        );
        self.notify(&event);
        Ok(event)
    }

    /// Drop the cached snapshot without reloading providers
    ///
    /// The next [`properties`](Self::properties) call re-reads every source.
    pub fn refresh(&self) {
        let _writer = self.inner.writer.lock();
        let version = self.next_version();
        let current = self.inner.sources.load_full();
        self.inner.sources.store(Arc::new(current.with_version(version)));
        self.inner.snapshot.store(None);
        tracing::debug!(action = "refresh", version, "Configuration snapshot invalidated");
    }

    /// Start a write-back transaction against the writable source
    pub fn mutable(&self) -> ConfigResult<super::MutableConfig> {
        if self.inner.writer.lock().writable.is_none() {
            return Err(ConfigError::not_writable("no writable source registered"));
        }
        Ok(super::MutableConfig::new(self.clone()))
    }

    /// Current contents of the writable source
    ///
    /// Each commit publishes a new copy, so the source handed to the builder
    /// keeps its initial data.
    pub fn writable_source(&self) -> Option<Arc<MapSource>> {
        self.inner.writer.lock().writable.clone()
    }

    pub(crate) fn commit(&self, changes: &[MapChange]) -> ConfigResult<ChangeEvent> {
        let (event, source) = {
            let mut writer = self.inner.writer.lock();
            let current = writer
                .writable
                .clone()
                .ok_or_else(|| ConfigError::not_writable("no writable source registered"))?;
            let old = self.properties();

            let updated = Arc::new(current.with_changes(changes));
            let replacement: Arc<dyn PropertySource> = updated.clone();
            for source in &mut writer.static_sources {
                if std::ptr::addr_eq(Arc::as_ptr(source), Arc::as_ptr(&current)) {
                    *source = Arc::clone(&replacement);
                }
            }
            writer.writable = Some(updated);

            let version = self.next_version();
            let published = self.inner.sources.load_full();
            self.inner
                .sources
                .store(Arc::new(published.replacing(&current, &replacement, version)));
            self.inner.snapshot.store(None);
            (
                ChangeEvent::between(&old, &self.properties()),
                current.name().to_string(),
            )
        };

        tracing::info!(
            action = "commit",
            source = %source,
            writes = changes.len(),
            version = event.new_version,
            "Committed configuration changes"
        );
        self.notify(&event);
        Ok(event)
    }

    /// Register a change listener
    ///
    /// Listeners run on the thread that performed the change, after the
    /// writer lock is released, and only when at least one key changed.
    pub fn on_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Unregister a listener; returns whether it was registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    fn notify(&self, event: &ChangeEvent) {
        if event.is_empty() {
            return;
        }
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }
}

impl std::fmt::Debug for ConfigContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigContext")
            .field("version", &self.version())
            .field("sources", &self.sources())
            .field("filters", &self.inner.filters)
            .field("evaluator", &self.inner.evaluator)
            .field("mask_unresolved", &self.inner.mask_unresolved)
            .finish_non_exhaustive()
    }
}
