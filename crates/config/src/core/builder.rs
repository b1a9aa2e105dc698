//! Configuration context builder

use super::context::ContextParts;
use super::{ConfigContext, ConfigResult, PropertySource, PropertySourceProvider};
use crate::filters::{FilterPipeline, MetadataFilter, PropertyFilter};
use crate::providers::DEFAULT_PROVIDER_TIMEOUT;
use crate::resolvers::{ExpressionEvaluator, ExpressionResolver, default_resolvers};
use crate::sources::MapSource;
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`ConfigContext`]
///
/// Every source, provider, filter and resolver is registered explicitly.
/// Defaults: unresolved placeholders are masked, providers get five seconds,
/// and the [`MetadataFilter`] is installed.
pub struct ConfigContextBuilder {
    sources: Vec<Arc<dyn PropertySource>>,
    providers: Vec<Arc<dyn PropertySourceProvider>>,
    filters: Vec<Arc<dyn PropertyFilter>>,
    resolvers: Vec<Arc<dyn ExpressionResolver>>,
    metadata_filter: bool,
    mask_unresolved: bool,
    provider_timeout: Duration,
    writable: Option<Arc<MapSource>>,
}

impl ConfigContextBuilder {
    /// Create a builder with the default settings
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            providers: Vec::new(),
            filters: Vec::new(),
            resolvers: Vec::new(),
            metadata_filter: true,
            mask_unresolved: true,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            writable: None,
        }
    }

    /// Add a property source
    #[must_use = "builder methods must be chained or built"]
    pub fn with_source(mut self, source: impl PropertySource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Add a property source that is shared with other owners
    #[must_use = "builder methods must be chained or built"]
    pub fn with_shared_source(mut self, source: Arc<dyn PropertySource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Add a provider, loaded at build time and on every reload
    #[must_use = "builder methods must be chained or built"]
    pub fn with_provider(mut self, provider: impl PropertySourceProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Add a filter
    #[must_use = "builder methods must be chained or built"]
    pub fn with_filter(mut self, filter: impl PropertyFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Add an expression resolver
    ///
    /// A resolver replaces an earlier one with the same id.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_resolver(mut self, resolver: impl ExpressionResolver + 'static) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    /// Add the built-in `conf`, `env` and `file` resolvers
    ///
    /// They are registered ahead of any custom resolver, so a custom resolver
    /// with the same id wins regardless of call order.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_default_resolvers(mut self) -> Self {
        self.resolvers.splice(0..0, default_resolvers());
        self
    }

    /// Choose between `?{expression}` (`true`) and empty text (`false`) for
    /// placeholders that cannot be resolved
    #[must_use = "builder methods must be chained or built"]
    pub fn with_mask_unresolved(mut self, mask: bool) -> Self {
        self.mask_unresolved = mask;
        self
    }

    /// Bound on a single provider load
    #[must_use = "builder methods must be chained or built"]
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Register the source that write-backs are applied to
    ///
    /// The source also takes part in lookups like any other.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_writable_source(mut self, source: Arc<MapSource>) -> Self {
        self.sources.push(source.clone());
        self.writable = Some(source);
        self
    }

    /// Do not install the [`MetadataFilter`]
    #[must_use = "builder methods must be chained or built"]
    pub fn without_metadata_filter(mut self) -> Self {
        self.metadata_filter = false;
        self
    }

    /// Load providers and build the context
    ///
    /// Fails with [`NoSources`](super::ConfigError::NoSources) when providers
    /// were registered, every one of them failed, and no plain source is left.
    pub fn build(mut self) -> ConfigResult<ConfigContext> {
        if self.metadata_filter {
            self.filters.push(Arc::new(MetadataFilter));
        }
        let filters = FilterPipeline::new(self.filters);
        let evaluator = ExpressionEvaluator::new(self.resolvers);

        tracing::debug!(
            action = "build_context",
            sources = self.sources.len(),
            providers = self.providers.len(),
            filters = ?filters.names(),
            resolvers = ?evaluator.chain_ids(),
            "Building configuration context"
        );

        ConfigContext::load(ContextParts {
            static_sources: self.sources,
            providers: self.providers,
            filters,
            evaluator,
            mask_unresolved: self.mask_unresolved,
            provider_timeout: self.provider_timeout,
            writable: self.writable,
        })
    }
}

impl Default for ConfigContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigContextBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigContextBuilder")
            .field("sources", &self.sources)
            .field("providers", &self.providers)
            .field("filters", &self.filters.len())
            .field("resolvers", &self.resolvers)
            .field("metadata_filter", &self.metadata_filter)
            .field("mask_unresolved", &self.mask_unresolved)
            .field("provider_timeout", &self.provider_timeout)
            .finish()
    }
}
