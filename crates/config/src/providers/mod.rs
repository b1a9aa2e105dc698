//! Property source providers and bounded provider loading

mod file;

pub use file::{FileProvider, FormatParser, KeyValueParser};
#[cfg(feature = "toml")]
pub use file::TomlParser;

use crate::core::{ConfigError, ConfigResult, PropertySource, PropertySourceProvider};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Default bound on a single provider load
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Provider returning a fixed list of sources
#[derive(Debug, Clone)]
pub struct StaticProvider {
    name: String,
    sources: Vec<Arc<dyn PropertySource>>,
}

impl StaticProvider {
    /// Create an empty provider
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
        }
    }

    /// Add a source
    #[must_use = "builder methods must be chained or built"]
    pub fn with_source(mut self, source: impl PropertySource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }
}

impl PropertySourceProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn property_sources(&self) -> ConfigResult<Vec<Arc<dyn PropertySource>>> {
        Ok(self.sources.clone())
    }
}

/// Result of loading a set of providers
#[derive(Debug, Default)]
pub struct ProviderLoad {
    /// Sources from every provider that answered in time
    pub sources: Vec<Arc<dyn PropertySource>>,
    /// Number of providers that failed or timed out
    pub failed: usize,
}

/// Load every provider on its own worker thread, waiting at most `timeout`
/// for each
///
/// A provider that fails or does not answer in time is logged and skipped;
/// its worker is left to finish in the background.
pub fn load_providers(providers: &[Arc<dyn PropertySourceProvider>], timeout: Duration) -> ProviderLoad {
    let started = Instant::now();
    let pending: Vec<_> = providers
        .iter()
        .map(|provider| (provider, spawn_load(provider)))
        .collect();

    let mut load = ProviderLoad::default();
    for (provider, receiver) in pending {
        let result = receiver.and_then(|rx| {
            let remaining = timeout.saturating_sub(started.elapsed());
            match rx.recv_timeout(remaining) {
                Ok(result) => result,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    Err(ConfigError::provider_timeout(provider.name(), timeout))
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => Err(ConfigError::source_load(
                    provider.name(),
                    "provider worker exited without a result",
                )),
            }
        });

        match result {
            Ok(sources) => {
                tracing::debug!(
                    action = "load_provider",
                    provider = provider.name(),
                    sources = sources.len(),
                    "Loaded property source provider"
                );
                load.sources.extend(sources);
            }
            Err(e) => {
                tracing::warn!(
                    action = "load_provider",
                    provider = provider.name(),
                    error = %e,
                    "Skipping property source provider"
                );
                load.failed += 1;
            }
        }
    }
    load
}

type LoadReceiver = mpsc::Receiver<ConfigResult<Vec<Arc<dyn PropertySource>>>>;

fn spawn_load(provider: &Arc<dyn PropertySourceProvider>) -> ConfigResult<LoadReceiver> {
    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(provider);
    std::thread::Builder::new()
        .name(format!("strata-provider-{}", provider.name()))
        .spawn(move || {
            // The receiver is gone after a timeout; nothing to report then
            let _ = tx.send(worker.property_sources());
        })
        .map_err(|e| ConfigError::source_load(provider.name(), e.to_string()))?;
    Ok(rx)
}
