//! Polling file watcher

use crate::core::{ConfigContext, ConfigError, ConfigResult, WeakContext};
use crate::providers::FileProvider;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

type Fingerprint = BTreeMap<PathBuf, Option<(Option<SystemTime>, u64)>>;

/// Reloads a context when watched files change
///
/// Files are compared by modification time and size on every poll; a
/// watched directory also tracks the files directly inside it, so added and
/// removed files count as changes. The watcher holds only a weak handle to
/// the context and stops when the context is dropped or the watcher is.
#[derive(Debug)]
pub struct PollingWatcher {
    paths: Vec<PathBuf>,
    interval: Duration,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PollingWatcher {
    /// Start polling `paths` every `interval`
    pub fn start<I, P>(context: &ConfigContext, paths: I, interval: Duration) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Err(ConfigError::watch("no paths to watch"));
        }
        if interval.is_zero() {
            return Err(ConfigError::watch("poll interval must be greater than zero"));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            context: context.downgrade(),
            last: fingerprint(&paths),
            paths: paths.clone(),
            interval,
            stop: Arc::clone(&stop),
        };
        let handle = std::thread::Builder::new()
            .name("strata-watcher".to_string())
            .spawn(move || worker.run())
            .map_err(|e| ConfigError::watch(format!("failed to spawn watcher thread: {e}")))?;

        tracing::info!(
            action = "watch",
            paths = paths.len(),
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            "Started polling watcher"
        );
        Ok(Self {
            paths,
            interval,
            stop,
            handle: Some(handle),
        })
    }

    /// Watch the directory a [`FileProvider`] scans
    pub fn for_provider(
        context: &ConfigContext,
        provider: &FileProvider,
        interval: Duration,
    ) -> ConfigResult<Self> {
        Self::start(context, [provider.dir()], interval)
    }

    /// Watched paths
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Poll interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check if the polling thread is still running
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stop polling and wait for the thread to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                tracing::warn!(action = "watch", "Watcher thread panicked");
            }
        }
    }
}

impl Drop for PollingWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    context: WeakContext,
    last: Fingerprint,
    paths: Vec<PathBuf>,
    interval: Duration,
    stop: Arc<AtomicBool>,
}

impl Worker {
    fn run(mut self) {
        loop {
            std::thread::park_timeout(self.interval);
            if self.stop.load(Ordering::Acquire) {
                break;
            }
            let Some(context) = self.context.upgrade() else {
                tracing::debug!(action = "watch", "Context dropped, stopping watcher");
                break;
            };

            let current = fingerprint(&self.paths);
            if current == self.last {
                continue;
            }
            self.last = current;

            match context.reload() {
                Ok(event) => tracing::debug!(
                    action = "watch",
                    changes = event.changes.len(),
                    "Reloaded after file change"
                ),
                Err(e) => tracing::warn!(
                    action = "watch",
                    error = %e,
                    "Reload after file change failed"
                ),
            }
        }
    }
}

fn stat(path: &Path) -> Option<(Option<SystemTime>, u64)> {
    let meta = std::fs::metadata(path).ok()?;
    Some((meta.modified().ok(), meta.len()))
}

fn fingerprint(paths: &[PathBuf]) -> Fingerprint {
    let mut seen = Fingerprint::new();
    for path in paths {
        seen.insert(path.clone(), stat(path));
        if path.is_dir() {
            if let Ok(entries) = std::fs::read_dir(path) {
                for entry in entries.filter_map(Result::ok) {
                    let entry_path = entry.path();
                    let stats = stat(&entry_path);
                    seen.insert(entry_path, stats);
                }
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_sees_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![dir.path().to_path_buf()];
        let before = fingerprint(&paths);

        std::fs::write(dir.path().join("app.conf"), "k=v\n").unwrap();
        let after = fingerprint(&paths);
        assert_ne!(before, after);
        assert!(after.contains_key(&dir.path().join("app.conf")));
    }

    #[test]
    fn missing_paths_are_tracked_as_absent() {
        let paths = vec![PathBuf::from("/definitely/not/here.conf")];
        let print = fingerprint(&paths);
        assert_eq!(print.values().next(), Some(&None));
    }

    #[test]
    fn rejects_empty_path_list() {
        let ctx = ConfigContext::builder().build().unwrap();
        let err = PollingWatcher::start(&ctx, Vec::<PathBuf>::new(), Duration::from_millis(10))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Watch { .. }));
    }
}
