//! Change detection for file-backed configuration

mod polling;

pub use polling::PollingWatcher;
