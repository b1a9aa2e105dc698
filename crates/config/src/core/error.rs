//! Configuration error types

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration error type
///
/// Most variants are recovered from locally by the engine (a failing source is
/// skipped, a failing filter passes the value through, an unresolved
/// placeholder is masked). Only [`ErrorCategory::Configuration`] errors reach
/// callers of the read API.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A property source failed to load or enumerate its properties
    #[error("Failed to load property source '{source_name}': {message}")]
    SourceLoad {
        /// Name of the failing source or provider
        source_name: String,
        /// Error message
        message: String,
    },

    /// A provider did not produce its sources within the allotted time
    #[error("Property source provider '{provider}' timed out after {timeout:?}")]
    ProviderTimeout {
        /// Name of the provider
        provider: String,
        /// The bound that was exceeded
        timeout: Duration,
    },

    /// A property filter failed
    #[error("Filter '{filter}' failed on key '{key}': {message}")]
    Filter {
        /// Type name of the filter
        filter: String,
        /// Key being filtered
        key: String,
        /// Error message
        message: String,
    },

    /// An expression resolver failed or no resolver produced a value
    #[error("Failed to resolve expression '{expression}': {message}")]
    Resolution {
        /// The expression inside `${...}`
        expression: String,
        /// Error message
        message: String,
    },

    /// Re-entrant expression resolution
    #[error("Cyclic reference while resolving '{expression}' (chain: {})", .chain.join(" -> "))]
    Cycle {
        /// Expression that closed the cycle
        expression: String,
        /// In-flight expressions, outermost first
        chain: Vec<String>,
    },

    /// A required key could not be produced
    #[error("Required configuration key '{key}' is not available")]
    MissingKey {
        /// The requested key
        key: String,
        /// Underlying cause, if any
        #[source]
        cause: Option<Box<ConfigError>>,
    },

    /// A value could not be converted to the requested type
    #[error("Cannot convert '{key}' = '{value}' to {target}: {message}")]
    Conversion {
        /// Key being converted
        key: String,
        /// Raw value
        value: String,
        /// Target type name
        target: String,
        /// Error message from the parser
        message: String,
    },

    /// Every registered source failed to load
    #[error("No property source could be loaded ({attempted} attempted)")]
    NoSources {
        /// Number of sources and providers that were attempted
        attempted: usize,
    },

    /// Write-back requested but no writable source is registered
    #[error("Configuration is not writable: {message}")]
    NotWritable {
        /// Error message
        message: String,
    },

    /// I/O failure while reading a backing file
    #[error("I/O error on {path}: {message}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// A backing document could not be parsed
    #[error("Failed to parse {origin}: {message}")]
    Parse {
        /// Origin of the document (usually a file path)
        origin: String,
        /// Error message
        message: String,
    },

    /// A watcher could not be started
    #[error("Configuration watch error: {message}")]
    Watch {
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create a source load error
    pub fn source_load(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceLoad {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a provider timeout error
    pub fn provider_timeout(provider: impl Into<String>, timeout: Duration) -> Self {
        Self::ProviderTimeout {
            provider: provider.into(),
            timeout,
        }
    }

    /// Create a filter error
    pub fn filter(
        filter: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Filter {
            filter: filter.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a resolution error
    pub fn resolution(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Create a cycle error
    pub fn cycle(expression: impl Into<String>, chain: Vec<String>) -> Self {
        Self::Cycle {
            expression: expression.into(),
            chain,
        }
    }

    /// Create a missing key error
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingKey {
            key: key.into(),
            cause: None,
        }
    }

    /// Create a missing key error with an underlying cause
    pub fn missing_key_caused_by(key: impl Into<String>, cause: ConfigError) -> Self {
        Self::MissingKey {
            key: key.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Create a conversion error
    pub fn conversion(
        key: impl Into<String>,
        value: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            key: key.into(),
            value: value.into(),
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a not-writable error
    pub fn not_writable(message: impl Into<String>) -> Self {
        Self::NotWritable {
            message: message.into(),
        }
    }

    /// Create an I/O error for a path
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a parse error
    pub fn parse(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Create a watch error
    pub fn watch(message: impl Into<String>) -> Self {
        Self::Watch {
            message: message.into(),
        }
    }

    /// The key this error is about, if it concerns a single key
    pub fn key(&self) -> Option<&str> {
        match self {
            ConfigError::Filter { key, .. }
            | ConfigError::MissingKey { key, .. }
            | ConfigError::Conversion { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Check if the engine recovers from this error on its own
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.category(), ErrorCategory::Configuration)
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            ConfigError::SourceLoad { .. }
            | ConfigError::ProviderTimeout { .. }
            | ConfigError::Io { .. }
            | ConfigError::Parse { .. } => ErrorCategory::SourceLoad,
            ConfigError::Filter { .. } => ErrorCategory::Filter,
            ConfigError::Resolution { .. } => ErrorCategory::Resolution,
            ConfigError::Cycle { .. } => ErrorCategory::Cycle,
            ConfigError::MissingKey { .. }
            | ConfigError::Conversion { .. }
            | ConfigError::NoSources { .. }
            | ConfigError::NotWritable { .. } => ErrorCategory::Configuration,
            ConfigError::Watch { .. } => ErrorCategory::Watch,
        }
    }
}

/// Error category for grouping errors
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A source or provider failed; it is skipped
    SourceLoad,
    /// A filter failed; the value passes through
    Filter,
    /// An expression could not be resolved; it is masked
    Resolution,
    /// A self-referencing expression; it is masked
    Cycle,
    /// Terminal, surfaced to the caller
    Configuration,
    /// Watcher setup failure
    Watch,
}
