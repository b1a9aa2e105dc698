//! Result type and utilities for configuration operations

use super::error::ConfigError;

/// Standard result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Extension trait for Result types to add configuration-specific utilities
pub trait ConfigResultExt<T> {
    /// Convert to option, logging the error as a skipped step
    ///
    /// `action` names what was being attempted (`"load_source"`, `"lookup"`)
    /// and `subject` what it was attempted on.
    fn skip_logged(self, action: &'static str, subject: &str) -> Option<T>;

    /// Convert to option with custom error handler
    fn handle_error<F>(self, f: F) -> Option<T>
    where
        F: FnOnce(&ConfigError);
}

impl<T> ConfigResultExt<T> for ConfigResult<T> {
    fn skip_logged(self, action: &'static str, subject: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    action,
                    subject,
                    category = ?e.category(),
                    error = %e,
                    "Skipping after configuration error"
                );
                None
            }
        }
    }

    fn handle_error<F>(self, f: F) -> Option<T>
    where
        F: FnOnce(&ConfigError),
    {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                f(&e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_logged_keeps_ok_and_drops_err() {
        let ok: ConfigResult<u8> = Ok(7);
        assert_eq!(ok.skip_logged("test", "ok"), Some(7));

        let err: ConfigResult<u8> = Err(ConfigError::source_load("s", "down"));
        assert_eq!(err.skip_logged("test", "s"), None);
    }

    #[test]
    fn handle_error_sees_the_error() {
        let mut seen = None;
        let err: ConfigResult<()> = Err(ConfigError::missing_key("k"));
        assert!(err.handle_error(|e| seen = e.key().map(str::to_owned)).is_none());
        assert_eq!(seen.as_deref(), Some("k"));
    }
}
