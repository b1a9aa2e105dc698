//! Property source and provider contracts

use super::{ConfigResult, PropertyValue, ordinal};
use std::collections::HashMap;
use std::sync::Arc;

/// Raw key/value data produced by a source
pub type Properties = HashMap<String, String>;

/// Ordinal of plain in-memory, file and lookup sources
pub const DEFAULT_ORDINAL: i32 = 0;

/// Ordinal of the process environment
pub const ENV_ORDINAL: i32 = 300;

/// Ordinal of command-line arguments
pub const ARGS_ORDINAL: i32 = 400;

/// Ordinal intended for programmatic overrides
pub const OVERRIDE_ORDINAL: i32 = 1000;

/// A named, ordinal-tagged producer of configuration data
///
/// Implementations must be cheap to query repeatedly: the engine calls
/// [`properties`](Self::properties) on every snapshot build and
/// [`get`](Self::get) on every single-key access.
pub trait PropertySource: Send + Sync {
    /// Name of the source, unique within a context
    fn name(&self) -> &str;

    /// An ordinal set explicitly on the source, taking precedence over all others
    fn explicit_ordinal(&self) -> Option<i32> {
        None
    }

    /// Ordinal used when neither an explicit nor an `_ordinal` entry is present
    fn default_ordinal(&self) -> i32 {
        DEFAULT_ORDINAL
    }

    /// Effective ordinal, see [`ordinal::resolve`]
    fn ordinal(&self) -> i32 {
        ordinal::resolve(self)
    }

    /// Enumerate all properties
    ///
    /// Lookup-only sources return an empty map.
    fn properties(&self) -> ConfigResult<Properties>;

    /// Look up a single key
    ///
    /// `Ok(None)` means the key is absent; a value of
    /// [`PropertyValue::null`] means the key is present with an explicit null.
    fn get(&self, key: &str) -> ConfigResult<Option<PropertyValue>> {
        Ok(self
            .properties()?
            .remove(key)
            .map(|value| PropertyValue::new(key, value, self.name())))
    }

    /// Whether the source supports full enumeration
    ///
    /// Non-scannable sources only take part in single-key lookups.
    fn is_scannable(&self) -> bool {
        true
    }
}

/// Supplies a collection of property sources
///
/// Providers are reloaded on [`ConfigContext::reload`](crate::ConfigContext::reload)
/// and run on a worker thread with a bounded wait, so they may perform I/O.
pub trait PropertySourceProvider: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Produce the sources
    fn property_sources(&self) -> ConfigResult<Vec<Arc<dyn PropertySource>>>;
}

impl std::fmt::Debug for dyn PropertySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertySource")
            .field("name", &self.name())
            .field("scannable", &self.is_scannable())
            .finish()
    }
}

impl std::fmt::Debug for dyn PropertySourceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertySourceProvider")
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Properties);

    impl PropertySource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn properties(&self) -> ConfigResult<Properties> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn default_get_reads_through_properties() {
        let source = Fixed(Properties::from([("a".to_string(), "1".to_string())]));
        let value = source.get("a").unwrap().unwrap();
        assert_eq!(value.value(), Some("1"));
        assert_eq!(value.source(), "fixed");
        assert!(source.get("b").unwrap().is_none());
        assert!(source.is_scannable());
        assert_eq!(source.ordinal(), DEFAULT_ORDINAL);
    }
}
