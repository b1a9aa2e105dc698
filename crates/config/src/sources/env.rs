//! Process environment source

use crate::core::{ConfigResult, ENV_ORDINAL, Properties, PropertySource, PropertyValue};

/// Property source backed by environment variables
///
/// With a prefix, only variables starting with it are exposed and the prefix
/// is stripped. With normalization enabled, keys are lower-cased and `_` is
/// replaced with `.`, so `APP_DB_URL` with prefix `APP_` becomes `db.url`.
#[derive(Debug, Clone)]
pub struct EnvSource {
    name: String,
    prefix: Option<String>,
    normalize: bool,
    ordinal: Option<i32>,
    fixed: Option<Properties>,
}

impl EnvSource {
    /// Expose the whole process environment
    pub fn new() -> Self {
        Self {
            name: "env".to_string(),
            prefix: None,
            normalize: false,
            ordinal: None,
            fixed: None,
        }
    }

    /// Use a fixed set of variables instead of the live environment
    ///
    /// Mostly useful in tests, where mutating the process environment is
    /// not thread safe.
    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fixed: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            ..Self::new()
        }
    }

    /// Only expose variables starting with `prefix`, stripped of it
    #[must_use = "builder methods must be chained or built"]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Map `SOME_VAR` to `some.var`
    #[must_use = "builder methods must be chained or built"]
    pub fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }

    /// Rename the source
    #[must_use = "builder methods must be chained or built"]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set an explicit ordinal
    #[must_use = "builder methods must be chained or built"]
    pub fn with_ordinal(mut self, ordinal: i32) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    fn vars(&self) -> Vec<(String, String)> {
        match &self.fixed {
            Some(fixed) => fixed.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            None => std::env::vars().collect(),
        }
    }

    fn map_key(&self, var: &str) -> Option<String> {
        let stripped = match &self.prefix {
            Some(prefix) => var.strip_prefix(prefix.as_str())?,
            None => var,
        };
        if stripped.is_empty() {
            return None;
        }
        Some(if self.normalize {
            stripped.to_lowercase().replace('_', ".")
        } else {
            stripped.to_string()
        })
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertySource for EnvSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn explicit_ordinal(&self) -> Option<i32> {
        self.ordinal
    }

    fn default_ordinal(&self) -> i32 {
        ENV_ORDINAL
    }

    fn properties(&self) -> ConfigResult<Properties> {
        Ok(self
            .vars()
            .into_iter()
            .filter_map(|(var, value)| self.map_key(&var).map(|key| (key, value)))
            .collect())
    }

    fn get(&self, key: &str) -> ConfigResult<Option<PropertyValue>> {
        if self.prefix.is_none() && !self.normalize {
            let value = match &self.fixed {
                Some(fixed) => fixed.get(key).cloned(),
                None => std::env::var(key).ok(),
            };
            return Ok(value.map(|v| PropertyValue::new(key, v, self.name.as_str())));
        }

        Ok(self.properties()?.remove(key).map(|v| PropertyValue::new(key, v, self.name.as_str())))
    }
}
