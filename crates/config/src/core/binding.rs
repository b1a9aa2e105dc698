//! Typed binding of configuration values
//!
//! Two styles are supported: implement [`FromConfig`] and read fields with
//! [`ConfigContext::get_as`], or describe the fields in a [`BindingTable`]
//! and read the [`BoundValues`] it produces.

use super::{ConfigContext, ConfigError, ConfigResult};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// A type that can be built from a configuration context
pub trait FromConfig: Sized {
    /// Read the fields of `Self`
    fn from_config(config: &ConfigContext) -> ConfigResult<Self>;
}

/// Convert a raw value, reporting failures against `key`
pub fn convert<T>(key: &str, raw: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse::<T>().map_err(|e| {
        ConfigError::conversion(key, raw, std::any::type_name::<T>(), e.to_string())
    })
}

/// One field of a [`BindingTable`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    key: String,
    default: Option<String>,
    required: bool,
}

impl FieldSpec {
    /// A field that must be present
    pub fn required(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            default: None,
            required: true,
        }
    }

    /// A field that may be absent
    pub fn optional(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            default: None,
            required: false,
        }
    }

    /// A field that falls back to `default`
    pub fn with_default(key: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            default: Some(default.into()),
            required: false,
        }
    }

    /// The configuration key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the field must be present
    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// Declarative list of fields to read from a context
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    fields: Vec<FieldSpec>,
}

impl BindingTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field
    #[must_use = "builder methods must be chained or built"]
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Read every field
    ///
    /// Fails with [`ConfigError::MissingKey`] for the first required field
    /// that is absent.
    pub fn bind(&self, config: &ConfigContext) -> ConfigResult<BoundValues> {
        let mut values = BTreeMap::new();
        for spec in &self.fields {
            match config.get(&spec.key).or_else(|| spec.default.clone()) {
                Some(value) => {
                    values.insert(spec.key.clone(), value);
                }
                None if spec.required => return Err(ConfigError::missing_key(spec.key.as_str())),
                None => {}
            }
        }
        Ok(BoundValues { values })
    }
}

/// Values read through a [`BindingTable`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoundValues {
    values: BTreeMap<String, String>,
}

impl BoundValues {
    /// Raw value of a field
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Converted value of an optional field
    pub fn get_as<T>(&self, key: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get(key).map(|raw| convert(key, raw)).transpose()
    }

    /// Converted value of a field that must be present
    pub fn require<T>(&self, key: &str) -> ConfigResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.get(key).ok_or_else(|| ConfigError::missing_key(key))?;
        convert(key, raw)
    }

    /// Number of bound fields
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no field was bound
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
