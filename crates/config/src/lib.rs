//! # Strata Config
//!
//! Layered configuration resolution: key/value data from many sources is
//! merged by precedence, passed through a filter pipeline, and has its
//! `${resolver:expression}` placeholders resolved.
//!
//! ## Key Components
//!
//! - [`PropertySource`] / [`PropertySourceProvider`]: producers of key/value
//!   data, each with an ordinal; higher ordinals win, equal ordinals are
//!   ordered by source name
//! - [`filters`]: veto, rewrite or mask values, per key or per snapshot
//! - [`resolvers`]: placeholder resolution with nesting, escaping (`\${`)
//!   and cycle detection
//! - [`ConfigContext`]: lock-free reads, cached snapshots, reload, change
//!   listeners and write-back
//! - [`watchers::PollingWatcher`]: reload when files change
//!
//! ## Usage
//!
//! ```rust
//! use strata_config::prelude::*;
//!
//! let config = ConfigContext::builder()
//!     .with_source(
//!         MapSource::new("defaults")
//!             .with_property("app.name", "strata")
//!             .with_property("app.greeting", "Hello from ${app.name}"),
//!     )
//!     .with_source(
//!         MapSource::new("overrides")
//!             .with_ordinal(OVERRIDE_ORDINAL)
//!             .with_property("app.name", "prod"),
//!     )
//!     .with_default_resolvers()
//!     .build()?;
//!
//! assert_eq!(config.get("app.greeting").as_deref(), Some("Hello from prod"));
//! assert_eq!(config.properties().source_of("app.name"), Some("overrides"));
//! # Ok::<(), strata_config::ConfigError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod core;
pub mod filters;
pub mod providers;
pub mod resolvers;
pub mod sources;
pub mod watchers;

// Re-export the main types
pub use crate::core::{
    BindingTable, BoundValues, ChangeEvent, ChangeKind, ConfigContext, ConfigContextBuilder,
    ConfigError, ConfigResult, ConfigResultExt, ConfigSnapshot, ErrorCategory, FieldSpec,
    FromConfig, ListenerId, MutableConfig, PropertyChange, PropertySource,
    PropertySourceProvider, PropertyValue, global,
};
pub use crate::core::{
    ARGS_ORDINAL, DEFAULT_ORDINAL, ENV_ORDINAL, META_PREFIX, ORDINAL_KEY, OVERRIDE_ORDINAL,
    SOURCE_SUFFIX,
};

/// Commonly used types and traits
pub mod prelude {
    pub use crate::core::{
        ARGS_ORDINAL, BindingTable, ConfigContext, ConfigError, ConfigResult, ConfigSnapshot,
        DEFAULT_ORDINAL, ENV_ORDINAL, FieldSpec, FromConfig, ORDINAL_KEY, OVERRIDE_ORDINAL, Properties,
        PropertySource, PropertySourceProvider, PropertyValue,
    };
    pub use crate::filters::{
        FilterContext, FilterScope, FnFilter, MaskingFilter, PropertyFilter, RegexFilter,
    };
    pub use crate::providers::{FileProvider, FormatParser, KeyValueParser, StaticProvider};
    pub use crate::resolvers::{
        ExpressionResolver, FnResolver, MapResolver, ResolverScope,
    };
    pub use crate::sources::{ArgsSource, EnvSource, LookupSource, MapSource};
    pub use crate::watchers::PollingWatcher;

    #[cfg(feature = "toml")]
    pub use crate::providers::TomlParser;
}
