//! Core configuration functionality

pub mod binding;
pub mod error;
pub mod global;
pub mod merge;
pub mod ordinal;
pub mod result;
pub mod snapshot;
pub mod source;
pub mod value;

mod builder;
mod context;
mod mutable;

// Re-export core types
pub use binding::{BindingTable, BoundValues, FieldSpec, FromConfig};
pub use builder::ConfigContextBuilder;
pub use context::{ConfigContext, ListenerId, WeakContext};
pub use error::{ConfigError, ErrorCategory};
pub use merge::{RegisteredSource, SourceSet, merge};
pub use mutable::MutableConfig;
pub use result::{ConfigResult, ConfigResultExt};
pub use snapshot::{ChangeEvent, ChangeKind, ConfigSnapshot, PropertyChange};
pub use source::{
    ARGS_ORDINAL, DEFAULT_ORDINAL, ENV_ORDINAL, OVERRIDE_ORDINAL, Properties, PropertySource,
    PropertySourceProvider,
};
pub use value::{
    META_ORDINAL, META_PREFIX, META_SOURCE, META_TIMESTAMP, ORDINAL_KEY, PropertyValue,
    SOURCE_SUFFIX, is_meta_key, meta_key,
};
