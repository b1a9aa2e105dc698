//! Placeholder expression resolution
//!
//! Values may embed `${resolverId:expression}` placeholders. The prefix picks
//! a registered resolver; without one, or when the prefix is not a registered
//! id, the whole text goes to the default chain, tried in descending priority
//! until a resolver answers. Resolver output is resolved again, with the
//! in-flight `resolver:expression` identities tracked to break cycles.

mod conf;
mod env;
mod evaluator;
mod file;
mod function;

pub use conf::ConfResolver;
pub use env::EnvResolver;
pub use evaluator::{
    ExpressionEvaluator, MAX_RESOLUTION_DEPTH, MAX_RESOLUTION_STEPS, Rendered, Segment, parse,
};
pub use file::FileResolver;
pub use function::{FnResolver, MapResolver};

use crate::core::ConfigResult;
use std::sync::Arc;

/// A named evaluator for placeholder expressions
pub trait ExpressionResolver: Send + Sync {
    /// Prefix selecting this resolver, `env` in `${env:HOME}`
    fn resolver_id(&self) -> &str;

    /// Position in the default chain, higher is tried first
    fn priority(&self) -> i32 {
        0
    }

    /// Whether unprefixed expressions are offered to this resolver
    fn in_default_chain(&self) -> bool {
        true
    }

    /// Evaluate an expression
    ///
    /// `Ok(None)` passes to the next resolver in the default chain. Errors
    /// are logged and treated the same way.
    fn evaluate(&self, expression: &str, scope: &ResolverScope<'_>)
    -> ConfigResult<Option<String>>;
}

impl std::fmt::Debug for dyn ExpressionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionResolver")
            .field("id", &self.resolver_id())
            .field("priority", &self.priority())
            .finish()
    }
}

/// Access to the configuration a resolver runs against
#[derive(Clone, Copy, Default)]
pub struct ResolverScope<'a> {
    config: Option<&'a (dyn Fn(&str) -> Option<String> + Sync)>,
}

impl<'a> ResolverScope<'a> {
    /// A scope with no configuration behind it
    pub fn empty() -> Self {
        Self::default()
    }

    /// A scope answering configuration lookups through `config`
    pub fn new(config: &'a (dyn Fn(&str) -> Option<String> + Sync)) -> Self {
        Self {
            config: Some(config),
        }
    }

    /// Raw, filtered value of another configuration key
    pub fn config_value(&self, key: &str) -> Option<String> {
        self.config.and_then(|lookup| lookup(key))
    }
}

impl std::fmt::Debug for ResolverScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverScope")
            .field("has_config", &self.config.is_some())
            .finish()
    }
}

/// The built-in resolvers: `conf`, `env` and `file`
pub fn default_resolvers() -> Vec<Arc<dyn ExpressionResolver>> {
    vec![
        Arc::new(ConfResolver),
        Arc::new(EnvResolver::new()),
        Arc::new(FileResolver),
    ]
}
