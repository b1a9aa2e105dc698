//! Caller-supplied resolvers

use super::{ExpressionResolver, ResolverScope};
use crate::core::ConfigResult;
use std::collections::HashMap;

type ResolveFn = dyn Fn(&str) -> ConfigResult<Option<String>> + Send + Sync;

/// Resolver backed by a closure
///
/// Useful for ids such as `sys` that expose process-level values.
pub struct FnResolver {
    id: String,
    priority: i32,
    in_default_chain: bool,
    resolve: Box<ResolveFn>,
}

impl FnResolver {
    /// Create a resolver in the default chain with priority 0
    pub fn new<F>(id: impl Into<String>, resolve: F) -> Self
    where
        F: Fn(&str) -> ConfigResult<Option<String>> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            priority: 0,
            in_default_chain: true,
            resolve: Box::new(resolve),
        }
    }

    /// Set the default chain priority
    #[must_use = "builder methods must be chained or built"]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Only answer explicitly prefixed expressions
    #[must_use = "builder methods must be chained or built"]
    pub fn prefixed_only(mut self) -> Self {
        self.in_default_chain = false;
        self
    }
}

impl ExpressionResolver for FnResolver {
    fn resolver_id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn in_default_chain(&self) -> bool {
        self.in_default_chain
    }

    fn evaluate(&self, expression: &str, _scope: &ResolverScope<'_>) -> ConfigResult<Option<String>> {
        (self.resolve)(expression)
    }
}

impl std::fmt::Debug for FnResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnResolver")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Resolver answering from a fixed table
#[derive(Debug, Clone)]
pub struct MapResolver {
    id: String,
    priority: i32,
    values: HashMap<String, String>,
}

impl MapResolver {
    /// Create a resolver from expression/value pairs
    pub fn new<K, V>(id: impl Into<String>, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            id: id.into(),
            priority: 0,
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Set the default chain priority
    #[must_use = "builder methods must be chained or built"]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl ExpressionResolver for MapResolver {
    fn resolver_id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn evaluate(&self, expression: &str, _scope: &ResolverScope<'_>) -> ConfigResult<Option<String>> {
        Ok(self.values.get(expression).cloned())
    }
}
