//! `${env:NAME}` resolver

use super::{ExpressionResolver, ResolverScope};
use crate::core::ConfigResult;
use std::collections::HashMap;

/// Resolves expressions to environment variables
#[derive(Debug, Clone, Default)]
pub struct EnvResolver {
    fixed: Option<HashMap<String, String>>,
}

impl EnvResolver {
    /// Priority in the default chain, after `conf`
    pub const PRIORITY: i32 = 200;

    /// Read the live process environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer from a fixed set of variables instead of the environment
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
        }
    }
}

impl ExpressionResolver for EnvResolver {
    fn resolver_id(&self) -> &str {
        "env"
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn evaluate(&self, expression: &str, _scope: &ResolverScope<'_>) -> ConfigResult<Option<String>> {
        let name = expression.trim();
        Ok(match &self.fixed {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        })
    }
}
