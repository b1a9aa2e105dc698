//! `${conf:key}` resolver

use super::{ExpressionResolver, ResolverScope};
use crate::core::ConfigResult;

/// Resolves expressions to other configuration keys
///
/// Lookups go through the single-key filter path, so vetoed keys stay
/// unresolved and masked keys resolve to their mask.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfResolver;

impl ConfResolver {
    /// Priority in the default chain; configuration keys shadow the environment
    pub const PRIORITY: i32 = 300;
}

impl ExpressionResolver for ConfResolver {
    fn resolver_id(&self) -> &str {
        "conf"
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn evaluate(&self, expression: &str, scope: &ResolverScope<'_>) -> ConfigResult<Option<String>> {
        Ok(scope.config_value(expression.trim()))
    }
}
