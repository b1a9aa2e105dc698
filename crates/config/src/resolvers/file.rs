//! `${file:path}` resolver

use super::{ExpressionResolver, ResolverScope};
use crate::core::{ConfigError, ConfigResult};
use std::path::Path;

/// Resolves expressions to the trimmed contents of a file
///
/// Only explicitly prefixed expressions reach it; a missing file is a miss,
/// any other I/O error is reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileResolver;

impl ExpressionResolver for FileResolver {
    fn resolver_id(&self) -> &str {
        "file"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn in_default_chain(&self) -> bool {
        false
    }

    fn evaluate(&self, expression: &str, _scope: &ResolverScope<'_>) -> ConfigResult<Option<String>> {
        let path = Path::new(expression.trim());
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::io(path, &e)),
        }
    }
}
