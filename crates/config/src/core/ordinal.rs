//! Ordinal resolution for property sources
//!
//! Precedence, highest first:
//! 1. [`PropertySource::explicit_ordinal`]
//! 2. the reserved [`ORDINAL_KEY`] entry in the source's own data
//! 3. [`PropertySource::default_ordinal`]

use super::{ConfigResultExt, ORDINAL_KEY, PropertySource};

/// Determine the effective ordinal of a source
pub fn resolve<S: PropertySource + ?Sized>(source: &S) -> i32 {
    if let Some(explicit) = source.explicit_ordinal() {
        return explicit;
    }

    let entry = source
        .get(ORDINAL_KEY)
        .skip_logged("read_ordinal", source.name())
        .flatten();

    if let Some(raw) = entry.as_ref().and_then(|v| v.value()) {
        match raw.trim().parse::<i32>() {
            Ok(ordinal) => return ordinal,
            Err(e) => tracing::warn!(
                source = source.name(),
                value = raw,
                error = %e,
                "Ignoring unparsable {ORDINAL_KEY} entry"
            ),
        }
    }

    source.default_ordinal()
}
