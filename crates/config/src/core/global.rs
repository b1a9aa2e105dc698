//! Process-wide current configuration
//!
//! Prefer passing a [`ConfigContext`] explicitly. For code that cannot, one
//! context may be installed here at startup. [`replace`] swaps it wholesale:
//! callers that already hold a context keep using the old one, later calls to
//! [`current`] see the new one. There are no per-thread overrides.

use super::ConfigContext;
use arc_swap::ArcSwapOption;
use std::sync::{Arc, LazyLock};

static CURRENT: LazyLock<ArcSwapOption<ConfigContext>> = LazyLock::new(ArcSwapOption::empty);

/// Install `context` if none is installed yet
///
/// Returns `false` and leaves the installed context untouched otherwise.
pub fn install(context: ConfigContext) -> bool {
    let fresh = Arc::new(context);
    let previous = CURRENT.compare_and_swap(&None::<Arc<ConfigContext>>, Some(fresh));
    let installed = previous.is_none();
    if installed {
        tracing::info!(action = "install_global", "Installed process-wide configuration");
    }
    installed
}

/// The installed context, if any
pub fn current() -> Option<ConfigContext> {
    CURRENT.load_full().map(|context| (*context).clone())
}

/// Install `context`, returning the one it replaces
pub fn replace(context: ConfigContext) -> Option<ConfigContext> {
    let previous = CURRENT.swap(Some(Arc::new(context)));
    tracing::info!(
        action = "replace_global",
        had_previous = previous.is_some(),
        "Replaced process-wide configuration"
    );
    previous.map(|context| (*context).clone())
}

/// Remove the installed context
pub fn clear() -> Option<ConfigContext> {
    CURRENT.swap(None).map(|context| (*context).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MapSource;

    fn context(value: &str) -> ConfigContext {
        ConfigContext::builder()
            .with_source(MapSource::new("m").with_property("k", value))
            .build()
            .unwrap()
    }

    // Single test: the accessor is process-wide state shared by every test
    #[test]
    fn install_replace_clear() {
        clear();
        assert!(current().is_none());

        assert!(install(context("first")));
        assert!(!install(context("ignored")));
        assert_eq!(current().and_then(|c| c.get("k")).as_deref(), Some("first"));

        let held = current().unwrap();
        let previous = replace(context("second")).unwrap();
        assert_eq!(previous.get("k").as_deref(), Some("first"));
        assert_eq!(held.get("k").as_deref(), Some("first"));
        assert_eq!(current().and_then(|c| c.get("k")).as_deref(), Some("second"));

        assert!(clear().is_some());
        assert!(current().is_none());
    }
}
