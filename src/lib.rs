#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Pageflow — the action/event execution engine of a low-code page builder.
//!
//! Components on a live page declare events (`onClick`, `onChange`, `onSubmit`, `onLoad`),
//! each carrying an ordered list of actions. This crate evaluates `{{...}}` expressions
//! against the page context, keeps the shared component state, and interprets the actions:
//! - `config`: page-definition and action models, loader, and schema helpers.
//! - `expression`: template interpolation, path lookup and condition evaluation.
//! - `state`: the component state store and the refresh listener registry.
//! - `services`: side-effect collaborators (HTTP, navigation, toasts, modal bus).
//! - `executor`: action execution, sequencing, event dispatch and the page runtime.
//! - `sources`: trigger sources (file, stdin) feeding the CLI.
//!
//! Use `pageflow::prelude::*` to bring commonly used items into scope quickly.

/// Public module: configuration (models, loader, schema helpers).
pub mod config;
/// Public module: execution engine (actions, sequencing, dispatch, runtime).
pub mod executor;
/// Public module: expression and condition evaluation.
pub mod expression;
/// Public module: side-effect collaborators.
pub mod services;
/// Public module: trigger sources (file, stdin).
pub mod sources;
/// Public module: shared page state.
pub mod state;

/// Crate-level constants for consumers that want to inspect package metadata at runtime.
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version (e.g., "0.1.0").
#[inline]
pub const fn version() -> &'static str {
    PKG_VERSION
}

/// Parse a simple level name (trace|debug|info|warn|error).
pub fn parse_level(name: &str) -> Option<tracing::Level> {
    use tracing::Level;
    match name.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize tracing (logging) with a reasonable default.
/// - Honors the `RUST_LOG` environment variable if set (as a plain level).
/// - Falls back to `info` level.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_tracing() {
    let level = std::env::var("RUST_LOG").ok().as_deref().and_then(parse_level);
    init_tracing_with_level(level);
}

/// Initialize tracing at an explicit level (`info` when `None`).
pub fn init_tracing_with_level(level: Option<tracing::Level>) {
    // Ignore the error if the global subscriber was already set.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level.unwrap_or(tracing::Level::INFO))
        .try_init();
}

/// A convenient set of exports for most consumers.
///
/// Bring this into scope with:
/// `use pageflow::prelude::*;`
pub mod prelude {
    // Common result/error handling
    pub use anyhow::{Context, Error, Result, anyhow, bail, ensure};

    // Serialization
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};

    // Tracing macros
    pub use tracing::{debug, error, info, instrument, trace, warn};

    pub use crate as pageflow;

    // Frequently used types
    pub use crate::config::{Action, ActionKind, ComponentEvent, PageDefinition, TriggerKind};
    pub use crate::executor::{ActionExecutor, ActionResult, EventHandler, EventPayload, Runtime};
    pub use crate::expression::{ExpressionContext, evaluate, evaluate_condition};
    pub use crate::services::Services;
    pub use crate::state::{ComponentRuntimeState, ComponentStateStore, RefreshRegistry};

    // Frequently used internal modules
    pub use crate::{config, executor, expression, services, sources, state};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(parse_level("WARNING"), Some(tracing::Level::WARN));
        assert_eq!(parse_level(" debug "), Some(tracing::Level::DEBUG));
        assert_eq!(parse_level("loud"), None);
    }
}
