//! Configuration module for pageflow.
//!
//! This module wires together the page-definition models, the action model and the
//! loading/validation helpers used throughout the crate.
//!
//! Example:
//! use pageflow::config::{PageDefinition, load_from_path};
//!
//! let page = load_from_path("pages/orders.json")?;

pub mod actions;
pub mod loader;
pub mod models;

// Re-export the action model
pub use actions::{
    Action, ActionKind, ActionOptions, ComponentEvent, Condition, HttpMethod, Operator, ToastKind,
    TriggerKind, VisibilityChange,
};

// Re-export page models
pub use models::{
    ComponentDefinition, ComponentMap, EngineSettings, FormValues, PageDefinition, SourceConfig,
};

// Re-export loader utilities
pub use loader::{
    generate_schema, load_from_path, load_from_path_async, load_from_reader, load_from_str,
    validate_page, write_schema_to_writer,
};
