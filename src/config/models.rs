use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_valid::Validate;
use std::collections::BTreeMap;

use super::actions::ComponentEvent;
use crate::executor::actions::DEFAULT_MAX_DEPTH;
use crate::state::{ComponentRuntimeState, PageInfo, UserInfo};

/// Root document describing one live page.
///
/// This structure is intended to be deserialized from a JSON file.
/// It captures everything the runtime needs for a page session:
/// - engine `settings` (base URL, locale, limits)
/// - route-derived `page` values and the `user` snapshot
/// - initial `form` values
/// - `components` with their initial state and declared events
/// - trigger `sources` used by the CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PageDefinition {
    #[serde(default)]
    #[validate]
    pub settings: EngineSettings,

    #[serde(default)]
    pub page: PageInfo,

    #[serde(default)]
    pub user: UserInfo,

    #[serde(default)]
    pub form: FormValues,

    #[serde(default)]
    pub components: ComponentMap,

    /// Trigger sources (stdin, file). The CLI falls back to stdin when empty.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// Form field name -> value.
pub type FormValues = Map<String, Value>;

/// Component id -> definition.
pub type ComponentMap = BTreeMap<String, ComponentDefinition>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<ComponentRuntimeState>,

    #[serde(default)]
    pub events: Vec<ComponentEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    /// Base URL for relative `callApi` paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Locale prefixed to in-app navigation paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// Locales recognised as an existing path prefix.
    #[serde(default)]
    pub locales: Vec<String>,

    /// Maximum nesting depth of onSuccess/onError branches.
    #[serde(default = "default_max_depth")]
    #[validate(minimum = 1)]
    #[validate(maximum = 1024)]
    pub max_depth: usize,

    /// Toast duration used when a `showToast` action omits one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(minimum = 1)]
    pub default_toast_ms: Option<u64>,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            locale: None,
            locales: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            default_toast_ms: None,
        }
    }
}

/// Trigger source configuration.
/// Use `type` to select a variant:
/// - "file": poll a file of newline-delimited trigger records
/// - "stdin": read newline-delimited trigger records from standard input
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    #[serde(rename_all = "camelCase")]
    File {
        /// Absolute or relative path to the file.
        path: String,
        /// Poll interval in milliseconds (default: 100).
        #[serde(default)]
        poll_ms: Option<u64>,
        /// Delete the file after its records were dispatched (default: false).
        #[serde(default)]
        delete_on_success: Option<bool>,
    },

    Stdin,
}
