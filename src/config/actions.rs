use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::expression::Template;

/// A declarative, side-effecting step in an event's script.
///
/// The JSON shape is a single object tagged by `"type"`; the shared options
/// (`condition`, `delay`, `async`, `onSuccess`, `onError`) sit next to the
/// variant-specific fields:
///
/// ```json
/// { "type": "callApi", "apiPath": "/orders/{{event.value}}", "onError": [ ... ] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Action {
    #[serde(flatten)]
    pub kind: ActionKind,

    #[serde(flatten)]
    pub options: ActionOptions,
}

impl Action {
    /// Build an action with default options.
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            options: ActionOptions::default(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.options.condition = Some(condition);
        self
    }

    pub fn with_delay(mut self, ms: u64) -> Self {
        self.options.delay = Some(ms);
        self
    }

    pub fn detached(mut self) -> Self {
        self.options.run_async = true;
        self
    }

    pub fn on_success(mut self, actions: Vec<Action>) -> Self {
        self.options.on_success = Some(actions);
        self
    }

    pub fn on_error(mut self, actions: Vec<Action>) -> Self {
        self.options.on_error = Some(actions);
        self
    }

    /// Whether a non-empty `onError` branch was declared.
    pub fn has_error_handler(&self) -> bool {
        self.options
            .on_error
            .as_ref()
            .is_some_and(|actions| !actions.is_empty())
    }
}

/// Options shared by every action kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionOptions {
    /// Guard; when it evaluates false the action is skipped as a success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,

    /// Delay in milliseconds before the action runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,

    /// Fire-and-forget: the sequence does not wait for this action.
    #[serde(rename = "async", default)]
    pub run_async: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<Vec<Action>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_error: Option<Vec<Action>>,
}

/// One case per action kind, each carrying only the fields it needs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActionKind {
    /// Issue an HTTP request through the HTTP collaborator.
    #[serde(rename_all = "camelCase")]
    CallApi {
        api_path: Template,
        #[serde(default)]
        api_method: HttpMethod,
        /// String leaves are evaluated as templates.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_body: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_headers: Option<Map<String, Value>>,
    },

    /// Write a value into another component's state.
    #[serde(rename_all = "camelCase")]
    SetValue {
        target_component: String,
        #[serde(default)]
        value: Value,
        /// Additional key the value is stored under (state and form).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_field: Option<String>,
    },

    /// Merge a filter parameter into a component and ask it to reload.
    #[serde(rename_all = "camelCase")]
    FilterData {
        target_component: String,
        filter_field: String,
        #[serde(default)]
        filter_value: Value,
    },

    #[serde(rename_all = "camelCase")]
    Navigate {
        url: Template,
        #[serde(default)]
        open_in_new_tab: bool,
    },

    #[serde(rename_all = "camelCase")]
    ShowToast {
        message: Template,
        #[serde(default)]
        toast_type: ToastKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<Template>,
        /// Display duration in milliseconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
    },

    #[serde(rename_all = "camelCase")]
    ShowModal {
        modal_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<Template>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<Template>,
    },

    #[serde(rename_all = "camelCase")]
    CloseModal {
        modal_id: String,
    },

    /// Force a component to reload through its refresh listener.
    #[serde(rename_all = "camelCase")]
    Refresh {
        target_component: String,
    },

    #[serde(rename_all = "camelCase")]
    SetVisibility {
        target_component: String,
        #[serde(default)]
        visibility: VisibilityChange,
    },

    #[serde(rename_all = "camelCase")]
    SetLoading {
        target_component: String,
        #[serde(default = "default_loading")]
        loading: bool,
    },

    /// Reserved for reusable named action groups. Currently a no-op.
    #[serde(rename_all = "camelCase")]
    RunActions {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action_group: Option<String>,
    },

    /// Any `type` this runtime does not know.
    #[serde(other)]
    Unknown,
}

fn default_loading() -> bool {
    true
}

impl ActionKind {
    /// The `type` tag as it appears in JSON.
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::CallApi { .. } => "callApi",
            ActionKind::SetValue { .. } => "setValue",
            ActionKind::FilterData { .. } => "filterData",
            ActionKind::Navigate { .. } => "navigate",
            ActionKind::ShowToast { .. } => "showToast",
            ActionKind::ShowModal { .. } => "showModal",
            ActionKind::CloseModal { .. } => "closeModal",
            ActionKind::Refresh { .. } => "refresh",
            ActionKind::SetVisibility { .. } => "setVisibility",
            ActionKind::SetLoading { .. } => "setLoading",
            ActionKind::RunActions { .. } => "runActions",
            ActionKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "put")]
    Put,
    #[serde(alias = "patch")]
    Patch,
    #[serde(alias = "delete")]
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    #[default]
    Info,
}

#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityChange {
    Show,
    Hide,
    #[default]
    Toggle,
}

impl VisibilityChange {
    /// New visibility given the current one.
    pub fn apply(self, current: bool) -> bool {
        match self {
            VisibilityChange::Show => true,
            VisibilityChange::Hide => false,
            VisibilityChange::Toggle => !current,
        }
    }
}

/// Structured boolean predicate: `field <operator> value`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Condition {
    /// Context path (`form.status`) or a template (`{{form.status}}`).
    pub field: String,
    pub operator: Operator,
    /// Comparison value; string leaves are evaluated as templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: Option<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    IsEmpty,
    IsNotEmpty,
    IsTrue,
    IsFalse,
    /// Unrecognised operator; always evaluates to false.
    #[serde(other)]
    Unknown,
}

/// The interaction that fires a component event.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TriggerKind {
    OnClick,
    OnChange,
    OnSubmit,
    OnLoad,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::OnClick => "onClick",
            TriggerKind::OnChange => "onChange",
            TriggerKind::OnSubmit => "onSubmit",
            TriggerKind::OnLoad => "onLoad",
        }
    }
}

/// A trigger-kind-to-action-list binding declared on a component.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ComponentEvent {
    #[serde(rename = "type")]
    pub trigger: TriggerKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

fn default_enabled() -> bool {
    true
}

impl ComponentEvent {
    pub fn new(trigger: TriggerKind, actions: Vec<Action>) -> Self {
        Self {
            trigger,
            enabled: true,
            condition: None,
            actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_call_api_with_shared_options() {
        let action: Action = serde_json::from_value(json!({
            "type": "callApi",
            "apiPath": "/orders/{{event.value}}",
            "apiMethod": "POST",
            "async": true,
            "delay": 50,
            "onError": [{ "type": "showToast", "message": "Falhou", "toastType": "error" }]
        }))
        .unwrap();

        match &action.kind {
            ActionKind::CallApi {
                api_path,
                api_method,
                ..
            } => {
                assert_eq!(api_path.source(), "/orders/{{event.value}}");
                assert_eq!(*api_method, HttpMethod::Post);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert!(action.options.run_async);
        assert_eq!(action.options.delay, Some(50));
        assert!(action.has_error_handler());
    }

    #[test]
    fn unknown_type_and_operator_fall_back() {
        let action: Action = serde_json::from_value(json!({ "type": "launchRocket" })).unwrap();
        assert!(matches!(action.kind, ActionKind::Unknown));

        let cond: Condition =
            serde_json::from_value(json!({ "field": "form.a", "operator": "matchesRegex" }))
                .unwrap();
        assert_eq!(cond.operator, Operator::Unknown);
    }

    #[test]
    fn set_loading_defaults_to_true() {
        let action: Action =
            serde_json::from_value(json!({ "type": "setLoading", "targetComponent": "t" }))
                .unwrap();
        assert!(matches!(
            action.kind,
            ActionKind::SetLoading { loading: true, .. }
        ));
    }

    #[test]
    fn component_event_is_enabled_by_default() {
        let event: ComponentEvent =
            serde_json::from_value(json!({ "type": "onClick", "actions": [] })).unwrap();
        assert!(event.enabled);
        assert_eq!(event.trigger, TriggerKind::OnClick);
    }

    #[test]
    fn empty_on_error_is_not_a_handler() {
        let action = Action::new(ActionKind::Refresh {
            target_component: "x".into(),
        })
        .on_error(vec![]);
        assert!(!action.has_error_handler());
    }

    #[test]
    fn visibility_change_applies() {
        assert!(VisibilityChange::Show.apply(false));
        assert!(!VisibilityChange::Hide.apply(true));
        assert!(VisibilityChange::Toggle.apply(false));
    }
}
