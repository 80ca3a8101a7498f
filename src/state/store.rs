use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{trace, warn};

use crate::expression::{EventInfo, ExpressionContext, truthy, value_to_string};

/// Route-derived values captured when the page session starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PageInfo {
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub query: Map<String, Value>,
}

/// Read-only identity snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Runtime state of one component. Also used as a patch: `None` fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRuntimeState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// Payload of the last fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_params: Option<Map<String, Value>>,
    /// Additional keys written by `setValue` with a `targetField`.
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

impl ComponentRuntimeState {
    /// Shallow merge: fields present in `patch` overwrite, absent fields are kept.
    pub fn merge(&mut self, patch: ComponentRuntimeState) {
        if patch.value.is_some() {
            self.value = patch.value;
        }
        if patch.loading.is_some() {
            self.loading = patch.loading;
        }
        if patch.visible.is_some() {
            self.visible = patch.visible;
        }
        if patch.data.is_some() {
            self.data = patch.data;
        }
        if patch.error.is_some() {
            self.error = patch.error;
        }
        if patch.filter_params.is_some() {
            self.filter_params = patch.filter_params;
        }
        self.extra.extend(patch.extra);
    }

    /// Write `value` under `key`. Built-in keys land on their typed field
    /// (`null` clears it); any other key goes to `extra`.
    pub fn set_field(&mut self, key: &str, value: Value) {
        match key {
            "value" => self.value = Some(value),
            "data" => self.data = Some(value),
            "loading" => self.loading = (!value.is_null()).then(|| truthy(&value)),
            "visible" => self.visible = (!value.is_null()).then(|| truthy(&value)),
            "error" => {
                self.error = match value {
                    Value::Null => None,
                    Value::String(s) => Some(s),
                    other => Some(value_to_string(&other)),
                }
            }
            "filterParams" => match value {
                Value::Object(map) => self.filter_params = Some(map),
                Value::Null => self.filter_params = None,
                other => {
                    warn!(target: "pageflow::store", value = %other, "filterParams must be an object; ignored");
                }
            },
            _ => {
                self.extra.insert(key.to_string(), value);
            }
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.unwrap_or(true)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.unwrap_or(false)
    }

    pub fn with_value(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn with_loading(loading: bool) -> Self {
        Self {
            loading: Some(loading),
            ..Default::default()
        }
    }

    pub fn with_visible(visible: bool) -> Self {
        Self {
            visible: Some(visible),
            ..Default::default()
        }
    }
}

/// Everything the runtime knows about one live page view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRuntimeState {
    pub components: HashMap<String, ComponentRuntimeState>,
    pub form: Map<String, Value>,
    pub page: PageInfo,
    pub user: UserInfo,
}

/// Owner of the page's runtime state.
///
/// Cloning yields another handle to the same state. Every mutation goes through
/// a short critical section; no lock is held across an `.await`, so each write is
/// visible to the next read immediately.
#[derive(Debug, Clone, Default)]
pub struct ComponentStateStore {
    inner: Arc<Mutex<PageRuntimeState>>,
}

impl ComponentStateStore {
    pub fn new(page: PageInfo, user: UserInfo, form: Map<String, Value>) -> Self {
        Self::from_state(PageRuntimeState {
            components: HashMap::new(),
            form,
            page,
            user,
        })
    }

    pub fn from_state(state: PageRuntimeState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, PageRuntimeState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a component. Seeds `visible: true, loading: false` under `initial`.
    /// Registering an id that already exists leaves its state untouched.
    pub fn register(&self, id: &str, initial: Option<ComponentRuntimeState>) {
        let mut state = self.state();
        if state.components.contains_key(id) {
            trace!(target: "pageflow::store", %id, "Component already registered");
            return;
        }
        let mut seeded = ComponentRuntimeState {
            visible: Some(true),
            loading: Some(false),
            ..Default::default()
        };
        if let Some(initial) = initial {
            seeded.merge(initial);
        }
        trace!(target: "pageflow::store", %id, "Component registered");
        state.components.insert(id.to_string(), seeded);
    }

    /// Shallow-merge `patch` into the component's state, creating it if absent.
    pub fn update(&self, id: &str, patch: ComponentRuntimeState) {
        let mut state = self.state();
        trace!(target: "pageflow::store", %id, ?patch, "Component state update");
        state
            .components
            .entry(id.to_string())
            .or_default()
            .merge(patch);
    }

    /// Read-modify-write a component's state in one critical section, creating it if absent.
    pub fn update_with<R>(&self, id: &str, f: impl FnOnce(&mut ComponentRuntimeState) -> R) -> R {
        let mut state = self.state();
        let entry = state.components.entry(id.to_string()).or_default();
        let out = f(entry);
        trace!(target: "pageflow::store", %id, state = ?entry, "Component state rewritten");
        out
    }

    pub fn get(&self, id: &str) -> Option<ComponentRuntimeState> {
        self.state().components.get(id).cloned()
    }

    /// Drop a component's state (on unmount).
    pub fn remove(&self, id: &str) -> Option<ComponentRuntimeState> {
        self.state().components.remove(id)
    }

    pub fn set_form_field(&self, name: &str, value: Value) {
        self.state().form.insert(name.to_string(), value);
    }

    /// Merge a submitted record into the form values.
    pub fn merge_form(&self, record: Map<String, Value>) {
        self.state().form.extend(record);
    }

    pub fn form(&self) -> Map<String, Value> {
        self.state().form.clone()
    }

    /// Copy of the whole page state.
    pub fn snapshot_state(&self) -> PageRuntimeState {
        self.state().clone()
    }

    /// Build a fresh expression context from current page/component/form/user state.
    pub fn snapshot(&self, event: EventInfo) -> ExpressionContext {
        let state = self.state();
        let components = state
            .components
            .iter()
            .map(|(id, c)| (id.clone(), c.value.clone().unwrap_or(Value::Null)))
            .collect();
        ExpressionContext {
            event,
            form: state.form.clone(),
            page: state.page.clone(),
            user: state.user.clone(),
            components,
            response: None,
        }
    }
}
