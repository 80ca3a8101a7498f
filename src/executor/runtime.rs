use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::actions::{ActionExecutor, ActionResult};
use super::dispatcher::{EventHandler, EventPayload};
use super::sequencer::SequenceResult;
use crate::config::{Action, ComponentEvent, PageDefinition, TriggerKind};
use crate::expression::{EventInfo, ExpressionContext};
use crate::services::{ModalBus, Services};
use crate::state::{ComponentRuntimeState, ComponentStateStore, RefreshRegistry, RefreshSubscription};

/// One trigger reported by the UI (or a trigger source).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub component: String,
    pub trigger: TriggerKind,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub target: Value,
}

/// Runtime is responsible for:
/// - seeding the component state store from the page definition
/// - binding every component's declared events to an `EventHandler`
/// - dispatching incoming trigger records to those handlers
pub struct Runtime {
    page: PageDefinition,
    executor: ActionExecutor,
    handlers: BTreeMap<String, EventHandler>,
}

impl Runtime {
    /// Create a runtime for `page`, using `services` for every side effect.
    pub fn new(page: PageDefinition, services: Services) -> Self {
        let store =
            ComponentStateStore::new(page.page.clone(), page.user.clone(), page.form.clone());
        let executor = ActionExecutor::new(store, RefreshRegistry::new(), services)
            .with_max_depth(page.settings.max_depth)
            .with_default_toast_ms(page.settings.default_toast_ms);

        let mut handlers = BTreeMap::new();
        for (id, component) in &page.components {
            executor.store().register(id, component.initial_state.clone());
            handlers.insert(
                id.clone(),
                executor.create_event_handler(id.as_str(), component.events.clone()),
            );
        }
        info!(
            target: "pageflow::runtime",
            components = handlers.len(),
            max_depth = page.settings.max_depth,
            "Runtime ready"
        );

        Self {
            page,
            executor,
            handlers,
        }
    }

    pub fn page(&self) -> &PageDefinition {
        &self.page
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    pub fn store(&self) -> &ComponentStateStore {
        self.executor.store()
    }

    pub fn modals(&self) -> &ModalBus {
        &self.executor.services().modals
    }

    pub fn register_component(&self, id: &str, initial: Option<ComponentRuntimeState>) {
        self.store().register(id, initial);
    }

    pub fn update_component_state(&self, id: &str, patch: ComponentRuntimeState) {
        self.store().update(id, patch);
    }

    pub fn get_component_state(&self, id: &str) -> Option<ComponentRuntimeState> {
        self.store().get(id)
    }

    pub fn register_refresh_listener<F>(&self, id: &str, callback: F) -> RefreshSubscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.executor.refresh().register(id, callback)
    }

    pub async fn trigger_event(
        &self,
        component_id: &str,
        event: &ComponentEvent,
        payload: EventPayload,
    ) -> Option<SequenceResult> {
        self.executor.trigger_event(component_id, event, payload).await
    }

    pub fn create_event_handler(
        &self,
        component_id: impl Into<String>,
        events: Vec<ComponentEvent>,
    ) -> EventHandler {
        self.executor.create_event_handler(component_id, events)
    }

    /// Handler bound to a component declared in the page.
    pub fn handler_for(&self, component_id: &str) -> Option<&EventHandler> {
        self.handlers.get(component_id)
    }

    /// Run a single action against the current page state.
    pub async fn execute_action(&self, action: &Action, event: EventInfo) -> ActionResult {
        let ctx = self.store().snapshot(event);
        self.executor.execute_action(action, &ctx).await
    }

    pub async fn execute_actions(&self, actions: &[Action], ctx: &ExpressionContext) -> SequenceResult {
        self.executor.execute_actions(actions, ctx).await
    }

    /// Fire `onLoad` for every declared component, in id order.
    pub async fn load(&self) -> Vec<(String, SequenceResult)> {
        let mut out = Vec::new();
        for (id, handler) in &self.handlers {
            if let Some(run) = handler.on_load().await {
                out.push((id.clone(), run));
            }
        }
        debug!(target: "pageflow::runtime", fired = out.len(), "onLoad dispatched");
        out
    }

    /// Handle a raw trigger record:
    /// - Expects `component` and `trigger` fields
    /// - Routes to the component's handler with the optional `value` and `target`
    pub async fn dispatch_value(&self, raw: &Value) -> Result<Option<SequenceResult>> {
        let record: TriggerRecord =
            serde_json::from_value(raw.clone()).context("Invalid trigger record")?;
        self.dispatch(record).await
    }

    pub async fn dispatch(&self, record: TriggerRecord) -> Result<Option<SequenceResult>> {
        let handler = self
            .handlers
            .get(&record.component)
            .ok_or_else(|| anyhow!("Unknown component '{}'", record.component))?;
        debug!(
            target: "pageflow::runtime",
            component = %record.component,
            trigger = record.trigger.as_str(),
            "Trigger received"
        );
        let payload = EventPayload {
            value: record.value,
            target: record.target,
        };
        Ok(handler.handle(record.trigger, payload).await)
    }
}
