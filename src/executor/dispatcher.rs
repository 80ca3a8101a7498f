use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::actions::ActionExecutor;
use super::sequencer::SequenceResult;
use crate::config::{ComponentEvent, TriggerKind};
use crate::expression::{EventInfo, evaluate_condition};
use crate::state::ComponentRuntimeState;

/// What the UI reports alongside a trigger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub target: Value,
}

impl EventPayload {
    pub fn value(value: Value) -> Self {
        Self {
            value,
            target: Value::Null,
        }
    }
}

impl ActionExecutor {
    /// Run a declared event for a component.
    ///
    /// Returns `None` when the event is disabled or its condition does not hold.
    /// The context is rebuilt from the live store on every call.
    pub async fn trigger_event(
        &self,
        component_id: &str,
        event: &ComponentEvent,
        payload: EventPayload,
    ) -> Option<SequenceResult> {
        let trigger = event.trigger.as_str();
        if !event.enabled {
            debug!(target: "pageflow::dispatcher", %component_id, trigger, "Event disabled");
            return None;
        }

        let ctx = self.store().snapshot(EventInfo {
            kind: Some(event.trigger),
            value: payload.value,
            target: payload.target,
        });
        if let Some(condition) = &event.condition {
            if !evaluate_condition(condition, &ctx) {
                debug!(target: "pageflow::dispatcher", %component_id, trigger, "Event condition false");
                return None;
            }
        }

        info!(
            target: "pageflow::dispatcher",
            %component_id, trigger,
            actions = event.actions.len(),
            "Dispatching event"
        );
        Some(self.execute_actions(&event.actions, &ctx).await)
    }

    /// Bind a component's declared events to per-trigger handlers.
    pub fn create_event_handler(
        &self,
        component_id: impl Into<String>,
        events: Vec<ComponentEvent>,
    ) -> EventHandler {
        EventHandler {
            component_id: component_id.into(),
            events: events.into(),
            executor: self.clone(),
        }
    }
}

/// Per-trigger entry points a rendering component attaches to its interactive elements.
#[derive(Debug, Clone)]
pub struct EventHandler {
    component_id: String,
    events: Arc<[ComponentEvent]>,
    executor: ActionExecutor,
}

impl EventHandler {
    pub fn component_id(&self) -> &str {
        &self.component_id
    }

    pub fn events(&self) -> &[ComponentEvent] {
        &self.events
    }

    pub async fn on_click(&self, payload: EventPayload) -> Option<SequenceResult> {
        self.fire(TriggerKind::OnClick, payload).await
    }

    /// Stores the raw value first, whether or not an `onChange` event is declared.
    pub async fn on_change(&self, payload: EventPayload) -> Option<SequenceResult> {
        self.executor.store().update(
            &self.component_id,
            ComponentRuntimeState::with_value(payload.value.clone()),
        );
        self.fire(TriggerKind::OnChange, payload).await
    }

    /// Merges the submitted record into the page form before dispatching.
    pub async fn on_submit(&self, record: Map<String, Value>) -> Option<SequenceResult> {
        self.executor.store().merge_form(record.clone());
        self.fire(TriggerKind::OnSubmit, EventPayload::value(Value::Object(record)))
            .await
    }

    pub async fn on_load(&self) -> Option<SequenceResult> {
        self.fire(TriggerKind::OnLoad, EventPayload::default()).await
    }

    /// Route any trigger kind to its handler.
    pub async fn handle(&self, trigger: TriggerKind, payload: EventPayload) -> Option<SequenceResult> {
        match trigger {
            TriggerKind::OnClick => self.on_click(payload).await,
            TriggerKind::OnChange => self.on_change(payload).await,
            TriggerKind::OnSubmit => {
                let record = match payload.value {
                    Value::Object(map) => map,
                    Value::Null => Map::new(),
                    other => {
                        debug!(
                            target: "pageflow::dispatcher",
                            component_id = %self.component_id,
                            value = %other,
                            "Submitted value is not an object; ignoring it"
                        );
                        Map::new()
                    }
                };
                self.on_submit(record).await
            }
            TriggerKind::OnLoad => self.on_load().await,
        }
    }

    async fn fire(&self, trigger: TriggerKind, payload: EventPayload) -> Option<SequenceResult> {
        let Some(event) = self.events.iter().find(|e| e.trigger == trigger) else {
            debug!(
                target: "pageflow::dispatcher",
                component_id = %self.component_id,
                trigger = trigger.as_str(),
                "No event declared for trigger"
            );
            return None;
        };
        self.executor
            .trigger_event(&self.component_id, event, payload)
            .await
    }
}
