use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::config::{Action, ActionKind};
use crate::expression::{
    ExpressionContext, ResponseInfo, evaluate_condition, interpolate_json, value_to_string,
};
use crate::services::{HttpError, HttpRequest, ModalEvent, Services, ToastOptions};
use crate::state::{ComponentRuntimeState, ComponentStateStore, RefreshRegistry};

/// Default maximum nesting depth of onSuccess/onError branches (protects against cycles).
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Uniform outcome of one action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            status: None,
            error: None,
        }
    }

    pub fn ok_with(data: Value, status: Option<u16>) -> Self {
        Self {
            success: true,
            data: Some(data),
            status,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            status: None,
            error: Some(error.into()),
        }
    }
}

/// Failures raised while performing an action; turned into `ActionResult` at the executor boundary.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    Http(#[from] HttpError),
}

/// Interprets single actions against the page's shared state and collaborators.
///
/// Cloning is cheap: the store, the registry and the services are shared handles.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    store: ComponentStateStore,
    refresh: RefreshRegistry,
    services: Services,
    max_depth: usize,
    default_toast_ms: Option<u64>,
}

impl ActionExecutor {
    pub fn new(store: ComponentStateStore, refresh: RefreshRegistry, services: Services) -> Self {
        Self {
            store,
            refresh,
            services,
            max_depth: DEFAULT_MAX_DEPTH,
            default_toast_ms: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Toast duration used when an action does not set one.
    pub fn with_default_toast_ms(mut self, ms: Option<u64>) -> Self {
        self.default_toast_ms = ms;
        self
    }

    pub fn store(&self) -> &ComponentStateStore {
        &self.store
    }

    pub fn refresh(&self) -> &RefreshRegistry {
        &self.refresh
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Execute one action. Never fails: errors come back as `success: false`.
    pub async fn execute_action(&self, action: &Action, ctx: &ExpressionContext) -> ActionResult {
        self.execute_at(action, ctx, 0).await
    }

    pub(crate) fn execute_at<'a>(
        &'a self,
        action: &'a Action,
        ctx: &'a ExpressionContext,
        depth: usize,
    ) -> BoxFuture<'a, ActionResult> {
        async move {
            let kind = action.kind.name();
            if depth > self.max_depth {
                warn!(target: "pageflow::executor", kind, depth, "Maximum action nesting depth exceeded");
                return ActionResult::failed(format!(
                    "Maximum action nesting depth ({}) exceeded",
                    self.max_depth
                ));
            }

            if let Some(condition) = &action.options.condition {
                if !evaluate_condition(condition, ctx) {
                    debug!(target: "pageflow::executor", kind, "Condition false; skipping action");
                    return ActionResult::ok();
                }
            }

            if let Some(ms) = action.options.delay.filter(|ms| *ms > 0) {
                trace!(target: "pageflow::executor", kind, ms, "Delaying action");
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }

            trace!(target: "pageflow::executor", kind, depth, "Executing action");
            match self.perform(action, ctx, depth).await {
                Ok(result) => result,
                Err(err) => {
                    let message = err.to_string();
                    warn!(target: "pageflow::executor", kind, error = %message, "Action failed");
                    if let Some(on_error) = action.options.on_error.as_deref().filter(|a| !a.is_empty()) {
                        let error_ctx = ctx.with_response(ResponseInfo::failed(message.clone()));
                        self.run_sequence(on_error, &error_ctx, depth + 1).await;
                    }
                    ActionResult::failed(message)
                }
            }
        }
        .boxed()
    }

    async fn perform(
        &self,
        action: &Action,
        ctx: &ExpressionContext,
        depth: usize,
    ) -> Result<ActionResult, ActionError> {
        match &action.kind {
            ActionKind::CallApi {
                api_path,
                api_method,
                api_body,
                api_headers,
            } => {
                let request = HttpRequest {
                    method: *api_method,
                    url: api_path.render(ctx),
                    body: api_body.as_ref().map(|body| interpolate_json(body, ctx)),
                    headers: api_headers
                        .iter()
                        .flatten()
                        .map(|(name, value)| {
                            (name.clone(), value_to_string(&interpolate_json(value, ctx)))
                        })
                        .collect::<BTreeMap<_, _>>(),
                };
                debug!(
                    target: "pageflow::executor",
                    method = request.method.as_str(),
                    url = %request.url,
                    "callApi"
                );
                let response = self.services.http.request(request).await?;

                if let Some(on_success) = action.options.on_success.as_deref().filter(|a| !a.is_empty()) {
                    let success_ctx = ctx.with_response(ResponseInfo::ok(
                        response.data.clone(),
                        Some(response.status),
                    ));
                    self.run_sequence(on_success, &success_ctx, depth + 1).await;
                }
                Ok(ActionResult::ok_with(response.data, Some(response.status)))
            }

            ActionKind::SetValue {
                target_component,
                value,
                target_field,
            } => {
                let resolved = interpolate_json(value, ctx);
                trace!(target: "pageflow::executor", %target_component, ?target_field, "setValue");
                self.store.update_with(target_component, |state| {
                    state.value = Some(resolved.clone());
                    if let Some(field) = target_field {
                        state.set_field(field, resolved.clone());
                    }
                });
                if let Some(field) = target_field {
                    self.store.set_form_field(field, resolved);
                }
                Ok(ActionResult::ok())
            }

            ActionKind::FilterData {
                target_component,
                filter_field,
                filter_value,
            } => {
                let resolved = interpolate_json(filter_value, ctx);
                self.store.update_with(target_component, |state| {
                    state
                        .filter_params
                        .get_or_insert_with(Map::new)
                        .insert(filter_field.clone(), resolved);
                });
                debug!(target: "pageflow::executor", %target_component, %filter_field, "filterData");
                self.refresh.trigger(target_component);
                Ok(ActionResult::ok())
            }

            ActionKind::Navigate {
                url,
                open_in_new_tab,
            } => {
                let target = self.services.urls.normalize(&url.render(ctx));
                debug!(target: "pageflow::executor", url = %target, new_tab = *open_in_new_tab, "navigate");
                if *open_in_new_tab {
                    self.services.window.open(&target);
                } else {
                    self.services.navigator.push(&target);
                }
                Ok(ActionResult::ok())
            }

            ActionKind::ShowToast {
                message,
                toast_type,
                title,
                duration,
            } => {
                let message = message.render(ctx);
                let options = ToastOptions {
                    title: title.as_ref().map(|t| t.render(ctx)),
                    duration: duration.or(self.default_toast_ms).map(Duration::from_millis),
                };
                self.services.notifier.notify(*toast_type, &message, &options);
                Ok(ActionResult::ok())
            }

            ActionKind::ShowModal {
                modal_id,
                title,
                content,
            } => {
                self.services.modals.publish(ModalEvent::Open {
                    modal_id: modal_id.clone(),
                    title: title.as_ref().map(|t| t.render(ctx)),
                    content: content.as_ref().map(|c| c.render(ctx)),
                });
                Ok(ActionResult::ok())
            }

            ActionKind::CloseModal { modal_id } => {
                self.services.modals.publish(ModalEvent::Close {
                    modal_id: modal_id.clone(),
                });
                Ok(ActionResult::ok())
            }

            ActionKind::Refresh { target_component } => {
                self.refresh.trigger(target_component);
                Ok(ActionResult::ok())
            }

            ActionKind::SetVisibility {
                target_component,
                visibility,
            } => {
                self.store.update_with(target_component, |state| {
                    state.visible = Some(visibility.apply(state.is_visible()));
                });
                Ok(ActionResult::ok())
            }

            ActionKind::SetLoading {
                target_component,
                loading,
            } => {
                self.store
                    .update(target_component, ComponentRuntimeState::with_loading(*loading));
                Ok(ActionResult::ok())
            }

            ActionKind::RunActions { action_group } => {
                debug!(target: "pageflow::executor", ?action_group, "runActions is not implemented; skipping");
                Ok(ActionResult::ok())
            }

            ActionKind::Unknown => {
                warn!(target: "pageflow::executor", "Unknown action type");
                Ok(ActionResult::failed("Unknown action type"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        Condition, HttpMethod, Operator, ToastKind, VisibilityChange,
    };
    use crate::services::testing::{Recorders, recording_services};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn executor() -> (ActionExecutor, Recorders) {
        let (services, recorders) = recording_services();
        let executor = ActionExecutor::new(
            ComponentStateStore::default(),
            RefreshRegistry::new(),
            services,
        );
        (executor, recorders)
    }

    fn action(value: serde_json::Value) -> Action {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn false_condition_is_a_successful_noop() {
        let (exec, rec) = executor();
        let act = action(json!({
            "type": "callApi",
            "apiPath": "/x",
            "condition": { "field": "form.go", "operator": "equals", "value": true }
        }));
        let result = exec.execute_action(&act, &ExpressionContext::default()).await;
        assert_eq!(result, ActionResult::ok());
        assert!(rec.http.requests().is_empty());
        assert!(exec.store().snapshot_state().components.is_empty());
    }

    #[tokio::test]
    async fn call_api_resolves_templates_and_runs_on_success() {
        let (exec, rec) = executor();
        rec.http.push_ok(201, json!({"id": 99}));
        let mut ctx = ExpressionContext::default();
        ctx.event.value = json!(7);
        ctx.form.insert("name".into(), json!("Ana"));

        let act = action(json!({
            "type": "callApi",
            "apiPath": "/orders/{{event.value}}",
            "apiMethod": "POST",
            "apiBody": { "name": "{{form.name}}", "qty": "{{event.value}}" },
            "apiHeaders": { "X-Qty": "{{event.value}}" },
            "onSuccess": [
                { "type": "setValue", "targetComponent": "created", "value": "{{response.data.id}}" }
            ]
        }));
        let result = exec.execute_action(&act, &ctx).await;

        assert!(result.success);
        assert_eq!(result.data, Some(json!({"id": 99})));
        assert_eq!(result.status, Some(201));
        let request = &rec.http.requests()[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, "/orders/7");
        assert_eq!(request.body, Some(json!({"name": "Ana", "qty": 7})));
        assert_eq!(request.headers.get("X-Qty").map(String::as_str), Some("7"));
        assert_eq!(exec.store().get("created").unwrap().value, Some(json!(99)));
    }

    #[tokio::test]
    async fn failed_call_runs_on_error_and_reports_failure() {
        let (exec, rec) = executor();
        rec.http.push_err(HttpError::Status {
            status: 400,
            body: json!({"message": "bad input"}),
        });
        let act = action(json!({
            "type": "callApi",
            "apiPath": "/x",
            "onError": [
                { "type": "setValue", "targetComponent": "err", "value": "{{response.error}}" }
            ]
        }));
        let result = exec.execute_action(&act, &ExpressionContext::default()).await;
        assert_eq!(result, ActionResult::failed("bad input"));
        assert_eq!(exec.store().get("err").unwrap().value, Some(json!("bad input")));
    }

    #[tokio::test]
    async fn set_value_with_target_field_writes_state_and_form() {
        let (exec, _rec) = executor();
        let mut ctx = ExpressionContext::default();
        ctx.event.value = json!("x@y.z");
        let act = action(json!({
            "type": "setValue",
            "targetComponent": "email",
            "value": "{{event.value}}",
            "targetField": "email"
        }));
        assert!(exec.execute_action(&act, &ctx).await.success);
        let state = exec.store().get("email").unwrap();
        assert_eq!(state.value, Some(json!("x@y.z")));
        assert_eq!(state.extra.get("email"), Some(&json!("x@y.z")));
        assert_eq!(exec.store().form().get("email"), Some(&json!("x@y.z")));
    }

    #[tokio::test]
    async fn set_value_target_field_reaches_builtin_state_fields() {
        let (exec, _rec) = executor();
        let ctx = ExpressionContext::default();
        exec.store().register("panel", None);
        let set = |field: &str, value: serde_json::Value| {
            action(json!({
                "type": "setValue",
                "targetComponent": "panel",
                "targetField": field,
                "value": value
            }))
        };

        for (field, value) in [
            ("visible", json!(false)),
            ("loading", json!(true)),
            ("error", json!("Timeout")),
            ("filterParams", json!({"status": "open"})),
        ] {
            assert!(exec.execute_action(&set(field, value), &ctx).await.success);
        }

        let state = exec.store().get("panel").unwrap();
        assert!(!state.is_visible());
        assert!(state.is_loading());
        assert_eq!(state.error.as_deref(), Some("Timeout"));
        assert_eq!(
            state.filter_params.as_ref().and_then(|p| p.get("status")),
            Some(&json!("open"))
        );
        assert!(state.extra.is_empty());

        let encoded = serde_json::to_value(&state).unwrap();
        assert_eq!(encoded["visible"], json!(false));
        assert_eq!(exec.store().form().get("visible"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn filter_data_merges_params_and_refreshes_once() {
        let (exec, _rec) = executor();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _sub = exec.refresh().register("table1", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        exec.store().update(
            "table1",
            ComponentRuntimeState {
                filter_params: Some(serde_json::from_value(json!({"page": 2})).unwrap()),
                ..Default::default()
            },
        );

        let mut ctx = ExpressionContext::default();
        ctx.event.value = json!("active");
        let act = action(json!({
            "type": "filterData",
            "targetComponent": "table1",
            "filterField": "status",
            "filterValue": "{{event.value}}"
        }));
        assert!(exec.execute_action(&act, &ctx).await.success);

        let params = exec.store().get("table1").unwrap().filter_params.unwrap();
        assert_eq!(params.get("status"), Some(&json!("active")));
        assert_eq!(params.get("page"), Some(&json!(2)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn navigate_routes_or_opens_tab() {
        let (exec, rec) = executor();
        let mut ctx = ExpressionContext::default();
        ctx.event.value = json!(5);
        exec.execute_action(
            &action(json!({"type": "navigate", "url": "orders//{{event.value}}"})),
            &ctx,
        )
        .await;
        exec.execute_action(
            &action(json!({"type": "navigate", "url": "https://docs.example.com", "openInNewTab": true})),
            &ctx,
        )
        .await;
        assert_eq!(*rec.navigator.pushed.lock().unwrap(), vec!["/orders/5".to_string()]);
        assert_eq!(
            *rec.navigator.opened.lock().unwrap(),
            vec!["https://docs.example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn show_toast_uses_kind_title_and_default_duration() {
        let (exec, rec) = executor();
        let exec = exec.with_default_toast_ms(Some(3000));
        let mut ctx = ExpressionContext::default();
        ctx.user.name = Some("Ana".into());
        exec.execute_action(
            &action(json!({
                "type": "showToast",
                "toastType": "success",
                "title": "Hi {{user.name}}",
                "message": "Saved"
            })),
            &ctx,
        )
        .await;
        let toasts = rec.notifier.toasts();
        assert_eq!(toasts.len(), 1);
        let (kind, message, options) = &toasts[0];
        assert_eq!(*kind, ToastKind::Success);
        assert_eq!(message, "Saved");
        assert_eq!(options.title.as_deref(), Some("Hi Ana"));
        assert_eq!(options.duration, Some(Duration::from_millis(3000)));
    }

    #[tokio::test]
    async fn modal_actions_publish_on_the_bus() {
        let (exec, _rec) = executor();
        let mut rx = exec.services().modals.subscribe();
        let mut ctx = ExpressionContext::default();
        ctx.form.insert("id".into(), json!(3));
        exec.execute_action(
            &action(json!({"type": "showModal", "modalId": "m", "title": "Order {{form.id}}"})),
            &ctx,
        )
        .await;
        exec.execute_action(&action(json!({"type": "closeModal", "modalId": "m"})), &ctx)
            .await;

        assert_eq!(
            rx.recv().await.unwrap(),
            ModalEvent::Open {
                modal_id: "m".into(),
                title: Some("Order 3".into()),
                content: None
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            ModalEvent::Close {
                modal_id: "m".into()
            }
        );
    }

    #[tokio::test]
    async fn visibility_and_loading_updates() {
        let (exec, _rec) = executor();
        let ctx = ExpressionContext::default();
        let toggle = Action::new(ActionKind::SetVisibility {
            target_component: "panel".into(),
            visibility: VisibilityChange::Toggle,
        });
        exec.execute_action(&toggle, &ctx).await;
        assert_eq!(exec.store().get("panel").unwrap().visible, Some(false));
        exec.execute_action(&toggle, &ctx).await;
        assert_eq!(exec.store().get("panel").unwrap().visible, Some(true));

        exec.execute_action(
            &action(json!({"type": "setLoading", "targetComponent": "panel"})),
            &ctx,
        )
        .await;
        assert!(exec.store().get("panel").unwrap().is_loading());
    }

    #[tokio::test]
    async fn show_and_hide_create_missing_entries() {
        let (exec, _rec) = executor();
        let ctx = ExpressionContext::default();
        let hide = action(json!({"type": "setVisibility", "targetComponent": "ghost", "visibility": "hide"}));
        assert!(exec.execute_action(&hide, &ctx).await.success);
        assert_eq!(exec.store().get("ghost").unwrap().visible, Some(false));

        // hide is idempotent, show flips it back
        exec.execute_action(&hide, &ctx).await;
        assert_eq!(exec.store().get("ghost").unwrap().visible, Some(false));
        let show = action(json!({"type": "setVisibility", "targetComponent": "ghost", "visibility": "show"}));
        exec.execute_action(&show, &ctx).await;
        assert!(exec.store().get("ghost").unwrap().is_visible());
    }

    #[tokio::test]
    async fn refresh_of_unknown_component_is_silent() {
        let (exec, _rec) = executor();
        let result = exec
            .execute_action(
                &action(json!({"type": "refresh", "targetComponent": "nobody"})),
                &ExpressionContext::default(),
            )
            .await;
        assert!(result.success);
        assert!(exec.store().get("nobody").is_none());
    }

    #[tokio::test]
    async fn run_actions_is_a_noop_and_unknown_fails() {
        let (exec, _rec) = executor();
        let ctx = ExpressionContext::default();
        let noop = exec
            .execute_action(&action(json!({"type": "runActions", "actionGroup": "g"})), &ctx)
            .await;
        assert_eq!(noop, ActionResult::ok());

        let unknown = exec
            .execute_action(&action(json!({"type": "teleport"})), &ctx)
            .await;
        assert_eq!(unknown, ActionResult::failed("Unknown action type"));
    }

    #[tokio::test]
    async fn nesting_depth_is_bounded() {
        let (exec, rec) = executor();
        let exec = exec.with_max_depth(1);
        rec.http.push_ok(200, json!(1));
        rec.http.push_ok(200, json!(2));
        let act = action(json!({
            "type": "callApi",
            "apiPath": "/a",
            "onSuccess": [{
                "type": "callApi",
                "apiPath": "/b",
                "onSuccess": [{ "type": "setLoading", "targetComponent": "deep" }]
            }]
        }));
        assert!(exec.execute_action(&act, &ExpressionContext::default()).await.success);
        assert_eq!(rec.http.requests().len(), 2);
        assert!(exec.store().get("deep").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn delay_suspends_before_running() {
        let (exec, _rec) = executor();
        let act = action(json!({"type": "setLoading", "targetComponent": "t", "delay": 500}));
        let started = tokio::time::Instant::now();
        exec.execute_action(&act, &ExpressionContext::default()).await;
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert!(exec.store().get("t").unwrap().is_loading());
    }

    #[tokio::test]
    async fn condition_can_read_event_value() {
        let (exec, _rec) = executor();
        let mut ctx = ExpressionContext::default();
        ctx.event.value = json!(10);
        let act = Action::new(ActionKind::SetLoading {
            target_component: "big".into(),
            loading: true,
        })
        .with_condition(Condition::new("event.value", Operator::GreaterThan, Some(json!(5))));
        exec.execute_action(&act, &ctx).await;
        assert!(exec.store().get("big").unwrap().is_loading());
    }
}
