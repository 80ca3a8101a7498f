#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

/*!
Executor module for pageflow.

This module wires together:
- `actions`: the single-action interpreter (`ActionExecutor`) and its `ActionResult`
- `sequencer`: ordered execution of action lists with response chaining
- `dispatcher`: event triggering and per-component `EventHandler`s
- `runtime`: a page-level façade that seeds state and routes trigger records

Typical usage:
- Load a `PageDefinition`, build `Services`, construct a `Runtime`.
- Call `Runtime::load` once, then `Runtime::dispatch_value` for each incoming trigger.

Example:
```no_run
use pageflow::config::PageDefinition;
use pageflow::executor::Runtime;
use pageflow::services::{DryRunHttpClient, Services, UrlNormalizer};
use serde_json::json;
use std::sync::Arc;

# async fn demo() -> anyhow::Result<()> {
let services = Services::console(Arc::new(DryRunHttpClient), UrlNormalizer::default());
let rt = Runtime::new(PageDefinition::default(), services);
rt.load().await;
let trigger = json!({"component": "btn", "trigger": "onClick"});
let _ = rt.dispatch_value(&trigger).await;
# Ok(())
# }
```
*/

pub mod actions;
pub mod dispatcher;
pub mod runtime;
pub mod sequencer;

// Re-exports for convenient access from `pageflow::executor::*`
pub use actions::{ActionError, ActionExecutor, ActionResult, DEFAULT_MAX_DEPTH};
pub use dispatcher::{EventHandler, EventPayload};
pub use runtime::{Runtime, TriggerRecord};
pub use sequencer::{DetachedActions, SequenceResult};
