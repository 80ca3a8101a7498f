use futures::future::{BoxFuture, FutureExt};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::actions::{ActionExecutor, ActionResult};
use crate::config::Action;
use crate::expression::{ExpressionContext, ResponseInfo};

/// Outcome of running an ordered action list.
#[derive(Debug)]
pub struct SequenceResult {
    /// `false` only when a sequential action failed without an `onError` branch.
    pub success: bool,
    /// Results of the sequential actions that ran, in order.
    pub results: Vec<ActionResult>,
    /// Fire-and-forget actions still running in the background. Their results never
    /// reach `results` or the chained context; dropping a handle leaves the task running.
    pub detached: Vec<JoinHandle<ActionResult>>,
}

impl SequenceResult {
    /// Wait for every detached action.
    pub async fn join_detached(&mut self) -> Vec<ActionResult> {
        join_all(self.detached.drain(..)).await
    }
}

async fn join_all(handles: impl IntoIterator<Item = JoinHandle<ActionResult>>) -> Vec<ActionResult> {
    let mut out = Vec::new();
    for handle in handles {
        out.push(match handle.await {
            Ok(result) => result,
            Err(err) => ActionResult::failed(format!("detached action aborted: {err}")),
        });
    }
    out
}

/// Background actions collected across many sequences, so a host can wait for
/// them before shutting down.
#[derive(Debug, Default)]
pub struct DetachedActions {
    handles: Vec<JoinHandle<ActionResult>>,
}

impl DetachedActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take over the detached handles of `run`. Finished handles are pruned.
    pub fn track(&mut self, run: &mut SequenceResult) {
        self.handles.retain(|handle| !handle.is_finished());
        self.handles.append(&mut run.detached);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every tracked action.
    pub async fn join_all(&mut self) -> Vec<ActionResult> {
        let pending = self.handles.len();
        if pending > 0 {
            debug!(target: "pageflow::sequencer", pending, "Waiting for detached actions");
        }
        join_all(self.handles.drain(..)).await
    }

    /// Abort every tracked action that is still running.
    pub fn abort_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl ActionExecutor {
    /// Run actions in declared order.
    ///
    /// - `async: true` actions are spawned and not awaited (requires a tokio runtime).
    /// - A failed sequential action without `onError` stops the run.
    /// - A successful action's `data` becomes `response.data` for the next action.
    pub async fn execute_actions(
        &self,
        actions: &[Action],
        ctx: &ExpressionContext,
    ) -> SequenceResult {
        self.run_sequence(actions, ctx, 0).await
    }

    pub(crate) fn run_sequence<'a>(
        &'a self,
        actions: &'a [Action],
        ctx: &'a ExpressionContext,
        depth: usize,
    ) -> BoxFuture<'a, SequenceResult> {
        async move {
            let mut chained = ctx.clone();
            let mut results = Vec::with_capacity(actions.len());
            let mut detached = Vec::new();

            for (idx, action) in actions.iter().enumerate() {
                let kind = action.kind.name();

                if action.options.run_async {
                    trace!(target: "pageflow::sequencer", step_index = idx, kind, "Spawning detached action");
                    let executor = self.clone();
                    let action = action.clone();
                    let ctx = chained.clone();
                    detached.push(tokio::spawn(async move {
                        executor.execute_at(&action, &ctx, depth).await
                    }));
                    continue;
                }

                trace!(target: "pageflow::sequencer", step_index = idx, kind, depth, "Sequence step");
                let result = self.execute_at(action, &chained, depth).await;

                if result.success {
                    if let Some(data) = &result.data {
                        chained = chained.with_response(ResponseInfo::ok(data.clone(), result.status));
                    }
                }
                let failed = !result.success;
                results.push(result);

                if failed && !action.has_error_handler() {
                    warn!(
                        target: "pageflow::sequencer",
                        step_index = idx, kind,
                        "Unhandled failure; aborting remaining actions"
                    );
                    return SequenceResult {
                        success: false,
                        results,
                        detached,
                    };
                }
            }

            debug!(target: "pageflow::sequencer", steps = actions.len(), depth, "Sequence completed");
            SequenceResult {
                success: true,
                results,
                detached,
            }
        }
        .boxed()
    }
}
