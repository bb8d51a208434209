use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::events::SchedulerEvent;
use crate::task::{HandlerError, SharedHandler, Task, TaskContext, TaskSummary};
use crate::types::{TaskClass, TaskStatus};

use super::core::SchedulerState;
use super::Scheduler;

/// A task that has just been moved into a running map.
pub(super) struct Admission {
    pub(super) id: String,
    pub(super) class: TaskClass,
    pub(super) epoch: u64,
    pub(super) handler: Option<SharedHandler>,
    pub(super) ctx: TaskContext,
    pub(super) summary: TaskSummary,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn stub_result(ctx: &TaskContext) -> Value {
    json!({
        "message": format!("no handler registered for '{}'; completed as no-op", ctx.task_type),
        "tier": ctx.tier,
    })
}

impl Scheduler {
    /// Run the handler on its own Tokio task and report back to [`Self::finish`].
    pub(super) fn execute(&self, admission: Admission) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let Admission {
                id,
                class,
                epoch,
                handler,
                ctx,
                ..
            } = admission;
            let outcome = match handler {
                Some(handler) => AssertUnwindSafe(handler.run(ctx))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(&*panic)))),
                None => Ok(stub_result(&ctx)),
            };
            scheduler.finish(&id, class, epoch, outcome);
        });
    }

    /// Settle one attempt: complete, retry, or fail the task.
    ///
    /// Completions for an attempt that is no longer current (the task was
    /// requeued by safe mode, possibly re-admitted since) are dropped.
    pub(super) fn finish(
        &self,
        task_id: &str,
        class: TaskClass,
        epoch: u64,
        outcome: Result<Value, HandlerError>,
    ) {
        let now = self.now();
        let max_retries = self.inner.max_retries;
        let mut events = Vec::new();
        {
            let mut state = self.lock_state();
            let current = state.running.get(class).get(task_id).map(|t| t.epoch);
            if current != Some(epoch) {
                debug!(task_id, epoch, "Discarding completion of a superseded attempt");
                return;
            }
            let Some(mut task) = state.running.get_mut(class).shift_remove(task_id) else {
                return;
            };

            match outcome {
                Ok(value) => {
                    task.status = TaskStatus::Completed;
                    task.result = Some(value);
                    task.error = None;
                    task.metrics.completed_at = Some(now);
                    state
                        .stats
                        .record_completion(task.metrics.wait_ms(), task.metrics.exec_ms());
                    debug!(task_id, exec_ms = task.metrics.exec_ms(), "Task completed");
                    events.push(SchedulerEvent::TaskCompleted(task.summary(now)));
                    settle_group(&mut state, &task, true, &mut events);
                    self.record_history(&mut state, task.snapshot());
                }
                Err(err) if task.metrics.retries < max_retries && !task.is_critical_risk() => {
                    task.metrics.retries += 1;
                    state.stats.total_retried += 1;
                    task.status = TaskStatus::Queued;
                    task.error = Some(err.to_string());
                    debug!(
                        task_id,
                        retries = task.metrics.retries,
                        error = %err,
                        "Task failed, retrying"
                    );
                    events.push(SchedulerEvent::TaskRetrying(task.summary(now)));
                    state.queues.get_mut(class).insert_by_priority(task);
                }
                Err(err) => {
                    task.status = TaskStatus::Failed;
                    task.error = Some(err.to_string());
                    task.metrics.completed_at = Some(now);
                    state.stats.total_failed += 1;
                    warn!(
                        task_id,
                        task_type = %task.task_type,
                        retries = task.metrics.retries,
                        error = %err,
                        "Task failed"
                    );
                    events.push(SchedulerEvent::TaskFailed(task.summary(now)));
                    settle_group(&mut state, &task, false, &mut events);
                    self.record_history(&mut state, task.snapshot());
                }
            }
        }
        self.emit_all(events);
        self.request_drain();
    }

    /// Append to the completed ring, trimming to the most recent entries once
    /// the cap is exceeded.
    fn record_history(&self, state: &mut SchedulerState, task: Task) {
        state.completed.push_back(task);
        if state.completed.len() > self.inner.history_cap {
            let excess = state.completed.len() - self.inner.history_trim;
            state.completed.drain(..excess);
            debug!(kept = state.completed.len(), "Trimmed task history");
        }
    }
}

/// Count a terminal outcome against the task's group and finalize the group
/// when every member has settled.
pub(super) fn settle_group(
    state: &mut SchedulerState,
    task: &Task,
    succeeded: bool,
    events: &mut Vec<SchedulerEvent>,
) {
    let Some(group_id) = task.group_id.as_deref() else {
        return;
    };
    let finished = match state.groups.get_mut(group_id) {
        Some(group) => group.record(succeeded),
        None => return,
    };
    if finished {
        if let Some(group) = state.groups.shift_remove(group_id) {
            info!(
                group_id,
                completed = group.completed_count,
                failed = group.failed_count,
                "Parallel group finished"
            );
            events.push(SchedulerEvent::GroupCompleted(group));
        }
    }
}
