use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::SchedulerError;
use crate::events::SchedulerEvent;
use crate::group::{GroupOptions, ParallelGroup};
use crate::task::{new_group_id, Task, TaskContext, TaskOptions};
use crate::types::{TaskClass, TaskStatus};

use super::core::SchedulerState;
use super::execution::Admission;
use super::Scheduler;

impl Scheduler {
    /// Submit a task. Returns a snapshot of the task as submitted.
    ///
    /// While safe mode is active, batch and training submissions are not
    /// queued at all: they come back `paused`. A caller-supplied id that is
    /// already queued or running is rejected.
    pub fn submit(&self, options: TaskOptions) -> Result<Task, SchedulerError> {
        let now = self.now();
        let task = Task::from_options(options, now);

        let (snapshot, event, queued) = {
            let mut state = self.lock_state();
            if state.is_live(&task.id) {
                return Err(SchedulerError::DuplicateTask(task.id));
            }
            self.enqueue(&mut state, task, now)
        };

        self.inner.events.emit(event);
        if queued {
            self.request_drain();
        }
        Ok(snapshot)
    }

    /// Route a task and either queue it or hold it back for safe mode.
    fn enqueue(
        &self,
        state: &mut SchedulerState,
        mut task: Task,
        now: u64,
    ) -> (Task, SchedulerEvent, bool) {
        task.resource_tier = self.inner.routing.route(
            &task.task_type,
            task.priority,
            task.constraints.risk_level,
            state.safe_mode,
        );

        if state.safe_mode && task.task_class.throttled_by_safe_mode() {
            task.status = TaskStatus::Paused;
            info!(
                task_id = %task.id,
                class = %task.task_class,
                "Submission held back by safe mode"
            );
            let summary = task.summary(now);
            (task.snapshot(), SchedulerEvent::TaskPausedSafeMode(summary), false)
        } else {
            state.stats.total_queued += 1;
            debug!(
                task_id = %task.id,
                task_type = %task.task_type,
                class = %task.task_class,
                tier = %task.resource_tier,
                priority = task.priority.level(),
                "Task queued"
            );
            let snapshot = task.snapshot();
            let summary = task.summary(now);
            state.queues.get_mut(task.task_class).insert_by_priority(task);
            (snapshot, SchedulerEvent::TaskQueued(summary), true)
        }
    }

    /// Submit tasks as one parallel group. Ids are checked and the group is
    /// registered under the same lock that queues its members, so fast
    /// members cannot settle against a missing group.
    pub fn submit_group(
        &self,
        tasks: Vec<TaskOptions>,
        options: GroupOptions,
    ) -> Result<ParallelGroup, SchedulerError> {
        if tasks.is_empty() {
            return Err(SchedulerError::EmptyGroup);
        }
        let now = self.now();
        let group_id = new_group_id(now);

        let tasks: Vec<Task> = tasks
            .into_iter()
            .map(|mut opts| {
                opts.group_id = Some(group_id.clone());
                Task::from_options(opts, now)
            })
            .collect();
        let task_ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        let group = ParallelGroup::new(group_id.clone(), task_ids.clone(), options);

        let outcomes = {
            let mut state = self.lock_state();
            let mut seen = HashSet::new();
            for id in &task_ids {
                if !seen.insert(id.as_str()) || state.is_live(id) {
                    return Err(SchedulerError::DuplicateTask(id.clone()));
                }
            }
            state.groups.insert(group_id.clone(), group.clone());
            tasks
                .into_iter()
                .map(|task| self.enqueue(&mut state, task, now))
                .collect::<Vec<_>>()
        };
        info!(group_id = %group_id, tasks = group.len(), "Parallel group submitted");

        let mut any_queued = false;
        for (_, event, queued) in outcomes {
            self.inner.events.emit(event);
            any_queued |= queued;
        }
        self.inner.events.emit(SchedulerEvent::GroupSubmitted(group.clone()));
        if any_queued {
            self.request_drain();
        }
        Ok(group)
    }

    /// One drain pass: admit queued tasks class by class (interactive, batch,
    /// training) until each class reaches its effective ceiling.
    ///
    /// Normally driven by [`Scheduler::run`]; must be called on a Tokio runtime.
    pub fn drain(&self) {
        let now = self.now();
        let mut admitted = Vec::new();
        {
            let mut state = self.lock_state();
            if state.paused {
                debug!("Drain skipped: scheduler paused");
                return;
            }
            for class in TaskClass::ALL {
                let limit = state.effective_limit(class);
                while state.running.get(class).len() < limit {
                    let Some(mut task) = state.queues.get_mut(class).pop_front() else {
                        break;
                    };
                    state.next_epoch += 1;
                    task.epoch = state.next_epoch;
                    task.status = TaskStatus::Running;
                    task.metrics.started_at = Some(now);
                    task.error = None;
                    state.stats.total_started += 1;

                    let handler = task
                        .handler
                        .clone()
                        .or_else(|| self.registered_handler(&task.task_type));
                    let ctx = TaskContext {
                        task_id: task.id.clone(),
                        task_type: task.task_type.clone(),
                        payload: task.payload.clone(),
                        tier: task.resource_tier,
                        attempt: task.metrics.retries,
                    };
                    debug!(task_id = %task.id, class = %class, attempt = ctx.attempt, "Task admitted");
                    admitted.push(Admission {
                        id: task.id.clone(),
                        class,
                        epoch: task.epoch,
                        handler,
                        ctx,
                        summary: task.summary(now),
                    });
                    state.running.get_mut(class).insert(task.id.clone(), task);
                }
            }
        }

        for admission in admitted {
            self.inner
                .events
                .emit(SchedulerEvent::TaskStarted(admission.summary.clone()));
            self.execute(admission);
        }
    }
}
