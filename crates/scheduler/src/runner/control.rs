use tracing::{debug, info};

use crate::error::SchedulerError;
use crate::events::{ConcurrencyChange, SafeModeChange, SchedulerEvent};
use crate::task::Task;
use crate::types::{TaskClass, TaskStatus};

use super::execution::settle_group;
use super::Scheduler;

impl Scheduler {
    /// Suspend batch and training work. Their running tasks leave the running
    /// maps, are marked `paused` and go back to the head of their queues in
    /// admission order. Interactive work is untouched.
    pub fn enter_safe_mode(&self) {
        let requeued = {
            let mut state = self.lock_state();
            if state.safe_mode {
                debug!("Safe mode already active");
                return;
            }
            state.safe_mode = true;
            let mut requeued = 0;
            for class in TaskClass::ALL.into_iter().filter(|c| c.throttled_by_safe_mode()) {
                let running: Vec<Task> = state
                    .running
                    .get_mut(class)
                    .drain(..)
                    .map(|(_, task)| task)
                    .collect();
                requeued += running.len();
                for mut task in running.into_iter().rev() {
                    task.status = TaskStatus::Paused;
                    state.queues.get_mut(class).push_front(task);
                }
            }
            requeued
        };
        info!(requeued, "Safe mode entered");
        self.inner
            .events
            .emit(SchedulerEvent::SafeModeEntered(SafeModeChange { requeued }));
    }

    pub fn exit_safe_mode(&self) {
        {
            let mut state = self.lock_state();
            if !state.safe_mode {
                debug!("Safe mode not active");
                return;
            }
            state.safe_mode = false;
        }
        info!("Safe mode exited");
        self.inner.events.emit(SchedulerEvent::SafeModeExited);
        self.request_drain();
    }

    pub fn set_safe_mode(&self, enabled: bool) {
        if enabled {
            self.enter_safe_mode();
        } else {
            self.exit_safe_mode();
        }
    }

    /// Overwrite the concurrency ceiling of a class. A limit of 0 stops
    /// admissions for that class without touching running tasks.
    pub fn adjust_concurrency(&self, class: TaskClass, limit: usize) {
        let previous = {
            let mut state = self.lock_state();
            std::mem::replace(state.limits.get_mut(class), limit)
        };
        info!(class = %class, previous, limit, "Concurrency limit changed");
        self.inner
            .events
            .emit(SchedulerEvent::ConcurrencyChanged(ConcurrencyChange {
                task_class: class,
                limit,
            }));
        self.request_drain();
    }

    /// Halt all admissions. Running tasks finish normally.
    pub fn pause(&self) {
        self.lock_state().paused = true;
        info!("Scheduler paused");
        self.inner.events.emit(SchedulerEvent::Paused);
    }

    pub fn resume(&self) {
        self.lock_state().paused = false;
        info!("Scheduler resumed");
        self.inner.events.emit(SchedulerEvent::Resumed);
        self.request_drain();
    }

    /// Cancel a task that is still waiting in a queue. Running and finished
    /// tasks cannot be cancelled.
    pub fn cancel_task(&self, task_id: &str) -> Result<Task, SchedulerError> {
        let now = self.now();
        let mut events = Vec::new();
        let cancelled = {
            let mut state = self.lock_state();
            let removed = TaskClass::ALL
                .into_iter()
                .find_map(|class| state.queues.get_mut(class).remove(task_id));
            let Some(mut task) = removed else {
                debug!(task_id, "Cancel target not queued");
                return Err(SchedulerError::TaskNotFound(task_id.to_string()));
            };
            task.status = TaskStatus::Cancelled;
            task.metrics.completed_at = Some(now);
            state.stats.total_cancelled += 1;
            events.push(SchedulerEvent::TaskCancelled(task.summary(now)));
            settle_group(&mut state, &task, false, &mut events);
            task.snapshot()
        };
        info!(task_id, "Task cancelled");
        self.emit_all(events);
        Ok(cancelled)
    }
}
