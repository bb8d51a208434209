//! Lifecycle notifications broadcast by the scheduler.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::group::ParallelGroup;
use crate::task::TaskSummary;
use crate::types::TaskClass;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcurrencyChange {
    pub task_class: TaskClass,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeModeChange {
    /// Running tasks moved back to their queues on entry.
    pub requeued: usize,
}

/// Serialized as `{"event": "<name>", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum SchedulerEvent {
    #[serde(rename = "task:queued")]
    TaskQueued(TaskSummary),
    #[serde(rename = "task:started")]
    TaskStarted(TaskSummary),
    #[serde(rename = "task:completed")]
    TaskCompleted(TaskSummary),
    #[serde(rename = "task:failed")]
    TaskFailed(TaskSummary),
    #[serde(rename = "task:retrying")]
    TaskRetrying(TaskSummary),
    #[serde(rename = "task:cancelled")]
    TaskCancelled(TaskSummary),
    #[serde(rename = "task:paused_safe_mode")]
    TaskPausedSafeMode(TaskSummary),
    #[serde(rename = "group:submitted")]
    GroupSubmitted(ParallelGroup),
    #[serde(rename = "group:completed")]
    GroupCompleted(ParallelGroup),
    #[serde(rename = "scheduler:safe_mode_entered")]
    SafeModeEntered(SafeModeChange),
    #[serde(rename = "scheduler:safe_mode_exited")]
    SafeModeExited,
    #[serde(rename = "scheduler:concurrency_changed")]
    ConcurrencyChanged(ConcurrencyChange),
    #[serde(rename = "scheduler:paused")]
    Paused,
    #[serde(rename = "scheduler:resumed")]
    Resumed,
}

impl SchedulerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TaskQueued(_) => "task:queued",
            Self::TaskStarted(_) => "task:started",
            Self::TaskCompleted(_) => "task:completed",
            Self::TaskFailed(_) => "task:failed",
            Self::TaskRetrying(_) => "task:retrying",
            Self::TaskCancelled(_) => "task:cancelled",
            Self::TaskPausedSafeMode(_) => "task:paused_safe_mode",
            Self::GroupSubmitted(_) => "group:submitted",
            Self::GroupCompleted(_) => "group:completed",
            Self::SafeModeEntered(_) => "scheduler:safe_mode_entered",
            Self::SafeModeExited => "scheduler:safe_mode_exited",
            Self::ConcurrencyChanged(_) => "scheduler:concurrency_changed",
            Self::Paused => "scheduler:paused",
            Self::Resumed => "scheduler:resumed",
        }
    }

    /// Task id for task-scoped events.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::TaskQueued(t)
            | Self::TaskStarted(t)
            | Self::TaskCompleted(t)
            | Self::TaskFailed(t)
            | Self::TaskRetrying(t)
            | Self::TaskCancelled(t)
            | Self::TaskPausedSafeMode(t) => Some(&t.id),
            _ => None,
        }
    }
}

/// Fan-out of scheduler events. Sending with no subscribers is not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SchedulerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn emit(&self, event: SchedulerEvent) {
        trace!(event = event.name(), "Scheduler event");
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_exact_names() {
        let ev = SchedulerEvent::ConcurrencyChanged(ConcurrencyChange {
            task_class: TaskClass::Batch,
            limit: 1,
        });
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "scheduler:concurrency_changed");
        assert_eq!(json["data"]["taskClass"], "batch");
        assert_eq!(ev.name(), "scheduler:concurrency_changed");

        let json = serde_json::to_value(SchedulerEvent::SafeModeExited).unwrap();
        assert_eq!(json["event"], "scheduler:safe_mode_exited");
    }

    #[tokio::test]
    async fn bus_delivers_to_subscribers() {
        let bus = EventBus::new(8);
        bus.emit(SchedulerEvent::Paused);
        let mut rx = bus.subscribe();
        bus.emit(SchedulerEvent::Resumed);
        assert_eq!(rx.recv().await.unwrap(), SchedulerEvent::Resumed);
    }
}
