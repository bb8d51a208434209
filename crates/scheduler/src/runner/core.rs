use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use indexmap::IndexMap;
use tiergate_core::config::SchedulerSettings;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::events::{EventBus, SchedulerEvent};
use crate::group::ParallelGroup;
use crate::metrics::SchedulerStats;
use crate::queue::ClassQueue;
use crate::routing::RoutingTable;
use crate::status::{ClassListing, ClassStatus, QueueListing, SchedulerStatus};
use crate::task::{SharedHandler, Task, TaskSummary};
use crate::types::{PerClass, TaskClass};

/// Mutable scheduling state. Only ever touched inside short synchronous
/// critical sections; the lock is never held across an await.
#[derive(Default)]
pub(super) struct SchedulerState {
    pub(super) queues: PerClass<ClassQueue>,
    pub(super) running: PerClass<IndexMap<String, Task>>,
    pub(super) limits: PerClass<usize>,
    /// Tasks that reached a terminal state, oldest first.
    pub(super) completed: VecDeque<Task>,
    pub(super) groups: IndexMap<String, ParallelGroup>,
    pub(super) paused: bool,
    pub(super) safe_mode: bool,
    pub(super) stats: SchedulerStats,
    pub(super) next_epoch: u64,
}

impl SchedulerState {
    /// Ceiling used by a drain pass: 0 for throttled classes in safe mode.
    pub(super) fn effective_limit(&self, class: TaskClass) -> usize {
        if self.safe_mode && class.throttled_by_safe_mode() {
            0
        } else {
            *self.limits.get(class)
        }
    }

    /// True when a task with this id is waiting in a queue or running.
    pub(super) fn is_live(&self, task_id: &str) -> bool {
        TaskClass::ALL.into_iter().any(|class| {
            self.running.get(class).contains_key(task_id) || self.queues.get(class).contains(task_id)
        })
    }
}

pub(super) struct SchedulerInner {
    pub(super) state: Mutex<SchedulerState>,
    pub(super) handlers: RwLock<HashMap<String, SharedHandler>>,
    pub(super) routing: RoutingTable,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) events: EventBus,
    pub(super) max_retries: u32,
    pub(super) history_cap: usize,
    pub(super) history_trim: usize,
    /// Single-slot "drain requested" flag consumed by the run loop.
    pub(super) drain_requested: AtomicBool,
    pub(super) drain_notify: Notify,
    pub(super) shutdown: AtomicBool,
    pub(super) shutdown_notify: Notify,
}

/// Resource-aware task scheduler.
///
/// Cheap to clone; every clone drives the same queues. Work is admitted by
/// [`Scheduler::run`], which must be running on a Tokio runtime for queued
/// tasks to make progress.
#[derive(Clone)]
pub struct Scheduler {
    pub(super) inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// Create a scheduler using the system clock.
    pub fn new(settings: &SchedulerSettings, routing: RoutingTable) -> Self {
        Self::with_clock(settings, routing, Arc::new(SystemClock))
    }

    pub fn with_clock(
        settings: &SchedulerSettings,
        routing: RoutingTable,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = SchedulerState {
            limits: PerClass::new(
                settings.concurrency_interactive,
                settings.concurrency_batch,
                settings.concurrency_training,
            ),
            ..SchedulerState::default()
        };
        info!(
            interactive = settings.concurrency_interactive,
            batch = settings.concurrency_batch,
            training = settings.concurrency_training,
            routes = routing.len(),
            "Scheduler created"
        );
        Self {
            inner: Arc::new(SchedulerInner {
                state: Mutex::new(state),
                handlers: RwLock::new(HashMap::new()),
                routing,
                clock,
                events: EventBus::new(settings.event_channel_capacity),
                max_retries: settings.max_retries,
                history_cap: settings.history_cap.max(1),
                history_trim: settings.history_trim.min(settings.history_cap.max(1)),
                drain_requested: AtomicBool::new(false),
                drain_notify: Notify::new(),
                shutdown: AtomicBool::new(false),
                shutdown_notify: Notify::new(),
            }),
        }
    }

    pub(super) fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn now(&self) -> u64 {
        self.inner.clock.now_ms()
    }

    pub(super) fn emit_all(&self, events: Vec<SchedulerEvent>) {
        for event in events {
            self.inner.events.emit(event);
        }
    }

    /// Register the handler used for tasks of `task_type` that carry none.
    pub fn register_handler(&self, task_type: impl Into<String>, handler: SharedHandler) {
        let task_type = task_type.into();
        info!(task_type = %task_type, "Registered task handler");
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task_type, handler);
    }

    pub(super) fn registered_handler(&self, task_type: &str) -> Option<SharedHandler> {
        self.inner
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(task_type)
            .cloned()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.inner.events.subscribe()
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.inner.routing
    }

    /// Ask the run loop for a drain pass. Redundant requests coalesce.
    pub fn request_drain(&self) {
        if !self.inner.drain_requested.swap(true, Ordering::AcqRel) {
            self.inner.drain_notify.notify_one();
        }
    }

    /// Run the drain loop until [`Scheduler::shutdown`] is called.
    pub async fn run(&self) {
        info!("Scheduler run loop started");
        loop {
            if self.inner.shutdown.load(Ordering::Acquire) {
                break;
            }
            tokio::select! {
                _ = self.inner.drain_notify.notified() => {}
                _ = self.inner.shutdown_notify.notified() => {}
            }
            if self.inner.shutdown.load(Ordering::Acquire) {
                break;
            }
            self.inner.drain_requested.store(false, Ordering::Release);
            self.drain();
        }
        info!("Scheduler run loop stopped");
    }

    /// Spawn [`Scheduler::run`] onto the current runtime.
    pub fn start(&self) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run().await })
    }

    pub fn shutdown(&self) {
        info!("Scheduler shutdown requested");
        self.inner.shutdown.store(true, Ordering::Release);
        self.inner.shutdown_notify.notify_one();
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    pub fn status(&self) -> SchedulerStatus {
        let now = self.now();
        let state = self.lock_state();
        let mut queues = PerClass::<ClassStatus>::default();
        for class in TaskClass::ALL {
            *queues.get_mut(class) = ClassStatus {
                queued: state.queues.get(class).len(),
                running: state.running.get(class).len(),
                limit: *state.limits.get(class),
            };
        }
        SchedulerStatus {
            paused: state.paused,
            safe_mode_active: state.safe_mode,
            concurrency_limits: state.limits.clone(),
            queues,
            active_groups: state.groups.len(),
            stats: state.stats.clone(),
            ts: now,
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        self.lock_state().stats.clone()
    }

    pub fn is_safe_mode(&self) -> bool {
        self.lock_state().safe_mode
    }

    pub fn is_paused(&self) -> bool {
        self.lock_state().paused
    }

    pub fn concurrency_limit(&self, class: TaskClass) -> usize {
        *self.lock_state().limits.get(class)
    }

    /// Queued and running task summaries per class.
    pub fn queues(&self) -> QueueListing {
        let now = self.now();
        let state = self.lock_state();
        let mut listing = QueueListing::default();
        for class in TaskClass::ALL {
            *listing.get_mut(class) = ClassListing {
                queued: state.queues.get(class).iter().map(|t| t.summary(now)).collect(),
                running: state.running.get(class).values().map(|t| t.summary(now)).collect(),
            };
        }
        listing
    }

    /// The last `limit` finished tasks, oldest first.
    pub fn history(&self, limit: usize) -> Vec<TaskSummary> {
        let now = self.now();
        let state = self.lock_state();
        let skip = state.completed.len().saturating_sub(limit);
        state
            .completed
            .iter()
            .skip(skip)
            .map(|t| t.summary(now))
            .collect()
    }

    pub fn history_len(&self) -> usize {
        self.lock_state().completed.len()
    }

    pub fn active_groups(&self) -> Vec<ParallelGroup> {
        self.lock_state().groups.values().cloned().collect()
    }

    /// Look a task up in the queues, the running maps, then history (newest first).
    pub fn find_task(&self, task_id: &str) -> Option<Task> {
        let state = self.lock_state();
        for class in TaskClass::ALL {
            if let Some(task) = state.queues.get(class).iter().find(|t| t.id == task_id) {
                return Some(task.snapshot());
            }
            if let Some(task) = state.running.get(class).get(task_id) {
                return Some(task.snapshot());
            }
        }
        state.completed.iter().rev().find(|t| t.id == task_id).cloned()
    }
}
