//! Resource-aware task scheduler.
//!
//! Three class-scoped priority queues (interactive, batch, training), each
//! with its own concurrency ceiling, fed by a tier router and drained by a
//! coalesced run loop. Failed attempts are retried a bounded number of times;
//! safe mode suspends non-interactive work under resource pressure.

pub mod clock;
pub mod error;
pub mod events;
pub mod group;
pub mod metrics;
pub mod mitigation;
pub mod queue;
pub mod routing;
pub mod runner;
pub mod status;
pub mod task;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::SchedulerError;
pub use events::{ConcurrencyChange, EventBus, SafeModeChange, SchedulerEvent};
pub use group::{GroupOptions, GroupStatus, ParallelGroup};
pub use metrics::SchedulerStats;
pub use mitigation::{spawn_mitigation_listener, MitigationSignal};
pub use routing::{RoutingTable, TierRoute};
pub use runner::Scheduler;
pub use status::{ClassListing, ClassStatus, QueueListing, SchedulerStatus};
pub use task::{
    handler_fn, ConstraintOptions, FnHandler, HandlerError, SharedHandler, Task, TaskContext,
    TaskHandler, TaskOptions, TaskSummary,
};
pub use types::{
    Constraints, PerClass, Priority, ResourceTier, RiskLevel, TaskClass, TaskMetrics, TaskStatus,
};
