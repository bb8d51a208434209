use serde::{Deserialize, Serialize};

use crate::metrics::SchedulerStats;
use crate::task::TaskSummary;
use crate::types::PerClass;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStatus {
    pub queued: usize,
    pub running: usize,
    pub limit: usize,
}

/// Point-in-time view of the scheduler, as served by the status endpoint
/// and read by diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub paused: bool,
    pub safe_mode_active: bool,
    pub concurrency_limits: PerClass<usize>,
    pub queues: PerClass<ClassStatus>,
    pub active_groups: usize,
    pub stats: SchedulerStats,
    #[serde(with = "crate::clock::rfc3339_ms")]
    pub ts: u64,
}

impl SchedulerStatus {
    pub fn total_queued(&self) -> usize {
        self.queues.map(|c| c.queued).total()
    }

    pub fn total_running(&self) -> usize {
        self.queues.map(|c| c.running).total()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassListing {
    pub queued: Vec<TaskSummary>,
    pub running: Vec<TaskSummary>,
}

pub type QueueListing = PerClass<ClassListing>;
