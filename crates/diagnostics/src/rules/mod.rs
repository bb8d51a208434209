//! Rule sets. Each one reads a slice of the diagnostic input and returns
//! zero or more findings; none of them mutate anything.

pub mod cpu;
pub mod disk;
pub mod gpu;
pub mod memory;
pub mod patterns;
pub mod scheduler;
pub mod tiers;

use serde::{Deserialize, Serialize};
use tiergate_scheduler::{SchedulerStatus, TaskSummary};

use crate::finding::Finding;
use crate::profile::HostInfo;
use crate::snapshot::{ResourceEvent, ResourceSnapshot};

/// Everything a diagnosis is computed from. Value snapshots only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticInput {
    pub snapshot: ResourceSnapshot,
    pub events: Vec<ResourceEvent>,
    /// Absent when no scheduler is attached.
    pub scheduler: Option<SchedulerStatus>,
    pub recent_tasks: Option<Vec<TaskSummary>>,
    pub host: HostInfo,
    pub ts: u64,
}

/// Run every rule set in a fixed order: cpu, memory, gpu, disk, scheduler,
/// tiers, patterns.
pub fn run_all(input: &DiagnosticInput) -> Vec<Finding> {
    let mut findings = Vec::new();
    findings.extend(cpu::diagnose(&input.snapshot, &input.events));
    findings.extend(memory::diagnose(&input.snapshot, &input.events));
    findings.extend(gpu::diagnose(&input.snapshot));
    findings.extend(disk::diagnose(&input.snapshot));
    if let Some(status) = &input.scheduler {
        findings.extend(scheduler::diagnose(status));
    }
    if let Some(tasks) = &input.recent_tasks {
        findings.extend(tiers::diagnose(tasks));
    }
    findings.extend(patterns::diagnose(&input.events));
    findings
}
