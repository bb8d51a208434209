use tiergate_scheduler::SchedulerStatus;

use crate::finding::{Category, ConfigChange, Effort, Finding, Fix, Severity};

/// More queued tasks than this is a backlog.
pub const BACKLOG_THRESHOLD: usize = 10;
pub const SLOW_WAIT_MS: u64 = 5_000;

pub fn diagnose(status: &SchedulerStatus) -> Vec<Finding> {
    let mut findings = Vec::new();
    let queued = status.total_queued();

    if queued > BACKLOG_THRESHOLD {
        let q = &status.queues;
        findings.push(Finding::new(
            Category::QueueBacklog,
            Severity::High,
            "Large task backlog",
            format!(
                "{queued} tasks are queued ({} interactive, {} batch, {} training) with only {} running.",
                q.interactive.queued,
                q.batch.queued,
                q.training.queued,
                status.total_running()
            ),
            vec![
                Fix::new("Raise batch concurrency if the CPU has room", "Drains the queue faster")
                    .config(ConfigChange::concurrency("batch", 4)),
                Fix::new("Cancel low-priority queued tasks", "Less queue pressure").immediate(),
                Fix::new("Deduplicate identical submissions", "Fewer tasks overall")
                    .effort(Effort::Medium),
            ],
        ));
    }

    if status.stats.avg_wait_ms > SLOW_WAIT_MS {
        let secs = (status.stats.avg_wait_ms as f64 / 1000.0).round();
        findings.push(Finding::new(
            Category::SerialBottleneck,
            Severity::Medium,
            "High average wait",
            format!(
                "Tasks wait {secs}s on average before they start, which points at a serial bottleneck or too little concurrency."
            ),
            vec![
                Fix::new(
                    "Split independent subtasks so they can run in parallel",
                    "Shorter end-to-end time",
                )
                .effort(Effort::Medium),
                Fix::new("Submit independent work as parallel groups", "Better throughput"),
            ],
        ));
    }

    findings
}
