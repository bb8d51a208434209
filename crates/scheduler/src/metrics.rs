use serde::{Deserialize, Serialize};

/// Cumulative scheduler counters exposed on the status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    pub total_queued: u64,
    pub total_started: u64,
    pub total_completed: u64,
    /// Terminal failures only; retried attempts are counted separately.
    pub total_failed: u64,
    pub total_retried: u64,
    pub total_cancelled: u64,
    pub avg_wait_ms: u64,
    pub avg_exec_ms: u64,
}

impl SchedulerStats {
    /// Count a successful completion and fold its timings into the averages.
    pub fn record_completion(&mut self, wait_ms: u64, exec_ms: u64) {
        self.total_completed += 1;
        let n = self.total_completed;
        self.avg_wait_ms = running_mean(self.avg_wait_ms, n, wait_ms);
        self.avg_exec_ms = running_mean(self.avg_exec_ms, n, exec_ms);
    }
}

/// `(avg * (n - 1) + x) / n`, rounded to the nearest whole millisecond.
fn running_mean(avg: u64, n: u64, x: u64) -> u64 {
    if n <= 1 {
        return x;
    }
    let prev = avg as f64 * (n - 1) as f64;
    ((prev + x as f64) / n as f64).round() as u64
}
