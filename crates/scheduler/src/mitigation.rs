//! Reaction to mitigation signals published by the resource monitor.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::runner::Scheduler;
use crate::types::TaskClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MitigationSignal {
    SafeModeActivated,
    BatchPaused,
    ConcurrencyLowered,
}

impl Scheduler {
    pub fn apply_mitigation(&self, signal: MitigationSignal) {
        info!(signal = ?signal, "Applying mitigation");
        match signal {
            MitigationSignal::SafeModeActivated => self.enter_safe_mode(),
            MitigationSignal::BatchPaused => self.adjust_concurrency(TaskClass::Batch, 1),
            MitigationSignal::ConcurrencyLowered => {
                self.adjust_concurrency(TaskClass::Batch, 1);
                self.adjust_concurrency(TaskClass::Training, 0);
            }
        }
    }
}

/// Forward every signal on `rx` to the scheduler until the sender side closes.
pub fn spawn_mitigation_listener(
    scheduler: Scheduler,
    mut rx: broadcast::Receiver<MitigationSignal>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(signal) => scheduler.apply_mitigation(signal),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Mitigation listener lagged; signals dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("Mitigation listener stopped");
    })
}
