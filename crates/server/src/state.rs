use std::time::Instant;

use tokio::sync::broadcast;

use tiergate_core::Config;
use tiergate_diagnostics::DiagnosticsEngine;
use tiergate_scheduler::{MitigationSignal, Scheduler};

/// Shared state handed to every handler behind an `Arc`.
pub struct AppState {
    pub config: Config,
    pub scheduler: Scheduler,
    pub diagnostics: DiagnosticsEngine,
    /// Publish side of the mitigation channel. A resource monitor pushes
    /// signals here; the scheduler's listener applies them.
    pub mitigation_tx: broadcast::Sender<MitigationSignal>,
    pub started_at: Instant,
}
