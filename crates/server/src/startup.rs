//! Server startup: shared state construction and background task spawning.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use tiergate_core::Config;
use tiergate_diagnostics::{DiagnosticsEngine, ResourceMonitor};
use tiergate_scheduler::{spawn_mitigation_listener, MitigationSignal, RoutingTable, Scheduler};

use crate::state::AppState;

const MITIGATION_CHANNEL_CAPACITY: usize = 32;

/// Handles to the background loops started alongside the server.
pub struct Background {
    pub scheduler: JoinHandle<()>,
    pub mitigation: JoinHandle<()>,
}

/// Built-in routes merged with the overrides file, when one is configured.
pub fn load_routing(config: &Config) -> anyhow::Result<RoutingTable> {
    match &config.scheduler.routing_file {
        Some(path) => Ok(RoutingTable::builtin_with_overrides(path)?),
        None => Ok(RoutingTable::builtin()),
    }
}

/// Build `AppState` without starting anything.
pub fn build_app_state(
    config: Config,
    routing: RoutingTable,
    monitor: Option<Arc<dyn ResourceMonitor>>,
) -> Arc<AppState> {
    let scheduler = Scheduler::new(&config.scheduler, routing);

    let mut diagnostics =
        DiagnosticsEngine::new(config.diagnostics.clone()).with_scheduler(scheduler.clone());
    if let Some(monitor) = monitor {
        diagnostics = diagnostics.with_monitor(monitor);
    } else {
        info!("No resource monitor attached; diagnostics use host figures");
    }

    let (mitigation_tx, _) = broadcast::channel::<MitigationSignal>(MITIGATION_CHANNEL_CAPACITY);

    Arc::new(AppState {
        config,
        scheduler,
        diagnostics,
        mitigation_tx,
        started_at: Instant::now(),
    })
}

/// Start the scheduler run loop and the mitigation listener.
pub fn spawn_background(state: &AppState) -> Background {
    let scheduler = state.scheduler.start();
    let mitigation = spawn_mitigation_listener(
        state.scheduler.clone(),
        state.mitigation_tx.subscribe(),
    );
    info!("Scheduler run loop and mitigation listener started");
    Background {
        scheduler,
        mitigation,
    }
}
