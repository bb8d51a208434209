use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use tiergate_core::config::DiagnosticsSettings;
use tiergate_scheduler::{Clock, Scheduler, SystemClock};

use crate::evaluator::{self, Diagnosis};
use crate::finding::QuickWin;
use crate::profile::{HostInfo, SystemProfile};
use crate::rules::DiagnosticInput;
use crate::snapshot::{ResourceEvent, ResourceMonitor, ResourceSnapshot};

type HostProbe = Arc<dyn Fn() -> HostInfo + Send + Sync>;

/// Collects inputs from the monitor and scheduler, evaluates them, and keeps
/// the last diagnosis around for cheap re-reads.
pub struct DiagnosticsEngine {
    monitor: Option<Arc<dyn ResourceMonitor>>,
    scheduler: Option<Scheduler>,
    settings: DiagnosticsSettings,
    host_probe: HostProbe,
    clock: Arc<dyn Clock>,
    last: RwLock<Option<Diagnosis>>,
}

impl DiagnosticsEngine {
    pub fn new(settings: DiagnosticsSettings) -> Self {
        Self {
            monitor: None,
            scheduler: None,
            settings,
            host_probe: Arc::new(HostInfo::probe),
            clock: Arc::new(SystemClock),
            last: RwLock::new(None),
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn ResourceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the `sysinfo` probe, mostly for tests.
    pub fn with_host_probe(mut self, probe: impl Fn() -> HostInfo + Send + Sync + 'static) -> Self {
        self.host_probe = Arc::new(probe);
        self
    }

    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Gather a value snapshot of everything the rules read. Monitor errors
    /// fall back to host figures; they never fail the diagnosis.
    pub fn collect_input(&self) -> DiagnosticInput {
        let host = (self.host_probe)();
        let (snapshot, events) = match &self.monitor {
            Some(monitor) => self.read_monitor(monitor.as_ref(), &host),
            None => (host.fallback_snapshot(), Vec::new()),
        };
        let (scheduler, recent_tasks) = match &self.scheduler {
            Some(s) => (Some(s.status()), Some(s.history(self.settings.history_sample))),
            None => (None, None),
        };
        DiagnosticInput {
            snapshot,
            events,
            scheduler,
            recent_tasks,
            host,
            ts: self.now(),
        }
    }

    fn read_monitor(
        &self,
        monitor: &dyn ResourceMonitor,
        host: &HostInfo,
    ) -> (ResourceSnapshot, Vec<ResourceEvent>) {
        let snapshot = monitor.snapshot().unwrap_or_else(|e| {
            warn!(error = %e, "resource snapshot unavailable, using host fallback");
            host.fallback_snapshot()
        });
        let events = monitor
            .recent_events(self.settings.event_window)
            .unwrap_or_else(|e| {
                warn!(error = %e, "resource events unavailable");
                Vec::new()
            });
        (snapshot, events)
    }

    /// Always recomputes and refreshes the cache.
    pub fn diagnose(&self) -> Diagnosis {
        let diagnosis = evaluator::evaluate(&self.collect_input());
        debug!(
            findings = diagnosis.total_findings,
            critical = diagnosis.critical,
            high = diagnosis.high,
            "diagnosis computed"
        );
        *self.last.write().unwrap_or_else(PoisonError::into_inner) = Some(diagnosis.clone());
        diagnosis
    }

    pub fn last_diagnosis(&self) -> Option<Diagnosis> {
        self.last.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// The cached diagnosis, or a fresh one when nothing has run yet.
    pub fn latest(&self) -> Diagnosis {
        match self.last_diagnosis() {
            Some(d) => d,
            None => self.diagnose(),
        }
    }

    pub fn quick_wins(&self) -> Vec<QuickWin> {
        self.latest().quick_wins
    }

    pub fn system_profile(&self) -> SystemProfile {
        self.latest().system_profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{Category, Severity};
    use crate::snapshot::{InMemoryMonitor, MonitorError, ResourceReading};
    use tiergate_scheduler::ManualClock;

    struct BrokenMonitor;

    impl ResourceMonitor for BrokenMonitor {
        fn snapshot(&self) -> Result<ResourceSnapshot, MonitorError> {
            Err(MonitorError::Unavailable("offline".into()))
        }

        fn recent_events(&self, _limit: usize) -> Result<Vec<ResourceEvent>, MonitorError> {
            Err(MonitorError::Unavailable("offline".into()))
        }
    }

    fn host() -> HostInfo {
        HostInfo {
            platform: "linux".into(),
            cpu_cores: 4,
            total_mem_mb: 8_000,
            free_mem_mb: 6_000,
            ..HostInfo::default()
        }
    }

    fn engine() -> DiagnosticsEngine {
        DiagnosticsEngine::new(DiagnosticsSettings::default())
            .with_host_probe(host)
            .with_clock(Arc::new(ManualClock::new(10_000)))
    }

    #[test]
    fn no_monitor_uses_fallback() {
        let d = engine().diagnose();
        assert_eq!(d.ts, 10_000);
        assert_eq!(d.system_profile.host.cpu_cores, 4);
        assert!(!d.system_profile.gpu_available);
        // 25% RAM, 0% CPU: only the missing GPU is reported
        assert_eq!(d.total_findings, 1);
        assert_eq!(d.findings[0].severity, Severity::Low);
        assert!(d.ok);
    }

    #[test]
    fn broken_monitor_never_fails() {
        let d = engine().with_monitor(Arc::new(BrokenMonitor)).diagnose();
        assert!(d.ok);
        assert_eq!(d.findings[0].category, Category::GpuUnderuse);
    }

    #[test]
    fn monitor_snapshot_is_used() {
        let monitor = Arc::new(InMemoryMonitor::new(50));
        monitor.set_snapshot(ResourceSnapshot {
            cpu: Some(ResourceReading::percent(92.0)),
            ..ResourceSnapshot::default()
        });
        let d = engine().with_monitor(monitor).diagnose();
        assert_eq!(d.findings[0].category, Category::CpuSaturation);
        assert!(!d.ok);
    }

    #[test]
    fn reads_use_cache_until_next_diagnose() {
        let monitor = Arc::new(InMemoryMonitor::new(50));
        let engine = engine().with_monitor(monitor.clone());
        assert!(engine.last_diagnosis().is_none());
        assert!(engine.quick_wins().is_empty());
        assert!(engine.last_diagnosis().is_some());

        monitor.set_snapshot(ResourceSnapshot {
            ram: Some(ResourceReading::percent(95.0)),
            ..ResourceSnapshot::default()
        });
        assert!(engine.quick_wins().is_empty());
        engine.diagnose();
        assert!(!engine.quick_wins().is_empty());
    }
}
