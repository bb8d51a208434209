//! Resource readings and events as delivered by an external resource monitor.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// One utilisation reading. `absolute_value` and `capacity` share a unit
/// (MB for memory, GB for disk, cores for CPU).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceReading {
    pub current_percent: f64,
    pub absolute_value: f64,
    pub capacity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ResourceReading {
    pub fn percent(current_percent: f64) -> Self {
        Self {
            current_percent,
            ..Self::default()
        }
    }

    pub fn absolute(absolute_value: f64, capacity: f64, unit: &str) -> Self {
        let current_percent = if capacity > 0.0 {
            (absolute_value / capacity * 100.0).round()
        } else {
            0.0
        };
        Self {
            current_percent,
            absolute_value,
            capacity,
            unit: Some(unit.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GpuReading {
    pub compute: Option<ResourceReading>,
    pub vram: Option<ResourceReading>,
}

/// Point-in-time resource picture. Missing dimensions are skipped by the rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceSnapshot {
    pub cpu: Option<ResourceReading>,
    pub ram: Option<ResourceReading>,
    pub disk: Option<ResourceReading>,
    pub gpu: Option<GpuReading>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    #[serde(rename = "CPU", alias = "cpu")]
    Cpu,
    #[serde(rename = "RAM", alias = "ram")]
    Ram,
    #[serde(rename = "GPU", alias = "gpu")]
    Gpu,
    #[serde(rename = "DISK", alias = "disk")]
    Disk,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cpu => "CPU",
            Self::Ram => "RAM",
            Self::Gpu => "GPU",
            Self::Disk => "DISK",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventSeverity {
    #[serde(alias = "info")]
    Info,
    #[serde(alias = "warn", alias = "WARNING", alias = "warning")]
    Warn,
    #[serde(alias = "critical")]
    Critical,
}

/// A process or task the monitor blames for memory use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub description: String,
    #[serde(rename = "ramMB", default)]
    pub ram_mb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEvent {
    pub resource_type: ResourceType,
    pub severity: EventSeverity,
    #[serde(default)]
    pub contributors: Vec<Contributor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub ts: u64,
}

impl ResourceEvent {
    pub fn new(resource_type: ResourceType, severity: EventSeverity) -> Self {
        Self {
            resource_type,
            severity,
            contributors: Vec::new(),
            message: None,
            ts: 0,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == EventSeverity::Critical
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("resource monitor unavailable: {0}")]
    Unavailable(String),
}

/// Contract of the external resource monitor.
pub trait ResourceMonitor: Send + Sync {
    fn snapshot(&self) -> Result<ResourceSnapshot, MonitorError>;

    /// Most recent events, oldest first, at most `limit`.
    fn recent_events(&self, limit: usize) -> Result<Vec<ResourceEvent>, MonitorError>;
}

/// Monitor fed from the outside: a sampler pushes snapshots and events in,
/// diagnostics reads them back. Keeps a bounded event backlog.
#[derive(Debug)]
pub struct InMemoryMonitor {
    snapshot: RwLock<ResourceSnapshot>,
    events: RwLock<VecDeque<ResourceEvent>>,
    capacity: usize,
}

impl InMemoryMonitor {
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshot: RwLock::new(ResourceSnapshot::default()),
            events: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn set_snapshot(&self, snapshot: ResourceSnapshot) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    pub fn push_event(&self, event: ResourceEvent) {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        events.push_back(event);
        while events.len() > self.capacity {
            events.pop_front();
        }
    }
}

impl ResourceMonitor for InMemoryMonitor {
    fn snapshot(&self) -> Result<ResourceSnapshot, MonitorError> {
        Ok(self
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn recent_events(&self, limit: usize) -> Result<Vec<ResourceEvent>, MonitorError> {
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        let skip = events.len().saturating_sub(limit);
        Ok(events.iter().skip(skip).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_snapshot_parses() {
        let snap: ResourceSnapshot =
            serde_json::from_value(serde_json::json!({ "cpu": { "currentPercent": 92 } })).unwrap();
        assert_eq!(snap.cpu.unwrap().current_percent, 92.0);
        assert!(snap.ram.is_none());
        assert!(snap.gpu.is_none());
    }

    #[test]
    fn event_wire_format() {
        let ev: ResourceEvent = serde_json::from_value(serde_json::json!({
            "resourceType": "RAM",
            "severity": "CRITICAL",
            "contributors": [{ "description": "embedder", "ramMB": 2048 }]
        }))
        .unwrap();
        assert_eq!(ev.resource_type, ResourceType::Ram);
        assert!(ev.is_critical());
        assert_eq!(ev.contributors[0].ram_mb, 2048.0);
    }

    #[test]
    fn absolute_reading_derives_percent() {
        let r = ResourceReading::absolute(512.0, 1024.0, "MB");
        assert_eq!(r.current_percent, 50.0);
        assert_eq!(ResourceReading::absolute(1.0, 0.0, "GB").current_percent, 0.0);
    }

    #[test]
    fn in_memory_monitor_bounds_events() {
        let monitor = InMemoryMonitor::new(3);
        for _ in 0..5 {
            monitor.push_event(ResourceEvent::new(ResourceType::Cpu, EventSeverity::Warn));
        }
        monitor.push_event(ResourceEvent::new(ResourceType::Disk, EventSeverity::Critical));
        let events = monitor.recent_events(50).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events.last().unwrap().resource_type, ResourceType::Disk);
        assert_eq!(monitor.recent_events(1).unwrap().len(), 1);
    }
}
