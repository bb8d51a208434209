use crate::finding::{Category, ConfigChange, Effort, Finding, Fix, Severity};
use crate::snapshot::{ResourceEvent, ResourceSnapshot, ResourceType};

pub const CRITICAL_PERCENT: f64 = 90.0;
pub const ELEVATED_PERCENT: f64 = 75.0;

pub fn diagnose(snapshot: &ResourceSnapshot, events: &[ResourceEvent]) -> Vec<Finding> {
    let Some(cpu) = &snapshot.cpu else {
        return Vec::new();
    };
    let pct = cpu.current_percent;

    if pct >= CRITICAL_PERCENT {
        let critical_events = events
            .iter()
            .filter(|e| e.resource_type == ResourceType::Cpu && e.is_critical())
            .count();
        vec![Finding::new(
            Category::CpuSaturation,
            Severity::Critical,
            "CPU saturated",
            format!(
                "CPU is at {pct}% across {} cores, with {critical_events} critical CPU events in recent history. Interactive work will stall.",
                cpu.capacity
            ),
            vec![
                Fix::new(
                    "Pause background and training jobs now",
                    "Returns CPU time to interactive tasks",
                )
                .immediate(),
                Fix::new(
                    "Drop batch concurrency to 1",
                    "Less contention and context switching",
                )
                .immediate()
                .config(ConfigChange::concurrency("batch", 1)),
                Fix::new(
                    "Schedule heavy evaluation and simulation runs off-peak",
                    "Keeps spikes away from active hours",
                )
                .effort(Effort::Medium),
                Fix::new(
                    "Turn on safe mode to stop non-essential work",
                    "Largest immediate CPU relief",
                )
                .immediate()
                .config(ConfigChange::safe_mode(true)),
            ],
        )]
    } else if pct >= ELEVATED_PERCENT {
        vec![Finding::new(
            Category::CpuSaturation,
            Severity::Medium,
            "CPU under pressure",
            format!(
                "CPU is at {pct}%, near the soft limit. Background work may be competing with interactive requests."
            ),
            vec![
                Fix::new("Drop batch concurrency to 1", "Frees headroom for interactive tasks")
                    .immediate()
                    .config(ConfigChange::concurrency("batch", 1)),
                Fix::new(
                    "Route non-critical work to S-tier models",
                    "Less compute per task",
                ),
            ],
        )]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{EventSeverity, ResourceReading};

    fn snap(pct: f64) -> ResourceSnapshot {
        ResourceSnapshot {
            cpu: Some(ResourceReading {
                current_percent: pct,
                capacity: 8.0,
                ..ResourceReading::default()
            }),
            ..ResourceSnapshot::default()
        }
    }

    #[test]
    fn saturated_cpu_is_critical_and_cites_events() {
        let events = vec![
            ResourceEvent::new(ResourceType::Cpu, EventSeverity::Critical),
            ResourceEvent::new(ResourceType::Cpu, EventSeverity::Warn),
            ResourceEvent::new(ResourceType::Ram, EventSeverity::Critical),
        ];
        let findings = diagnose(&snap(92.0), &events);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert!(findings[0].description.contains("92%"));
        assert!(findings[0].description.contains("1 critical CPU events"));
        assert!(findings[0].fixes.iter().any(|f| f.immediate));
    }

    #[test]
    fn elevated_cpu_is_medium() {
        let findings = diagnose(&snap(75.0), &[]);
        assert_eq!(findings[0].severity, Severity::Medium);
    }

    #[test]
    fn healthy_or_missing_cpu_is_silent() {
        assert!(diagnose(&snap(74.9), &[]).is_empty());
        assert!(diagnose(&ResourceSnapshot::default(), &[]).is_empty());
    }
}
