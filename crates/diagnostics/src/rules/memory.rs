use crate::finding::{Category, ConfigChange, Effort, Finding, Fix, Severity};
use crate::snapshot::{Contributor, ResourceEvent, ResourceSnapshot, ResourceType};

pub const CRITICAL_PERCENT: f64 = 85.0;
pub const ELEVATED_PERCENT: f64 = 70.0;
const TOP_CONTRIBUTORS: usize = 5;

fn top_contributors(events: &[ResourceEvent]) -> Vec<&Contributor> {
    let mut all: Vec<&Contributor> = events
        .iter()
        .filter(|e| e.resource_type == ResourceType::Ram)
        .flat_map(|e| e.contributors.iter())
        .collect();
    all.sort_by(|a, b| b.ram_mb.total_cmp(&a.ram_mb));
    all.truncate(TOP_CONTRIBUTORS);
    all
}

pub fn diagnose(snapshot: &ResourceSnapshot, events: &[ResourceEvent]) -> Vec<Finding> {
    let Some(ram) = &snapshot.ram else {
        return Vec::new();
    };
    let pct = ram.current_percent;

    if pct >= CRITICAL_PERCENT {
        let top = top_contributors(events);
        let consumers = if top.is_empty() {
            "No contributor breakdown available".to_string()
        } else {
            let names: Vec<String> = top
                .iter()
                .map(|c| format!("{} ({}MB)", c.description, c.ram_mb))
                .collect();
            format!("Largest consumers: {}", names.join(", "))
        };
        vec![Finding::new(
            Category::RamPressure,
            Severity::Critical,
            "RAM critical, out-of-memory risk",
            format!(
                "RAM is at {pct}% ({}MB of {}MB). {consumers}. The host may start swapping or killing processes.",
                ram.absolute_value, ram.capacity
            ),
            vec![
                Fix::new(
                    "Turn on safe mode to stop non-essential work",
                    "Immediate memory relief",
                )
                .immediate()
                .config(ConfigChange::safe_mode(true)),
                Fix::new(
                    "Release cached model and response buffers",
                    "Reclaims process memory",
                )
                .immediate(),
                Fix::new(
                    "Set training concurrency to 0",
                    "Training jobs hold the most memory",
                )
                .immediate()
                .config(ConfigChange::concurrency("training", 0)),
                Fix::new(
                    "Close unrelated desktop applications on the host",
                    "Frees memory outside the gateway",
                ),
                Fix::new(
                    "Cache repeated large computations with TTLs instead of holding them in memory",
                    "Lower steady-state memory",
                )
                .effort(Effort::High),
            ],
        )]
    } else if pct >= ELEVATED_PERCENT {
        vec![Finding::new(
            Category::RamPressure,
            Severity::Medium,
            "RAM elevated",
            format!(
                "RAM is at {pct}% ({}MB of {}MB), past the soft limit.",
                ram.absolute_value, ram.capacity
            ),
            vec![
                Fix::new("Lower batch concurrency", "Each concurrent task holds memory").immediate(),
                Fix::new(
                    "Cap memory per worker request",
                    "Stops runaway allocations",
                )
                .effort(Effort::Medium),
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
            ram: Some(ResourceReading {
                current_percent: pct,
                absolute_value: 14_000.0,
                capacity: 16_000.0,
                unit: Some("MB".into()),
            }),
            ..ResourceSnapshot::default()
        }
    }

    fn ram_event(contributors: &[(&str, f64)]) -> ResourceEvent {
        let mut ev = ResourceEvent::new(ResourceType::Ram, EventSeverity::Critical);
        ev.contributors = contributors
            .iter()
            .map(|(d, mb)| Contributor {
                description: d.to_string(),
                ram_mb: *mb,
            })
            .collect();
        ev
    }

    #[test]
    fn critical_lists_top_five_contributors_by_size() {
        let events = vec![
            ram_event(&[("a", 100.0), ("b", 900.0), ("c", 300.0)]),
            ram_event(&[("d", 50.0), ("e", 700.0), ("f", 10.0)]),
        ];
        let findings = diagnose(&snap(88.0), &events);
        assert_eq!(findings[0].severity, Severity::Critical);
        let desc = &findings[0].description;
        assert!(desc.contains("b (900MB), e (700MB), c (300MB), a (100MB), d (50MB)"));
        assert!(!desc.contains("f (10MB)"));
        assert_eq!(
            findings[0].fixes[2].config_change,
            Some(ConfigChange::concurrency("training", 0))
        );
    }

    #[test]
    fn critical_without_contributors_still_reports() {
        let findings = diagnose(&snap(95.0), &[]);
        assert!(findings[0].description.contains("No contributor breakdown"));
    }

    #[test]
    fn elevated_is_medium() {
        assert_eq!(diagnose(&snap(70.0), &[])[0].severity, Severity::Medium);
        assert!(diagnose(&snap(69.0), &[]).is_empty());
    }
}
