use crate::finding::{Category, Effort, Finding, Fix, Severity};
use crate::snapshot::{ResourceEvent, ResourceType};

pub const MIN_EVENTS: usize = 5;
pub const RECURRING_THRESHOLD: usize = 3;

fn category_for(resource: ResourceType) -> Category {
    match resource {
        ResourceType::Cpu => Category::CpuSaturation,
        ResourceType::Ram => Category::RamPressure,
        ResourceType::Gpu => Category::GpuOveruse,
        ResourceType::Disk => Category::DiskIo,
    }
}

/// Flag resource types with repeated critical events in the recent window.
pub fn diagnose(events: &[ResourceEvent]) -> Vec<Finding> {
    if events.len() < MIN_EVENTS {
        return Vec::new();
    }

    // First-seen order keeps the output deterministic.
    let mut counts: Vec<(ResourceType, usize)> = Vec::new();
    for event in events.iter().filter(|e| e.is_critical()) {
        match counts.iter_mut().find(|(t, _)| *t == event.resource_type) {
            Some((_, n)) => *n += 1,
            None => counts.push((event.resource_type, 1)),
        }
    }

    counts
        .into_iter()
        .filter(|(_, n)| *n >= RECURRING_THRESHOLD)
        .map(|(resource, n)| {
            Finding::new(
                category_for(resource),
                Severity::High,
                format!("Recurring {resource} critical events"),
                format!(
                    "{n} critical {resource} events in recent history. This is a persistent condition, not a one-off spike."
                ),
                vec![
                    Fix::new(
                        format!("Tighten the resource policy for {resource}"),
                        "Stops the crises from recurring",
                    )
                    .effort(Effort::Medium),
                    Fix::new(
                        "Add capacity or move work to remote workers",
                        "Structural fix",
                    )
                    .effort(Effort::High),
                ],
            )
        })
        .collect()
}
