use crate::finding::{Category, Effort, Finding, Fix, Severity};
use crate::snapshot::ResourceSnapshot;

pub const FULL_PERCENT: f64 = 90.0;

pub fn diagnose(snapshot: &ResourceSnapshot) -> Vec<Finding> {
    let Some(disk) = &snapshot.disk else {
        return Vec::new();
    };
    // Zero capacity means the monitor could not measure the disk.
    if disk.capacity == 0.0 || disk.current_percent < FULL_PERCENT {
        return Vec::new();
    }
    vec![Finding::new(
        Category::DiskIo,
        Severity::High,
        "Disk nearly full",
        format!(
            "Disk is at {}% ({}GB of {}GB). Builds, logs and database writes will start failing.",
            disk.current_percent, disk.absolute_value, disk.capacity
        ),
        vec![
            Fix::new("Remove build artifacts and old logs", "Immediate space relief").immediate(),
            Fix::new("Rotate and compress logs", "Slows future growth"),
            Fix::new("Move large datasets to external or cloud storage", "Lasting space relief")
                .effort(Effort::High),
        ],
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ResourceReading;

    fn disk(pct: f64, capacity: f64) -> ResourceSnapshot {
        ResourceSnapshot {
            disk: Some(ResourceReading {
                current_percent: pct,
                absolute_value: capacity * pct / 100.0,
                capacity,
                unit: Some("GB".into()),
            }),
            ..ResourceSnapshot::default()
        }
    }

    #[test]
    fn full_disk_is_high() {
        let findings = diagnose(&disk(93.0, 500.0));
        assert_eq!(findings[0].severity, Severity::High);
        assert!(findings[0].fixes[0].immediate);
    }

    #[test]
    fn unknown_capacity_is_skipped() {
        assert!(diagnose(&disk(99.0, 0.0)).is_empty());
        assert!(diagnose(&disk(50.0, 500.0)).is_empty());
    }
}
