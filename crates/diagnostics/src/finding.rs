use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    CpuSaturation,
    RamPressure,
    GpuUnderuse,
    GpuOveruse,
    DiskIo,
    QueueBacklog,
    TierMismatch,
    SerialBottleneck,
    CacheMiss,
    DbContention,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CpuSaturation => "cpu_saturation",
            Self::RamPressure => "ram_pressure",
            Self::GpuUnderuse => "gpu_underuse",
            Self::GpuOveruse => "gpu_overuse",
            Self::DiskIo => "disk_io",
            Self::QueueBacklog => "queue_backlog",
            Self::TierMismatch => "tier_mismatch",
            Self::SerialBottleneck => "serial_bottleneck",
            Self::CacheMiss => "cache_miss",
            Self::DbContention => "db_contention",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Sort key: critical first.
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// Critical and high findings make a diagnosis not-ok.
    pub fn is_urgent(self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    #[default]
    Low,
    Medium,
    High,
}

/// Machine-actionable hint: the scheduler call that would apply a fix.
/// Diagnostics never executes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigChange {
    pub endpoint: String,
    pub body: Value,
}

impl ConfigChange {
    pub fn concurrency(task_class: &str, limit: usize) -> Self {
        Self {
            endpoint: "/api/scheduler/concurrency".to_string(),
            body: serde_json::json!({ "taskClass": task_class, "limit": limit }),
        }
    }

    pub fn safe_mode(enabled: bool) -> Self {
        Self {
            endpoint: "/api/scheduler/safe-mode".to_string(),
            body: serde_json::json!({ "enabled": enabled }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    /// `fix_<category>_<index>`, assigned when the finding is built.
    pub id: String,
    pub action: String,
    pub impact: String,
    pub effort: Effort,
    pub immediate: bool,
    pub config_change: Option<ConfigChange>,
}

impl Fix {
    pub fn new(action: impl Into<String>, impact: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            action: action.into(),
            impact: impact.into(),
            effort: Effort::Low,
            immediate: false,
            config_change: None,
        }
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    pub fn effort(mut self, effort: Effort) -> Self {
        self.effort = effort;
        self
    }

    pub fn config(mut self, change: ConfigChange) -> Self {
        self.config_change = Some(change);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub category: Category,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub fixes: Vec<Fix>,
}

impl Finding {
    pub fn new(
        category: Category,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
        fixes: Vec<Fix>,
    ) -> Self {
        let fixes = fixes
            .into_iter()
            .enumerate()
            .map(|(i, fix)| Fix {
                id: format!("fix_{}_{}", category, i),
                ..fix
            })
            .collect();
        Self {
            category,
            severity,
            title: title.into(),
            description: description.into(),
            fixes,
        }
    }
}

/// An immediate fix lifted out of a critical or high finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickWin {
    pub title: String,
    pub impact: String,
    pub severity: Severity,
    pub config_change: Option<ConfigChange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_ids_follow_category_and_position() {
        let finding = Finding::new(
            Category::QueueBacklog,
            Severity::High,
            "t",
            "d",
            vec![Fix::new("a", "b"), Fix::new("c", "d").immediate()],
        );
        assert_eq!(finding.fixes[0].id, "fix_queue_backlog_0");
        assert_eq!(finding.fixes[1].id, "fix_queue_backlog_1");
        assert!(finding.fixes[1].immediate);
    }

    #[test]
    fn fix_serializes_null_config_change() {
        let json = serde_json::to_value(Fix::new("a", "b")).unwrap();
        assert!(json["configChange"].is_null());
        assert_eq!(json["effort"], "low");
    }

    #[test]
    fn severity_rank_orders_critical_first() {
        assert!(Severity::Critical.rank() < Severity::High.rank());
        assert!(Severity::Medium.rank() < Severity::Low.rank());
        assert!(Severity::High.is_urgent());
        assert!(!Severity::Medium.is_urgent());
    }

    #[test]
    fn config_change_bodies() {
        let c = ConfigChange::concurrency("training", 0);
        assert_eq!(c.body["limit"], 0);
        assert_eq!(ConfigChange::safe_mode(true).body["enabled"], true);
    }
}
