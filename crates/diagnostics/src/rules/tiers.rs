use tiergate_scheduler::{ResourceTier, TaskStatus, TaskSummary};

use crate::finding::{Category, Finding, Fix, Severity};

/// Below this many recent tasks the sample is too small to judge.
pub const MIN_SAMPLE: usize = 5;
/// More than this many trivial tasks on tier L is a mismatch.
pub const TRIVIAL_ON_L_LIMIT: usize = 3;

pub const TRIVIAL_TYPES: [&str; 4] = ["classify", "route", "summarize", "documentation"];
pub const CRITICAL_TYPES: [&str; 2] = ["arena_evaluate", "security_scan"];

pub fn diagnose(recent: &[TaskSummary]) -> Vec<Finding> {
    if recent.len() < MIN_SAMPLE {
        return Vec::new();
    }
    let mut findings = Vec::new();

    let trivial_on_l: Vec<&TaskSummary> = recent
        .iter()
        .filter(|t| t.tier == ResourceTier::L && TRIVIAL_TYPES.contains(&t.task_type.as_str()))
        .collect();
    if trivial_on_l.len() > TRIVIAL_ON_L_LIMIT {
        let mut types: Vec<&str> = Vec::new();
        for t in &trivial_on_l {
            if !types.contains(&t.task_type.as_str()) {
                types.push(&t.task_type);
            }
        }
        findings.push(Finding::new(
            Category::TierMismatch,
            Severity::Medium,
            "Trivial tasks running on L tier",
            format!(
                "{} recent tasks of type [{}] ran on tier L; S or M is enough for them.",
                trivial_on_l.len(),
                types.join(", ")
            ),
            vec![
                Fix::new(
                    "Pin classify, route, summarize and documentation to tier S in the routing table",
                    "Large cost and resource savings",
                ),
                Fix::new(
                    "Review the routing overrides file for types lifted to L",
                    "Prevents future mis-routing",
                ),
            ],
        ));
    }

    let critical_failed_on_s = recent
        .iter()
        .filter(|t| {
            t.tier == ResourceTier::S
                && t.status == TaskStatus::Failed
                && CRITICAL_TYPES.contains(&t.task_type.as_str())
        })
        .count();
    if critical_failed_on_s > 0 {
        findings.push(Finding::new(
            Category::TierMismatch,
            Severity::High,
            "Critical tasks failing on S tier",
            format!(
                "{critical_failed_on_s} critical tasks (arena_evaluate, security_scan) failed on tier S and need a stronger tier."
            ),
            vec![Fix::new(
                "Route arena_evaluate and security_scan to tier M or above",
                "Avoids quality loss on critical work",
            )],
        ));
    }

    findings
}
