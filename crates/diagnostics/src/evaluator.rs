//! Pure evaluation: input snapshot in, sorted diagnosis out.

use serde::{Deserialize, Serialize};

use crate::finding::{Finding, QuickWin, Severity};
use crate::profile::SystemProfile;
use crate::rules::{self, DiagnosticInput};

/// At most this many quick wins are surfaced.
pub const MAX_QUICK_WINS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    /// True when nothing critical or high was found.
    pub ok: bool,
    pub total_findings: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub findings: Vec<Finding>,
    pub quick_wins: Vec<QuickWin>,
    pub system_profile: SystemProfile,
    #[serde(with = "tiergate_scheduler::clock::rfc3339_ms")]
    pub ts: u64,
}

pub fn evaluate(input: &DiagnosticInput) -> Diagnosis {
    let mut findings = rules::run_all(input);
    findings.sort_by_key(|f| f.severity.rank());

    let count = |s: Severity| findings.iter().filter(|f| f.severity == s).count();
    let (critical, high, medium, low) = (
        count(Severity::Critical),
        count(Severity::High),
        count(Severity::Medium),
        count(Severity::Low),
    );

    Diagnosis {
        ok: critical == 0 && high == 0,
        total_findings: findings.len(),
        critical,
        high,
        medium,
        low,
        quick_wins: quick_wins(&findings),
        system_profile: system_profile(input),
        findings,
        ts: input.ts,
    }
}

/// Immediate fixes of urgent findings, in finding order.
pub fn quick_wins(findings: &[Finding]) -> Vec<QuickWin> {
    findings
        .iter()
        .filter(|f| f.severity.is_urgent())
        .flat_map(|f| {
            f.fixes.iter().filter(|fix| fix.immediate).map(|fix| QuickWin {
                title: fix.action.clone(),
                impact: fix.impact.clone(),
                severity: f.severity,
                config_change: fix.config_change.clone(),
            })
        })
        .take(MAX_QUICK_WINS)
        .collect()
}

pub fn system_profile(input: &DiagnosticInput) -> SystemProfile {
    SystemProfile {
        host: input.host.clone(),
        gpu_available: input.snapshot.gpu.is_some(),
        scheduler_active: input.scheduler.is_some(),
        safe_mode_active: input
            .scheduler
            .as_ref()
            .is_some_and(|s| s.safe_mode_active),
    }
}
