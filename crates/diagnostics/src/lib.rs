//! Rule-based resource diagnostics.
//!
//! Reads a resource snapshot, recent resource events and the scheduler's
//! status, and turns them into severity-ranked findings with concrete fixes.
//! Evaluation is pure; [`DiagnosticsEngine`] only gathers inputs and caches
//! the last result.

pub mod engine;
pub mod evaluator;
pub mod finding;
pub mod profile;
pub mod rules;
pub mod snapshot;

pub use engine::DiagnosticsEngine;
pub use evaluator::{evaluate, Diagnosis};
pub use finding::{Category, ConfigChange, Effort, Finding, Fix, QuickWin, Severity};
pub use profile::{HostInfo, SystemProfile};
pub use rules::DiagnosticInput;
pub use snapshot::{
    Contributor, EventSeverity, GpuReading, InMemoryMonitor, MonitorError, ResourceEvent,
    ResourceMonitor, ResourceReading, ResourceSnapshot, ResourceType,
};
