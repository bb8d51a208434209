//! Host facts via `sysinfo`, used for the system profile and for the
//! fallback snapshot when no resource monitor is attached.

use serde::{Deserialize, Serialize};
use sysinfo::{CpuRefreshKind, ProcessesToUpdate, System};

use crate::snapshot::{ResourceReading, ResourceSnapshot};

const MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostInfo {
    pub platform: String,
    pub arch: String,
    pub cpu_cores: usize,
    pub cpu_model: String,
    #[serde(rename = "totalMemMB")]
    pub total_mem_mb: u64,
    #[serde(rename = "freeMemMB")]
    pub free_mem_mb: u64,
    #[serde(rename = "processMemoryMB")]
    pub process_memory_mb: u64,
    #[serde(rename = "processVirtualMB")]
    pub process_virtual_mb: u64,
    /// Process uptime in seconds.
    pub uptime: u64,
}

impl HostInfo {
    /// Read the current host and process figures.
    ///
    /// Refreshes memory, the CPU list and this process only; a full process
    /// table scan is never done.
    pub fn probe() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_list(CpuRefreshKind::nothing());
        let pid = sysinfo::get_current_pid().ok();
        if let Some(pid) = pid {
            sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), false);
        }
        let (process_memory_mb, process_virtual_mb, uptime) = pid
            .and_then(|pid| sys.process(pid))
            .map(|p| (p.memory() / MB, p.virtual_memory() / MB, p.run_time()))
            .unwrap_or_default();
        Self {
            platform: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_cores: sys.cpus().len(),
            cpu_model: sys
                .cpus()
                .first()
                .map(|c| c.brand().trim().to_string())
                .unwrap_or_default(),
            total_mem_mb: sys.total_memory() / MB,
            free_mem_mb: sys.available_memory() / MB,
            process_memory_mb,
            process_virtual_mb,
            uptime,
        }
    }

    /// Snapshot built from locally observable figures: CPU at 0% with the
    /// core count as capacity, RAM from host totals, no disk, no GPU.
    pub fn fallback_snapshot(&self) -> ResourceSnapshot {
        let used_mb = self.total_mem_mb.saturating_sub(self.free_mem_mb);
        ResourceSnapshot {
            cpu: Some(ResourceReading {
                current_percent: 0.0,
                absolute_value: 0.0,
                capacity: self.cpu_cores as f64,
                unit: Some("cores".to_string()),
            }),
            ram: Some(ResourceReading::absolute(
                used_mb as f64,
                self.total_mem_mb as f64,
                "MB",
            )),
            disk: Some(ResourceReading {
                unit: Some("GB".to_string()),
                ..ResourceReading::default()
            }),
            gpu: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemProfile {
    #[serde(flatten)]
    pub host: HostInfo,
    pub gpu_available: bool,
    pub scheduler_active: bool,
    pub safe_mode_active: bool,
}
