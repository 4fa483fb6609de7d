//! Host metrics

use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sysinfo::{Disks, System};

/// Host metrics reported by `/health/metrics`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// Seconds since the daemon started
    pub uptime_secs: u64,

    /// Host uptime in seconds
    pub system_uptime_secs: u64,

    /// Memory usage in bytes
    pub memory_used: u64,

    /// Total memory in bytes
    pub memory_total: u64,

    pub memory_percent: f32,

    /// Used bytes on the disk holding the data directory
    pub disk_used: u64,

    pub disk_total: u64,

    pub disk_percent: f32,

    pub hostname: String,
}

/// Collect host metrics. Disk figures are taken from the mount holding
/// `data_dir`, or summed over all disks when no mount matches.
pub fn collect_metrics(started_at: Instant, data_dir: &Path) -> SystemMetrics {
    let mut sys = System::new();
    sys.refresh_memory();

    let disks = Disks::new_with_refreshed_list();
    let holding = disks
        .iter()
        .filter(|disk| data_dir.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len());

    let (disk_used, disk_total) = match holding {
        Some(disk) => (
            disk.total_space().saturating_sub(disk.available_space()),
            disk.total_space(),
        ),
        None => disks.iter().fold((0u64, 0u64), |(used, total), disk| {
            (
                used + disk.total_space().saturating_sub(disk.available_space()),
                total + disk.total_space(),
            )
        }),
    };

    let memory_used = sys.used_memory();
    let memory_total = sys.total_memory();

    SystemMetrics {
        uptime_secs: started_at.elapsed().as_secs(),
        system_uptime_secs: System::uptime(),
        memory_used,
        memory_total,
        memory_percent: percent(memory_used, memory_total),
        disk_used,
        disk_total,
        disk_percent: percent(disk_used, disk_total),
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
    }
}

fn percent(used: u64, total: u64) -> f32 {
    if total > 0 {
        (used as f32 / total as f32) * 100.0
    } else {
        0.0
    }
}
