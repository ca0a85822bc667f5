//! Host metrics reported by the health endpoint

use serde::{Deserialize, Serialize};
use sysinfo::System;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Host metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostMetrics {
    /// Memory in use, in megabytes
    pub memory_used_mb: u64,

    /// Total memory, in megabytes
    pub memory_total_mb: u64,

    /// Hostname
    pub hostname: String,
}

/// Collect host metrics
pub fn collect_metrics() -> HostMetrics {
    let mut sys = System::new();
    sys.refresh_memory();

    HostMetrics {
        memory_used_mb: sys.used_memory() / BYTES_PER_MB,
        memory_total_mb: sys.total_memory() / BYTES_PER_MB,
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
    }
}
