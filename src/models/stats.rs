use serde::{Deserialize, Serialize};

use crate::models::Process;

/// Machine-wide statistics, replaced wholesale on every refresh
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemStats {
    /// CPU usage per core (percent, 0-100)
    pub cpu_usage: Vec<f32>,

    /// Total physical memory (bytes)
    pub memory_total: u64,

    /// Used physical memory (bytes)
    pub memory_used: u64,

    /// Free physical memory (bytes)
    pub memory_free: u64,

    /// Reclaimable cache (bytes)
    pub memory_cached: u64,

    /// Uptime in seconds
    pub uptime: u64,

    /// 1, 5 and 15 minute load averages
    pub load_avg: [f64; 3],

    /// Network receive rate since the previous sample (bytes/s)
    pub network_rx_bytes: u64,

    /// Network transmit rate since the previous sample (bytes/s)
    pub network_tx_bytes: u64,

    pub disk_total_bytes: u64,
    pub disk_used_bytes: u64,
    pub disk_free_bytes: u64,
}

impl SystemStats {
    /// Average of the per-core readings
    pub fn average_cpu(&self) -> f32 {
        if self.cpu_usage.is_empty() {
            return 0.0;
        }
        self.cpu_usage.iter().sum::<f32>() / self.cpu_usage.len() as f32
    }
}

/// One atomic `(processes, stats)` pair as returned by the backend
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub processes: Vec<Process>,
    pub stats: SystemStats,
}

impl Snapshot {
    pub fn new(processes: Vec<Process>, stats: SystemStats) -> Self {
        Self { processes, stats }
    }

    pub fn find(&self, pid: u32) -> Option<&Process> {
        self.processes.iter().find(|p| p.pid == pid)
    }
}
