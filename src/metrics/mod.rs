use lazy_static::lazy_static;
use prometheus::{
    register_gauge_with_registry, register_int_counter_vec_with_registry,
    register_int_gauge_with_registry, Encoder, Gauge, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::models::SystemStats;

pub struct MetricsRegistry {
    registry: Registry,

    // Gauge metrics
    pub snapshot_processes: IntGauge,
    pub snapshot_generation: IntGauge,
    pub last_refresh_timestamp: Gauge,
    pub pinned_commands: IntGauge,
    pub system_cpu_usage: Gauge,
    pub system_memory_used_bytes: Gauge,

    // Counter metrics
    pub refresh_total: IntCounterVec,
    pub kill_total: IntCounterVec,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let registry = Registry::new();

        let snapshot_processes = register_int_gauge_with_registry!(
            Opts::new("process_table_snapshot_processes", "Processes in the current snapshot"),
            registry
        )
        .expect("snapshot_processes registers");

        let snapshot_generation = register_int_gauge_with_registry!(
            Opts::new("process_table_snapshot_generation", "Number of snapshots applied so far"),
            registry
        )
        .expect("snapshot_generation registers");

        let last_refresh_timestamp = register_gauge_with_registry!(
            Opts::new(
                "process_table_last_refresh_timestamp_seconds",
                "Unix timestamp of the last applied snapshot"
            ),
            registry
        )
        .expect("last_refresh_timestamp registers");

        let pinned_commands = register_int_gauge_with_registry!(
            Opts::new("process_table_pinned_commands", "Commands currently pinned"),
            registry
        )
        .expect("pinned_commands registers");

        let system_cpu_usage = register_gauge_with_registry!(
            Opts::new("process_table_system_cpu_usage_percent", "Average CPU usage across cores"),
            registry
        )
        .expect("system_cpu_usage registers");

        let system_memory_used_bytes = register_gauge_with_registry!(
            Opts::new("process_table_system_memory_used_bytes", "Used physical memory"),
            registry
        )
        .expect("system_memory_used_bytes registers");

        // outcome: applied | failed | coalesced | frozen
        let refresh_total = register_int_counter_vec_with_registry!(
            Opts::new("process_table_refresh_total", "Refresh attempts by outcome"),
            &["outcome"],
            registry
        )
        .expect("refresh_total registers");

        // outcome: killed | refused | error
        let kill_total = register_int_counter_vec_with_registry!(
            Opts::new("process_table_kill_total", "Confirmed kills by outcome"),
            &["outcome"],
            registry
        )
        .expect("kill_total registers");

        #[cfg(target_os = "linux")]
        if let Err(e) = registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        )) {
            log::warn!("Failed to register self process collector: {}", e);
        }

        Self {
            registry,
            snapshot_processes,
            snapshot_generation,
            last_refresh_timestamp,
            pinned_commands,
            system_cpu_usage,
            system_memory_used_bytes,
            refresh_total,
            kill_total,
        }
    }

    pub fn record_snapshot(&self, generation: u64, processes: usize, stats: &SystemStats, at: u64) {
        self.refresh_total.with_label_values(&["applied"]).inc();
        self.snapshot_generation.set(generation as i64);
        self.snapshot_processes.set(processes as i64);
        self.last_refresh_timestamp.set(at as f64);
        self.system_cpu_usage.set(stats.average_cpu() as f64);
        self.system_memory_used_bytes.set(stats.memory_used as f64);
    }

    pub fn record_refresh(&self, outcome: &str) {
        self.refresh_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_kill(&self, outcome: &str) {
        self.kill_total.with_label_values(&[outcome]).inc();
    }

    pub fn render(&self) -> Result<String, Box<dyn std::error::Error>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    pub static ref METRICS: Arc<MetricsRegistry> = Arc::new(MetricsRegistry::new());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_recorded_values() {
        let metrics = MetricsRegistry::new();
        metrics.record_snapshot(3, 42, &SystemStats::default(), 1_700_000_000);
        metrics.record_kill("refused");

        let text = metrics.render().unwrap();
        assert!(text.contains("process_table_snapshot_processes 42"));
        assert!(text.contains("process_table_kill_total{outcome=\"refused\"} 1"));
        assert!(text.contains("process_table_refresh_total{outcome=\"applied\"} 1"));
    }
}
