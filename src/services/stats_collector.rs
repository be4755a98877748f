use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use sysinfo::{Disk, Disks, Networks, Pid, ProcessStatus, ProcessesToUpdate, System, Users};

use crate::models::{Process, ProcessState, Snapshot, SystemStats};
use crate::services::backend::ProcessBackend;
use crate::services::BackendError;

struct Collector {
    system: System,
    networks: Networks,
    disks: Disks,
    users: Users,
    /// (sampled at, total rx, total tx) of the previous refresh
    last_network: (Instant, u64, u64),
}

/// `ProcessBackend` backed by `sysinfo`; blocking collection runs on the
/// blocking thread pool.
pub struct StatsCollector {
    inner: Arc<Mutex<Collector>>,
}

impl StatsCollector {
    pub fn new() -> Self {
        let system = System::new_all();
        let networks = Networks::new_with_refreshed_list();
        let (rx, tx) = network_totals(&networks);

        Self {
            inner: Arc::new(Mutex::new(Collector {
                system,
                networks,
                disks: Disks::new_with_refreshed_list(),
                users: Users::new_with_refreshed_list(),
                last_network: (Instant::now(), rx, tx),
            })),
        }
    }

    async fn with_collector<T, F>(&self, f: F) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Collector) -> T + Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let mut collector = inner
                .lock()
                .map_err(|_| BackendError::Unavailable("collector lock poisoned".to_string()))?;
            Ok(f(&mut collector))
        })
        .await
        .map_err(|e| BackendError::Unavailable(format!("collector task failed: {}", e)))?
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessBackend for StatsCollector {
    async fn get_processes(&self) -> Result<Snapshot, BackendError> {
        let snapshot = self.with_collector(|c| c.snapshot()).await?;
        if snapshot.processes.is_empty() {
            // even a sandboxed reader sees itself
            return Err(BackendError::Permission(
                "no processes visible to this user".to_string(),
            ));
        }
        Ok(snapshot)
    }

    async fn kill_process(&self, pid: u32) -> Result<bool, BackendError> {
        self.with_collector(move |c| {
            let sysinfo_pid = Pid::from_u32(pid);
            c.system
                .refresh_processes(ProcessesToUpdate::Some(&[sysinfo_pid]), true);
            c.system
                .process(sysinfo_pid)
                .map(|process| process.kill())
                .unwrap_or(false)
        })
        .await
    }
}

impl Collector {
    fn snapshot(&mut self) -> Snapshot {
        self.system.refresh_processes(ProcessesToUpdate::All, true);
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        self.networks.refresh(true);
        self.disks.refresh(true);
        self.users.refresh();

        let processes = self.collect_processes();
        let stats = self.collect_stats();
        log::debug!("Collected {} processes", processes.len());

        Snapshot::new(processes, stats)
    }

    fn collect_processes(&self) -> Vec<Process> {
        self.system
            .processes()
            .iter()
            .map(|(pid, process)| {
                let user = process
                    .user_id()
                    .and_then(|uid| self.users.get_user_by_id(uid))
                    .map(|u| u.name().to_string())
                    .unwrap_or_else(|| "-".to_string());

                let command = process
                    .cmd()
                    .iter()
                    .map(|s| s.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" ");

                let disk = process.disk_usage();

                Process {
                    pid: pid.as_u32(),
                    ppid: process.parent().map(|p| p.as_u32()).unwrap_or(0),
                    session_id: process.session_id().map(|s| s.as_u32()),
                    name: process.name().to_string_lossy().into_owned(),
                    command,
                    user,
                    status: state_of(process.status()),
                    cpu_usage: process.cpu_usage(),
                    memory_usage: process.memory(),
                    virtual_memory: process.virtual_memory(),
                    disk_usage: (disk.read_bytes, disk.written_bytes),
                    start_time: process.start_time(),
                    run_time: process.run_time(),
                    environ: process
                        .environ()
                        .iter()
                        .map(|e| e.to_string_lossy().into_owned())
                        .collect(),
                    root: process
                        .root()
                        .map(|r| r.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    threads: process.tasks().map(|t| t.len() as u32),
                }
            })
            .collect()
    }

    fn collect_stats(&mut self) -> SystemStats {
        let (rx_rate, tx_rate) = self.network_rates();
        let (disk_total, disk_used, disk_free) = disk_usage(self.disks.list());

        let total = self.system.total_memory();
        let used = self.system.used_memory();
        let free = self.system.free_memory();
        let load = System::load_average();

        SystemStats {
            cpu_usage: self.system.cpus().iter().map(|cpu| cpu.cpu_usage()).collect(),
            memory_total: total,
            memory_used: used,
            memory_free: free,
            memory_cached: self.system.available_memory().saturating_sub(free),
            uptime: System::uptime(),
            load_avg: [load.one, load.five, load.fifteen],
            network_rx_bytes: rx_rate,
            network_tx_bytes: tx_rate,
            disk_total_bytes: disk_total,
            disk_used_bytes: disk_used,
            disk_free_bytes: disk_free,
        }
    }

    fn network_rates(&mut self) -> (u64, u64) {
        let (rx, tx) = network_totals(&self.networks);
        let (at, last_rx, last_tx) = self.last_network;
        let elapsed = at.elapsed().as_secs_f64();
        self.last_network = (Instant::now(), rx, tx);

        if elapsed <= 0.0 {
            return (0, 0);
        }
        (
            (rx.saturating_sub(last_rx) as f64 / elapsed) as u64,
            (tx.saturating_sub(last_tx) as f64 / elapsed) as u64,
        )
    }
}

fn network_totals(networks: &Networks) -> (u64, u64) {
    networks.list().values().fold((0, 0), |(rx, tx), data| {
        (rx + data.total_received(), tx + data.total_transmitted())
    })
}

/// (total, used, free) of the root filesystem, or every disk on Windows
fn disk_usage(disks: &[Disk]) -> (u64, u64, u64) {
    disks
        .iter()
        .filter(|disk| cfg!(target_os = "windows") || disk.mount_point() == Path::new("/"))
        .fold((0, 0, 0), |(total, used, free), disk| {
            let available = disk.available_space();
            (
                total + disk.total_space(),
                used + disk.total_space().saturating_sub(available),
                free + available,
            )
        })
}

fn state_of(status: ProcessStatus) -> ProcessState {
    match status {
        ProcessStatus::Run => ProcessState::Running,
        ProcessStatus::Sleep => ProcessState::Sleeping,
        ProcessStatus::Idle => ProcessState::Idle,
        ProcessStatus::UninterruptibleDiskSleep => ProcessState::DiskSleep,
        ProcessStatus::Zombie => ProcessState::Zombie,
        ProcessStatus::Stop | ProcessStatus::Tracing => ProcessState::Stopped,
        ProcessStatus::Dead => ProcessState::Dead,
        _ => ProcessState::Unknown,
    }
}
