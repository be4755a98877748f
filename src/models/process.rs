use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheduler state of a process, serialised as its single-letter code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProcessState {
    #[serde(rename = "R")]
    Running,
    #[serde(rename = "S")]
    Sleeping,
    #[serde(rename = "I")]
    Idle,
    #[serde(rename = "D")]
    DiskSleep,
    #[serde(rename = "Z")]
    Zombie,
    #[serde(rename = "T")]
    Stopped,
    #[serde(rename = "X")]
    Dead,
    #[default]
    Unknown,
}

impl ProcessState {
    pub const ALL: [ProcessState; 8] = [
        ProcessState::Running,
        ProcessState::Sleeping,
        ProcessState::Idle,
        ProcessState::DiskSleep,
        ProcessState::Zombie,
        ProcessState::Stopped,
        ProcessState::Dead,
        ProcessState::Unknown,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ProcessState::Running => "R",
            ProcessState::Sleeping => "S",
            ProcessState::Idle => "I",
            ProcessState::DiskSleep => "D",
            ProcessState::Zombie => "Z",
            ProcessState::Stopped => "T",
            ProcessState::Dead => "X",
            ProcessState::Unknown => "Unknown",
        }
    }

    /// Lower-case name accepted by the status filter (`"running"`, ...)
    pub fn label(&self) -> &'static str {
        match self {
            ProcessState::Running => "running",
            ProcessState::Sleeping => "sleeping",
            ProcessState::Idle => "idle",
            ProcessState::DiskSleep => "disk-sleep",
            ProcessState::Zombie => "zombie",
            ProcessState::Stopped => "stopped",
            ProcessState::Dead => "dead",
            ProcessState::Unknown => "unknown",
        }
    }

    /// Resolves either a code (`"R"`) or a label (`"running"`), ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.code().eq_ignore_ascii_case(name) || s.label().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One process as seen in a single snapshot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Process {
    /// Process ID; identity key for kill and detail lookups
    pub pid: u32,
    /// Parent process ID (0 when unknown)
    pub ppid: u32,
    /// Session ID, where the platform reports one
    #[serde(default)]
    pub session_id: Option<u32>,
    pub name: String,
    /// Full command line; identity key for pinning
    pub command: String,
    /// Owning user name, `-` when it cannot be resolved
    pub user: String,
    pub status: ProcessState,
    /// CPU usage in percent (may exceed 100 on multi-core machines)
    pub cpu_usage: f32,
    /// Resident memory in bytes
    pub memory_usage: u64,
    /// Virtual memory in bytes
    pub virtual_memory: u64,
    /// (read bytes, written bytes)
    pub disk_usage: (u64, u64),
    /// Start time, Unix seconds
    pub start_time: u64,
    /// Elapsed running time in seconds
    pub run_time: u64,
    #[serde(default)]
    pub environ: Vec<String>,
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub threads: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_resolves_codes_and_labels() {
        assert_eq!(ProcessState::from_name("R"), Some(ProcessState::Running));
        assert_eq!(ProcessState::from_name("running"), Some(ProcessState::Running));
        assert_eq!(ProcessState::from_name(" Sleeping "), Some(ProcessState::Sleeping));
        assert_eq!(ProcessState::from_name("unknown"), Some(ProcessState::Unknown));
        assert_eq!(ProcessState::from_name("bogus"), None);
    }

    #[test]
    fn status_serialises_as_code() {
        let json = serde_json::to_string(&ProcessState::Zombie).unwrap();
        assert_eq!(json, "\"Z\"");

        let parsed: ProcessState = serde_json::from_str("\"T\"").unwrap();
        assert_eq!(parsed, ProcessState::Stopped);
    }
}
