use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::models::{Process, ProcessState};

/// Scalar process attributes the table can be ordered by.
///
/// `disk_usage` and `environ` are deliberately absent: they are not scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Pid,
    Ppid,
    SessionId,
    Name,
    Command,
    User,
    Status,
    Root,
    CpuUsage,
    MemoryUsage,
    VirtualMemory,
    StartTime,
    RunTime,
    Threads,
}

impl SortField {
    pub const ALL: [SortField; 14] = [
        SortField::Pid,
        SortField::Ppid,
        SortField::SessionId,
        SortField::Name,
        SortField::Command,
        SortField::User,
        SortField::Status,
        SortField::Root,
        SortField::CpuUsage,
        SortField::MemoryUsage,
        SortField::VirtualMemory,
        SortField::StartTime,
        SortField::RunTime,
        SortField::Threads,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Pid => "pid",
            SortField::Ppid => "ppid",
            SortField::SessionId => "session_id",
            SortField::Name => "name",
            SortField::Command => "command",
            SortField::User => "user",
            SortField::Status => "status",
            SortField::Root => "root",
            SortField::CpuUsage => "cpu_usage",
            SortField::MemoryUsage => "memory_usage",
            SortField::VirtualMemory => "virtual_memory",
            SortField::StartTime => "start_time",
            SortField::RunTime => "run_time",
            SortField::Threads => "threads",
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("'{}' is not a sortable column", s))
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            field: SortField::CpuUsage,
            direction: SortDirection::Desc,
        }
    }
}

impl SortConfig {
    /// Column header click: the active column flips, a new column starts descending
    pub fn toggle(&mut self, field: SortField) {
        if self.field == field {
            self.direction = self.direction.flipped();
        } else {
            self.field = field;
            self.direction = SortDirection::Desc;
        }
    }
}

/// Status filter, either everything or one status code
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Code(String),
}

impl StatusFilter {
    /// `"all"` keeps everything; known labels (`"running"`) are mapped to their
    /// code, anything else is kept verbatim and compared against codes.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            return StatusFilter::All;
        }
        match ProcessState::from_name(value) {
            Some(state) => StatusFilter::Code(state.code().to_string()),
            None => StatusFilter::Code(value.to_string()),
        }
    }

    /// Whether `value` names a filter that can match anything: `all`, a
    /// status label or a status code
    pub fn is_known(value: &str) -> bool {
        let value = value.trim();
        value.is_empty() || value.eq_ignore_ascii_case("all") || ProcessState::from_name(value).is_some()
    }

    pub fn matches(&self, process: &Process) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Code(code) => process.status.code().eq_ignore_ascii_case(code),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Code(code) => f.write_str(code),
        }
    }
}

/// Commands pinned to the top of the table.
///
/// Membership is keyed by command line, so a pin survives snapshot
/// replacement and re-applies when a matching process reappears.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PinSet {
    commands: BTreeSet<String>,
}

impl PinSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership and returns whether `command` is now pinned
    pub fn toggle(&mut self, command: &str) -> bool {
        if self.commands.remove(command) {
            false
        } else {
            self.commands.insert(command.to_string());
            true
        }
    }

    pub fn contains(&self, command: &str) -> bool {
        self.commands.contains(command)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PinSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            commands: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableRow {
    pub pinned: bool,
    #[serde(flatten)]
    pub process: Process,
}

/// One rendered page of the process table
#[derive(Debug, Clone, Serialize)]
pub struct TableView {
    pub rows: Vec<TableRow>,
    /// Number of processes left after filtering
    pub total_matching: usize,
    /// Number of processes in the snapshot
    pub total_processes: usize,
    /// 1-indexed page actually rendered (after clamping)
    pub page: usize,
    pub total_pages: usize,
    pub items_per_page: usize,
    pub sort: SortConfig,
    pub generation: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_then_resets_to_descending() {
        let mut sort = SortConfig::default();
        assert_eq!(sort.field, SortField::CpuUsage);
        assert_eq!(sort.direction, SortDirection::Desc);

        sort.toggle(SortField::CpuUsage);
        assert_eq!(sort.direction, SortDirection::Asc);

        sort.toggle(SortField::Name);
        assert_eq!(sort.field, SortField::Name);
        assert_eq!(sort.direction, SortDirection::Desc);
    }

    #[test]
    fn sort_field_parses_column_ids() {
        assert_eq!("memory_usage".parse::<SortField>(), Ok(SortField::MemoryUsage));
        assert!("disk_usage".parse::<SortField>().is_err());
    }

    #[test]
    fn status_filter_maps_labels_to_codes() {
        assert_eq!(StatusFilter::parse("All"), StatusFilter::All);
        assert_eq!(StatusFilter::parse("running"), StatusFilter::Code("R".into()));
        assert_eq!(StatusFilter::parse("s"), StatusFilter::Code("S".into()));

        let zombie = Process {
            status: ProcessState::Zombie,
            ..Default::default()
        };
        assert!(StatusFilter::parse("z").matches(&zombie));
        assert!(!StatusFilter::parse("running").matches(&zombie));
        assert!(!StatusFilter::parse("nonsense").matches(&zombie));
    }

    #[test]
    fn known_filters_are_all_labels_and_codes() {
        for value in ["all", "", "running", "Sleeping", "idle", "unknown", "R", "z", "T"] {
            assert!(StatusFilter::is_known(value), "{}", value);
        }
        assert!(!StatusFilter::is_known("bogus"));
        assert!(!StatusFilter::is_known("RS"));
    }

    #[test]
    fn pin_toggle_round_trips() {
        let mut pins = PinSet::new();
        assert!(pins.toggle("/usr/bin/top"));
        assert!(pins.contains("/usr/bin/top"));
        assert!(!pins.toggle("/usr/bin/top"));
        assert!(pins.is_empty());
    }
}
