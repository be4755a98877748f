use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, watch};

use crate::metrics::METRICS;
use crate::models::{
    PinSet, Process, SettingsError, Snapshot, SortConfig, SortField, StatusFilter, SystemStats,
    TableRow, TableSettings, TableView,
};
use crate::services::{sort_processes, FetchError, FilterEngine, KillError, ProcessBackend, SnapshotFetcher};

const EVENT_CAPACITY: usize = 64;

/// Kill confirmation workflow: `Idle -> ConfirmPending -> Killing -> Idle`
#[derive(Debug, Clone, Default, PartialEq)]
pub enum KillWorkflow {
    #[default]
    Idle,
    ConfirmPending(Process),
    Killing(Process),
}

impl KillWorkflow {
    pub fn process(&self) -> Option<&Process> {
        match self {
            KillWorkflow::Idle => None,
            KillWorkflow::ConfirmPending(p) | KillWorkflow::Killing(p) => Some(p),
        }
    }
}

/// Published after every successful state transition
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    SnapshotApplied { generation: u64, processes: usize },
    FetchFailed { message: String },
    SearchChanged { term: String },
    StatusFilterChanged { filter: String },
    PageChanged { page: usize },
    SortChanged(SortConfig),
    PinToggled { command: String, pinned: bool },
    FrozenChanged { frozen: bool },
    DetailsOpened { pid: u32 },
    DetailsClosed,
    KillRequested { pid: u32 },
    KillCancelled { pid: u32 },
    KillStarted { pid: u32 },
    KillFinished { pid: u32, success: bool },
    SettingsChanged(TableSettings),
}

#[derive(Debug)]
pub enum RefreshOutcome {
    Applied { generation: u64 },
    Failed(FetchError),
    /// Another fetch was in flight; it will be followed by one more fetch.
    Coalesced,
    Frozen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    Killed { pid: u32 },
    /// `handle_confirm_kill` was called without a pending confirmation
    NothingPending,
}

struct StoreState {
    snapshot: Arc<Snapshot>,
    generation: u64,
    error: Option<String>,
    is_loading: bool,
    search_term: String,
    status_filter: StatusFilter,
    current_page: usize,
    pins: PinSet,
    sort: SortConfig,
    selected_pid: Option<u32>,
    selected_process: Option<Process>,
    is_frozen: bool,
    kill: KillWorkflow,
    settings: TableSettings,
}

/// Read-only copy of the store for presentation
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub error: Option<String>,
    pub is_loading: bool,
    pub is_frozen: bool,
    pub search_term: String,
    pub status_filter: String,
    pub current_page: usize,
    pub sort: SortConfig,
    pub pinned: Vec<String>,
    pub selected_process_pid: Option<u32>,
    pub selected_process: Option<Process>,
    pub show_info_modal: bool,
    pub show_confirm_modal: bool,
    pub process_to_kill: Option<Process>,
    pub is_killing: bool,
    pub is_fetching: bool,
    pub generation: u64,
    pub settings: TableSettings,
}

/// The process table: current snapshot plus all view, selection and kill state.
///
/// Collaborators are injected, so independent stores can coexist. Every
/// mutation runs under one short lock and never across an await point.
pub struct ProcessTableStore {
    state: Mutex<StoreState>,
    backend: Arc<dyn ProcessBackend>,
    fetcher: SnapshotFetcher,
    filter: FilterEngine,
    events: broadcast::Sender<StoreEvent>,
    refresh_rate: watch::Sender<u64>,
}

pub type AppState = Arc<ProcessTableStore>;

pub fn new_state(backend: Arc<dyn ProcessBackend>, settings: TableSettings) -> AppState {
    Arc::new(ProcessTableStore::new(backend, settings))
}

impl ProcessTableStore {
    pub fn new(backend: Arc<dyn ProcessBackend>, settings: TableSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (refresh_rate, _) = watch::channel(settings.refresh_rate_ms);

        Self {
            state: Mutex::new(StoreState {
                snapshot: Arc::new(Snapshot::default()),
                generation: 0,
                error: None,
                is_loading: true,
                search_term: String::new(),
                status_filter: settings.status_filter(),
                current_page: 1,
                pins: PinSet::new(),
                sort: SortConfig::default(),
                selected_pid: None,
                selected_process: None,
                is_frozen: false,
                kill: KillWorkflow::Idle,
                settings,
            }),
            fetcher: SnapshotFetcher::new(backend.clone()),
            backend,
            filter: FilterEngine::new(),
            events,
            refresh_rate,
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: StoreEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn refresh_rate_updates(&self) -> watch::Receiver<u64> {
        self.refresh_rate.subscribe()
    }

    /// Fetches and applies a new snapshot, bypassing the refresh cadence.
    ///
    /// On failure the previous snapshot stays current and the error is
    /// recorded. If a fetch is already running the request is coalesced into
    /// one extra fetch after it. Should the running fetch be dropped before
    /// it finishes, the request stays pending and the next `tick` serves it,
    /// frozen or not.
    pub async fn get_processes(&self) -> RefreshOutcome {
        loop {
            let Some(permit) = self.fetcher.begin() else {
                METRICS.record_refresh("coalesced");
                return RefreshOutcome::Coalesced;
            };
            let result = permit.fetch().await;
            let outcome = self.apply_fetch(result);
            drop(permit);

            if !self.fetcher.take_pending() {
                return outcome;
            }
            log::debug!("Running refresh requested during previous fetch");
        }
    }

    /// One scheduled refresh tick; suppressed while frozen unless an earlier
    /// refresh request is still owed.
    pub async fn tick(&self) -> RefreshOutcome {
        if self.is_frozen() && !self.fetcher.is_pending() {
            METRICS.record_refresh("frozen");
            return RefreshOutcome::Frozen;
        }
        self.get_processes().await
    }

    fn apply_fetch(&self, result: Result<Snapshot, FetchError>) -> RefreshOutcome {
        let mut state = self.state();
        state.is_loading = false;

        match result {
            Ok(snapshot) => {
                state.generation += 1;
                let generation = state.generation;
                let processes = snapshot.processes.len();

                let selected = state.selected_pid.and_then(|pid| snapshot.find(pid).cloned());
                state.selected_process = selected;
                METRICS.record_snapshot(generation, processes, &snapshot.stats, unix_now());
                state.snapshot = Arc::new(snapshot);
                state.error = None;
                drop(state);

                log::debug!("Applied snapshot #{} with {} processes", generation, processes);
                self.emit(StoreEvent::SnapshotApplied { generation, processes });
                RefreshOutcome::Applied { generation }
            }
            Err(e) => {
                let message = e.to_string();
                state.error = Some(message.clone());
                drop(state);

                log::warn!("{}", message);
                METRICS.record_refresh("failed");
                self.emit(StoreEvent::FetchFailed { message });
                RefreshOutcome::Failed(e)
            }
        }
    }

    pub fn set_search_term(&self, term: &str) {
        {
            let mut state = self.state();
            state.search_term = term.to_string();
            state.current_page = 1;
        }
        self.emit(StoreEvent::SearchChanged { term: term.to_string() });
    }

    pub fn set_status_filter(&self, filter: &str) {
        let filter = StatusFilter::parse(filter);
        {
            let mut state = self.state();
            state.status_filter = filter.clone();
            state.current_page = 1;
        }
        self.emit(StoreEvent::StatusFilterChanged { filter: filter.to_string() });
    }

    /// Stores the requested page; it is clamped into range when the view is derived
    pub fn set_current_page(&self, page: usize) {
        let page = page.max(1);
        self.state().current_page = page;
        self.emit(StoreEvent::PageChanged { page });
    }

    pub fn toggle_sort(&self, field: SortField) -> SortConfig {
        let sort = {
            let mut state = self.state();
            state.sort.toggle(field);
            state.sort
        };
        self.emit(StoreEvent::SortChanged(sort));
        sort
    }

    /// Returns whether `command` is pinned afterwards
    pub fn toggle_pin(&self, command: &str) -> bool {
        let (pinned, count) = {
            let mut state = self.state();
            let pinned = state.pins.toggle(command);
            (pinned, state.pins.len())
        };
        METRICS.pinned_commands.set(count as i64);
        self.emit(StoreEvent::PinToggled {
            command: command.to_string(),
            pinned,
        });
        pinned
    }

    /// Pauses scheduled refreshes. A fetch already in flight still applies.
    pub fn set_frozen(&self, frozen: bool) {
        self.state().is_frozen = frozen;
        log::info!("Refresh {}", if frozen { "frozen" } else { "resumed" });
        self.emit(StoreEvent::FrozenChanged { frozen });
    }

    pub fn is_frozen(&self) -> bool {
        self.state().is_frozen
    }

    pub fn find_process(&self, pid: u32) -> Option<Process> {
        self.state().snapshot.find(pid).cloned()
    }

    pub fn system_stats(&self) -> Option<SystemStats> {
        let state = self.state();
        (state.generation > 0).then(|| state.snapshot.stats.clone())
    }

    pub fn show_process_details(&self, process: &Process) {
        {
            let mut state = self.state();
            state.selected_pid = Some(process.pid);
            state.selected_process = Some(process.clone());
        }
        self.emit(StoreEvent::DetailsOpened { pid: process.pid });
    }

    pub fn close_process_details(&self) {
        {
            let mut state = self.state();
            state.selected_pid = None;
            state.selected_process = None;
        }
        self.emit(StoreEvent::DetailsClosed);
    }

    pub fn selected_process(&self) -> Option<Process> {
        self.state().selected_process.clone()
    }

    /// `Idle -> ConfirmPending`. Picking another process while a confirmation
    /// is open retargets it; nothing changes while a kill is running.
    pub fn confirm_kill_process(&self, process: &Process) -> bool {
        {
            let mut state = self.state();
            if matches!(state.kill, KillWorkflow::Killing(_)) {
                return false;
            }
            state.kill = KillWorkflow::ConfirmPending(process.clone());
        }
        log::info!("Kill requested for PID {} ({})", process.pid, process.name);
        self.emit(StoreEvent::KillRequested { pid: process.pid });
        true
    }

    /// `ConfirmPending -> Idle` without side effects
    pub fn close_confirm_kill(&self) -> bool {
        let cancelled = {
            let mut state = self.state();
            match std::mem::take(&mut state.kill) {
                KillWorkflow::ConfirmPending(p) => Some(p.pid),
                other => {
                    state.kill = other;
                    None
                }
            }
        };
        match cancelled {
            Some(pid) => {
                self.emit(StoreEvent::KillCancelled { pid });
                true
            }
            None => false,
        }
    }

    /// `ConfirmPending -> Killing -> Idle`.
    ///
    /// Only a `true` backend answer counts as success, and only success
    /// triggers an immediate refresh. The workflow returns to `Idle` on every
    /// path, including when this future is dropped mid-kill.
    pub async fn handle_confirm_kill(&self) -> Result<KillOutcome, KillError> {
        let process = {
            let mut state = self.state();
            match std::mem::take(&mut state.kill) {
                KillWorkflow::ConfirmPending(p) => {
                    state.kill = KillWorkflow::Killing(p.clone());
                    p
                }
                other => {
                    state.kill = other;
                    return Ok(KillOutcome::NothingPending);
                }
            }
        };
        let _reset = KillReset(self);
        let pid = process.pid;
        self.emit(StoreEvent::KillStarted { pid });

        let result = match self.backend.kill_process(pid).await {
            Ok(true) => Ok(KillOutcome::Killed { pid }),
            Ok(false) => Err(KillError::Refused { pid }),
            Err(e) => Err(KillError::Backend(e)),
        };

        match &result {
            Ok(_) => {
                log::info!("Killed PID {} ({})", pid, process.name);
                METRICS.record_kill("killed");
                self.get_processes().await;
            }
            Err(e) => {
                log::warn!("{}", e);
                METRICS.record_kill(match e {
                    KillError::Refused { .. } => "refused",
                    KillError::Backend(_) => "error",
                });
                self.state().error = Some(e.to_string());
            }
        }
        self.emit(StoreEvent::KillFinished {
            pid,
            success: result.is_ok(),
        });
        result
    }

    pub fn settings(&self) -> TableSettings {
        self.state().settings.clone()
    }

    pub fn update_settings(&self, settings: TableSettings) -> Result<(), SettingsError> {
        settings.validate()?;
        self.state().settings = settings.clone();
        self.refresh_rate.send_replace(settings.refresh_rate_ms);
        log::info!(
            "Settings updated: refresh every {} ms, {} rows per page",
            settings.refresh_rate_ms,
            settings.items_per_page
        );
        self.emit(StoreEvent::SettingsChanged(settings));
        Ok(())
    }

    pub fn status(&self) -> StoreStatus {
        let state = self.state();
        StoreStatus {
            error: state.error.clone(),
            is_loading: state.is_loading,
            is_frozen: state.is_frozen,
            search_term: state.search_term.clone(),
            status_filter: state.status_filter.to_string(),
            current_page: state.current_page,
            sort: state.sort,
            pinned: state.pins.iter().map(str::to_string).collect(),
            selected_process_pid: state.selected_pid,
            selected_process: state.selected_process.clone(),
            show_info_modal: state.selected_pid.is_some(),
            show_confirm_modal: state.kill != KillWorkflow::Idle,
            process_to_kill: state.kill.process().cloned(),
            is_killing: matches!(state.kill, KillWorkflow::Killing(_)),
            is_fetching: self.fetcher.is_in_flight(),
            generation: state.generation,
            settings: state.settings.clone(),
        }
    }

    /// Derives the visible page: filter, then sort, then paginate.
    ///
    /// All inputs are copied out under a single lock so the page reflects
    /// one consistent state even if a mutation lands mid-derivation.
    pub fn view(&self) -> TableView {
        let (snapshot, generation, search_term, status_filter, page, pins, sort, per_page) = {
            let state = self.state();
            (
                state.snapshot.clone(),
                state.generation,
                state.search_term.clone(),
                state.status_filter.clone(),
                state.current_page,
                state.pins.clone(),
                state.sort,
                state.settings.items_per_page.max(1),
            )
        };

        let matched = self.filter.filter(&snapshot.processes, &search_term, &status_filter);
        let sorted = sort_processes(matched, &sort, &pins);

        let total_matching = sorted.len();
        let total_pages = total_matching.div_ceil(per_page).max(1);
        let page = page.clamp(1, total_pages);

        let rows = sorted
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .map(|(pinned, p)| TableRow {
                pinned,
                process: p.clone(),
            })
            .collect();

        TableView {
            rows,
            total_matching,
            total_processes: snapshot.processes.len(),
            page,
            total_pages,
            items_per_page: per_page,
            sort,
            generation,
        }
    }
}

struct KillReset<'a>(&'a ProcessTableStore);

impl Drop for KillReset<'_> {
    fn drop(&mut self) {
        self.0.state().kill = KillWorkflow::Idle;
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
