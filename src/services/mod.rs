pub mod backend;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod scheduler;
pub mod sorter;
pub mod stats_collector;

pub use backend::ProcessBackend;
pub use error::{BackendError, FetchError, KillError};
pub use fetcher::SnapshotFetcher;
pub use filter::FilterEngine;
pub use scheduler::run_refresh_loop;
pub use sorter::sort_processes;
pub use stats_collector::StatsCollector;
