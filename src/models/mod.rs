pub mod process;
pub mod settings;
pub mod stats;
pub mod table;

pub use process::{Process, ProcessState};
pub use settings::{SettingsError, TableSettings};
pub use stats::{Snapshot, SystemStats};
pub use table::{PinSet, SortConfig, SortDirection, SortField, StatusFilter, TableRow, TableView};
