use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::StatusFilter;

pub const REFRESH_RATE_OPTIONS: [u64; 5] = [1000, 2000, 5000, 10000, 30000];
pub const ITEMS_PER_PAGE_OPTIONS: [usize; 6] = [15, 25, 50, 100, 250, 500];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("unsupported refresh rate {0} ms, expected 1000, 2000, 5000, 10000 or 30000")]
    RefreshRate(u64),

    #[error("unsupported page size {0}, expected 15, 25, 50, 100, 250 or 500")]
    ItemsPerPage(usize),

    #[error("unknown status filter '{0}', expected all, a status name or a status code")]
    StatusFilter(String),
}

/// Table behaviour settings consumed by the store and the refresh task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSettings {
    /// Refresh cadence in milliseconds
    pub refresh_rate_ms: u64,
    pub items_per_page: usize,
    /// Status filter applied when the store is created
    pub default_status_filter: String,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            refresh_rate_ms: 1000,
            items_per_page: 15,
            default_status_filter: "all".to_string(),
        }
    }
}

impl TableSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !REFRESH_RATE_OPTIONS.contains(&self.refresh_rate_ms) {
            return Err(SettingsError::RefreshRate(self.refresh_rate_ms));
        }
        if !ITEMS_PER_PAGE_OPTIONS.contains(&self.items_per_page) {
            return Err(SettingsError::ItemsPerPage(self.items_per_page));
        }
        if !StatusFilter::is_known(&self.default_status_filter) {
            return Err(SettingsError::StatusFilter(self.default_status_filter.clone()));
        }
        Ok(())
    }

    pub fn status_filter(&self) -> StatusFilter {
        StatusFilter::parse(&self.default_status_filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = TableSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.status_filter(), StatusFilter::All);
    }

    #[test]
    fn rejects_values_outside_the_option_sets() {
        let settings = TableSettings {
            refresh_rate_ms: 1500,
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::RefreshRate(1500)));

        let settings = TableSettings {
            items_per_page: 20,
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::ItemsPerPage(20)));

        let settings = TableSettings {
            default_status_filter: "bogus".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::StatusFilter("bogus".to_string())));
    }

    #[test]
    fn accepts_status_names_and_codes() {
        for filter in ["running", "S", "zombie", "Unknown"] {
            let settings = TableSettings {
                default_status_filter: filter.to_string(),
                ..Default::default()
            };
            assert!(settings.validate().is_ok(), "{}", filter);
        }
    }
}
