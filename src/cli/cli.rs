use clap::Parser;

use crate::models::settings::{ITEMS_PER_PAGE_OPTIONS, REFRESH_RATE_OPTIONS};
use crate::models::{StatusFilter, TableSettings};

/// Process Table - live, filterable process table over HTTP
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 9999)]
    pub port: u16,

    /// Listen address
    #[arg(short = 'a', long, env = "ADDRESS", default_value = "0.0.0.0")]
    pub address: String,

    /// Refresh interval in milliseconds (1000, 2000, 5000, 10000 or 30000)
    #[arg(short, long, env = "REFRESH_RATE_MS", default_value_t = 1000, value_parser = parse_refresh_rate)]
    pub refresh_rate_ms: u64,

    /// Rows per page (15, 25, 50, 100, 250 or 500)
    #[arg(short, long, env = "ITEMS_PER_PAGE", default_value_t = 15, value_parser = parse_items_per_page)]
    pub items_per_page: usize,

    /// Initial status filter: all, running, sleeping, idle, unknown or a status code
    #[arg(short = 's', long, env = "DEFAULT_STATUS_FILTER", default_value = "all", value_parser = parse_status_filter)]
    pub default_status_filter: String,
}

impl CommandArgs {
    pub fn settings(&self) -> TableSettings {
        TableSettings {
            refresh_rate_ms: self.refresh_rate_ms,
            items_per_page: self.items_per_page,
            default_status_filter: self.default_status_filter.clone(),
        }
    }
}

fn parse_refresh_rate(value: &str) -> Result<u64, String> {
    let rate: u64 = value.parse().map_err(|e| format!("{}", e))?;
    if REFRESH_RATE_OPTIONS.contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("expected one of {:?}", REFRESH_RATE_OPTIONS))
    }
}

fn parse_items_per_page(value: &str) -> Result<usize, String> {
    let items: usize = value.parse().map_err(|e| format!("{}", e))?;
    if ITEMS_PER_PAGE_OPTIONS.contains(&items) {
        Ok(items)
    } else {
        Err(format!("expected one of {:?}", ITEMS_PER_PAGE_OPTIONS))
    }
}

fn parse_status_filter(value: &str) -> Result<String, String> {
    if StatusFilter::is_known(value) {
        Ok(value.trim().to_string())
    } else {
        Err("expected all, a status name (running, sleeping, ...) or a status code (R, S, ...)".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_produce_valid_settings() {
        let args = CommandArgs::try_parse_from(["process-table"]).unwrap();
        assert_eq!(args.port, 9999);
        assert_eq!(args.settings(), TableSettings::default());
    }

    #[test]
    fn accepts_listed_values_only() {
        let args =
            CommandArgs::try_parse_from(["process-table", "-r", "5000", "-i", "100", "-s", "running"]).unwrap();
        assert_eq!(args.refresh_rate_ms, 5000);
        assert_eq!(args.items_per_page, 100);
        assert_eq!(args.default_status_filter, "running");

        assert!(CommandArgs::try_parse_from(["process-table", "--refresh-rate-ms", "1234"]).is_err());
        assert!(CommandArgs::try_parse_from(["process-table", "--items-per-page", "20"]).is_err());
        assert!(CommandArgs::try_parse_from(["process-table", "-s", "bogus"]).is_err());

        let args = CommandArgs::try_parse_from(["process-table", "-s", "Z"]).unwrap();
        assert!(args.settings().validate().is_ok());
    }
}
