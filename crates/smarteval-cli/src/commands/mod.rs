pub mod assessment;
pub mod config;
pub mod outbox;
pub mod run;
pub mod student;
pub mod sweep;
pub mod task;

use chrono::{DateTime, Utc};
use std::path::PathBuf;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Resolve the database file from `--db` or the data directory.
pub fn db_path(explicit: Option<PathBuf>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(smarteval_core::storage::data_dir()?.join("smarteval.db")),
    }
}

/// Parse an RFC 3339 timestamp argument into UTC.
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC 3339 time like 2025-03-14T17:00:00Z: {e}"))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
