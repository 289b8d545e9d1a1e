mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, LoggingConfig, NotifierConfig, NotifierKind, SchedulerConfig};
pub use database::{Database, OutboxEntry};

use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::error::DatabaseError;
use crate::model::{Student, Task, TimeWindowed};

/// Returns `~/.config/smarteval[-dev]/` based on SMARTEVAL_ENV.
///
/// Set SMARTEVAL_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("SMARTEVAL_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("smarteval-dev")
    } else {
        base_dir.join("smarteval")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Result of a single-row partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The row was deleted after it was read.
    Missing,
    /// The row's status no longer matches what the caller read.
    Stale,
}

/// Partial status update produced by a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange<S> {
    /// Status the caller read; the write only applies if it still holds.
    pub from: S,
    pub to: S,
    pub updated_at: DateTime<Utc>,
    /// Stamped only if the row has no completion time yet.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Entities as loaded for a sweep. A row that fails to decode is reported
/// on its own instead of failing the whole listing.
pub type Loaded<E> = Vec<Result<E, DatabaseError>>;

/// Store contract for the status engine, one impl per entity kind.
pub trait StatusStore<E: TimeWindowed> {
    fn list_all(&self) -> Result<Loaded<E>, DatabaseError>;

    fn save_status(
        &self,
        id: &str,
        change: &StatusChange<E::Status>,
    ) -> Result<WriteOutcome, DatabaseError>;
}

/// Store contract for the reminder dispatcher.
pub trait ReminderStore {
    /// Tasks with `end` in `[from, to]` that are neither completed nor
    /// already reminded.
    fn find_due_within(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Loaded<Task>, DatabaseError>;

    /// Set the reminded flag. Never clears it.
    fn mark_reminded(&self, id: &str, at: DateTime<Utc>) -> Result<WriteOutcome, DatabaseError>;
}

/// Owner lookup.
pub trait StudentDirectory {
    fn find_student(&self, id: &str) -> Result<Option<Student>, DatabaseError>;
}
