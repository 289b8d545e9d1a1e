//! # SmartEval Core Library
//!
//! Time-driven bookkeeping for the SmartEval platform: task and assessment
//! status follows the clock, and students get one reminder per task as a
//! deadline approaches.
//!
//! ## Architecture
//!
//! - **Model**: tasks, assessments and the pure window classification that
//!   drives their status
//! - **Engines**: the status sweep and the reminder dispatcher, both reading
//!   "now" from an injected [`Clock`] and reporting per-entity outcomes
//! - **Storage**: SQLite entity store and TOML configuration
//! - **Scheduler**: periodic job loops with explicit start and shutdown
//!
//! ## Key Components
//!
//! - [`StatusEngine`]: re-derives and persists status transitions
//! - [`ReminderDispatcher`]: at-most-once deadline reminders
//! - [`Notifier`]: delivery seam for reminders
//! - [`Database`]: entity persistence
//! - [`Scheduler`]: runs the sweeps periodically

pub mod clock;
pub mod engine;
pub mod error;
pub mod model;
pub mod notify;
pub mod scheduler;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{
    assessment_report, format_due, format_remaining, AssessmentSnapshot, EntityOutcome,
    ReminderDispatcher, SkipReason, StatusEngine, SweepSummary,
};
pub use error::{ConfigError, CoreError, DatabaseError, NotifyError, ValidationError};
pub use model::{
    classify_window, Assessment, AssessmentStatus, EntityKind, Student, Task, TaskExpiryPolicy,
    TaskPriority, TaskStatus, TimeWindow, TimeWindowed, WindowPhase,
};
pub use notify::{LogNotifier, Notifier, OutboxNotifier, ReminderMessage, ReminderNotice};
pub use scheduler::{Scheduler, SweepJobs};
pub use storage::{Config, Database, NotifierKind};
