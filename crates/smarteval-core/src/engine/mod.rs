//! Time-driven engines.
//!
//! - [`StatusEngine`]: re-derives task and assessment status from the clock
//! - [`ReminderDispatcher`]: one reminder per task as its deadline nears
//! - [`assessment_report`]: read-only snapshot of assessment windows

pub mod outcome;
pub mod reminder;
pub mod report;
pub mod status;

pub use outcome::{EntityOutcome, SkipReason, SweepSummary};
pub use reminder::{
    format_due, format_remaining, ReminderDispatcher, DEFAULT_REMINDER_HORIZON_HOURS,
};
pub use report::{assessment_report, AssessmentSnapshot};
pub use status::StatusEngine;

use crate::error::DatabaseError;

/// Id to report for a row that could not be decoded.
fn row_id(err: &DatabaseError) -> String {
    match err {
        DatabaseError::CorruptRow { id, .. } => id.clone(),
        _ => "<unknown>".to_string(),
    }
}

fn log_summary(sweep: &str, summary: &SweepSummary) {
    if summary.is_eventful() {
        tracing::info!(
            sweep,
            kind = %summary.kind,
            scanned = summary.scanned,
            updated = summary.updated,
            reminded = summary.reminded,
            skipped = summary.skipped,
            failed = summary.failed,
            "sweep finished"
        );
    } else {
        tracing::debug!(
            sweep,
            kind = %summary.kind,
            scanned = summary.scanned,
            "sweep finished, nothing to do"
        );
    }
}
