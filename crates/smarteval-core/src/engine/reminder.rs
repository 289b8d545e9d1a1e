//! Deadline reminders.
//!
//! Each sweep looks for tasks whose deadline falls within the horizon, sends
//! one notice per task and sets the task's reminder flag only after the
//! notifier accepted it. A task whose send or owner lookup fails stays
//! eligible and is retried by the next sweep while its deadline is still
//! inside the window.

use chrono::{DateTime, Duration, Utc};

use super::outcome::{EntityOutcome, SkipReason, SweepSummary};
use super::{log_summary, row_id};
use crate::clock::Clock;
use crate::error::DatabaseError;
use crate::model::{horizon_end, EntityKind, Task};
use crate::notify::{Notifier, ReminderNotice};
use crate::storage::{ReminderStore, StudentDirectory, WriteOutcome};

pub const DEFAULT_REMINDER_HORIZON_HOURS: u32 = 24;

/// Remaining time as whole hours and minutes, e.g. `"3 hours and 42 minutes"`
/// or `"15 minutes"` under one hour. A deadline already passed reads as
/// `"0 minutes"`.
pub fn format_remaining(now: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let left = (end - now).max(Duration::zero());
    let hours = left.num_hours();
    let minutes = left.num_minutes() % 60;
    if hours > 0 {
        format!("{hours} hours and {minutes} minutes")
    } else {
        format!("{minutes} minutes")
    }
}

pub fn format_due(end: DateTime<Utc>) -> String {
    end.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Sends at most one reminder per task ahead of its deadline.
#[derive(Debug, Clone, Copy)]
pub struct ReminderDispatcher {
    horizon: Duration,
}

impl Default for ReminderDispatcher {
    fn default() -> Self {
        Self::new(Duration::hours(i64::from(DEFAULT_REMINDER_HORIZON_HOURS)))
    }
}

impl ReminderDispatcher {
    pub fn new(horizon: Duration) -> Self {
        Self { horizon }
    }

    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    /// Remind every task due within `[now, now + horizon]`. The upper bound
    /// saturates, so any horizon is accepted.
    ///
    /// # Errors
    /// Only when the candidate query fails.
    pub fn dispatch_due<S, D, N>(
        &self,
        clock: &dyn Clock,
        store: &S,
        directory: &D,
        notifier: &N,
    ) -> Result<SweepSummary, DatabaseError>
    where
        S: ReminderStore + ?Sized,
        D: StudentDirectory + ?Sized,
        N: Notifier + ?Sized,
    {
        let now = clock.now();
        let mut summary = SweepSummary::new(EntityKind::Task, now);

        let until = horizon_end(now, self.horizon);
        let candidates = store.find_due_within(now, until).map_err(|e| {
            tracing::error!(error = %e, "reminder sweep aborted");
            e
        })?;

        for loaded in candidates {
            match loaded {
                Ok(task) => {
                    let outcome = remind(now, &task, store, directory, notifier);
                    summary.record(task.id, outcome);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable task");
                    summary.record(row_id(&e), EntityOutcome::failed(&e));
                }
            }
        }

        log_summary("reminder", &summary);
        Ok(summary)
    }
}

fn remind<S, D, N>(
    now: DateTime<Utc>,
    task: &Task,
    store: &S,
    directory: &D,
    notifier: &N,
) -> EntityOutcome
where
    S: ReminderStore + ?Sized,
    D: StudentDirectory + ?Sized,
    N: Notifier + ?Sized,
{
    let student = match directory.find_student(&task.student_id) {
        Ok(Some(student)) => student,
        Ok(None) => {
            tracing::warn!(
                task_id = %task.id,
                student_id = %task.student_id,
                "task owner not found, reminder skipped"
            );
            return EntityOutcome::skipped(SkipReason::MissingOwner);
        }
        Err(e) => {
            tracing::warn!(task_id = %task.id, error = %e, "owner lookup failed");
            return EntityOutcome::failed(&e);
        }
    };

    let notice = ReminderNotice {
        task_id: task.id.clone(),
        contact: student.contact().to_string(),
        display_name: student.display_name().to_string(),
        title: task.title.clone(),
        description: task.description.clone(),
        remaining_text: format_remaining(now, task.window.end),
        due_text: format_due(task.window.end),
    };

    if let Err(e) = notifier.send_reminder(&notice) {
        tracing::warn!(task_id = %task.id, error = %e, "reminder delivery failed");
        return EntityOutcome::failed(&e);
    }

    match store.mark_reminded(&task.id, now) {
        Ok(WriteOutcome::Written) => {
            tracing::info!(
                task_id = %task.id,
                recipient = %notice.contact,
                remaining = %notice.remaining_text,
                "reminder sent"
            );
            EntityOutcome::Reminded
        }
        Ok(WriteOutcome::Missing | WriteOutcome::Stale) => {
            tracing::debug!(task_id = %task.id, "task deleted after reminder was sent");
            EntityOutcome::skipped(SkipReason::Vanished)
        }
        Err(e) => {
            tracing::error!(
                task_id = %task.id,
                error = %e,
                "reminder sent but flag not saved, it may be sent again"
            );
            EntityOutcome::failed(&e)
        }
    }
}
