//! Student tasks.
//!
//! Task status follows the window, with one exception: `COMPLETED` reached
//! through an explicit completion is sticky and never re-derived.
//!
//! ```text
//!   PENDING ──(now ≥ start)──> ONGOING ──(complete)──> COMPLETED
//!                                 │
//!                                 └──(now ≥ end)──> ONGOING + overdue   [Overdue policy]
//!                                 └──(now ≥ end)──> COMPLETED           [Complete policy]
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::window::{EntityKind, TimeWindow, TimeWindowed, WindowPhase};
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Window has not opened yet (initial state)
    #[default]
    Pending,
    /// Window is open, or has closed without the task being completed
    Ongoing,
    /// Terminal
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Ongoing => "ONGOING",
            TaskStatus::Completed => "COMPLETED",
        }
    }

    /// Derive the status at `now`.
    ///
    /// `existing == Completed` is returned unchanged for every `now`.
    pub fn derive(
        now: DateTime<Utc>,
        window: &TimeWindow,
        existing: TaskStatus,
        expiry: TaskExpiryPolicy,
    ) -> TaskStatus {
        if existing == TaskStatus::Completed {
            return TaskStatus::Completed;
        }
        match window.phase(now) {
            WindowPhase::Before => TaskStatus::Pending,
            WindowPhase::Active => TaskStatus::Ongoing,
            WindowPhase::Ended => match expiry {
                TaskExpiryPolicy::Overdue => TaskStatus::Ongoing,
                TaskExpiryPolicy::Complete => TaskStatus::Completed,
            },
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TaskStatus::Pending),
            "ONGOING" => Ok(TaskStatus::Ongoing),
            "COMPLETED" => Ok(TaskStatus::Completed),
            _ => Err(ValidationError::InvalidValue {
                field: "status",
                value: s.to_string(),
            }),
        }
    }
}

/// What happens to a task whose window closes before it is completed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskExpiryPolicy {
    /// Stays `ONGOING` and reports as overdue.
    #[default]
    Overdue,
    /// Becomes `COMPLETED`, like an assessment.
    Complete,
}

impl FromStr for TaskExpiryPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overdue" => Ok(TaskExpiryPolicy::Overdue),
            "complete" => Ok(TaskExpiryPolicy::Complete),
            _ => Err(ValidationError::InvalidValue {
                field: "task_expiry",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(TaskPriority::Low),
            "MEDIUM" => Ok(TaskPriority::Medium),
            "HIGH" => Ok(TaskPriority::High),
            _ => Err(ValidationError::InvalidValue {
                field: "priority",
                value: s.to_string(),
            }),
        }
    }
}

/// A student's task with a deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: String,
    /// Owning student
    pub student_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Start and deadline
    pub window: TimeWindow,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Set once a reminder went out; never cleared
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new task with the status it has at `now`.
    pub fn new(
        student_id: impl Into<String>,
        title: impl Into<String>,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> Self {
        let status = TaskStatus::derive(now, &window, TaskStatus::Pending, TaskExpiryPolicy::Overdue);
        Task {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: student_id.into(),
            title: title.into(),
            description: None,
            window,
            status,
            priority: TaskPriority::Medium,
            reminder_sent: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Status at `now`, without touching the stored value.
    pub fn current_status(&self, now: DateTime<Utc>, expiry: TaskExpiryPolicy) -> TaskStatus {
        TaskStatus::derive(now, &self.window, self.status, expiry)
    }

    /// Past the deadline and not completed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Completed && now >= self.window.end
    }

    /// Time left until the deadline; negative once overdue.
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Duration {
        self.window.end.signed_duration_since(now)
    }

    /// Explicit completion. `completed_at` is stamped only the first time.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Completed;
        self.updated_at = now;
        if self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
    }
}

impl TimeWindowed for Task {
    type Status = TaskStatus;
    type Policy = TaskExpiryPolicy;

    const KIND: EntityKind = EntityKind::Task;

    fn id(&self) -> &str {
        &self.id
    }

    fn window(&self) -> &TimeWindow {
        &self.window
    }

    fn status(&self) -> TaskStatus {
        self.status
    }

    fn derive_status(&self, now: DateTime<Utc>, expiry: TaskExpiryPolicy) -> TaskStatus {
        self.current_status(now, expiry)
    }

    fn is_completed(status: TaskStatus) -> bool {
        status == TaskStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 12, 12, 0, 0).unwrap()
    }

    fn window(start_min: i64, end_min: i64) -> TimeWindow {
        TimeWindow::new(
            base() + Duration::minutes(start_min),
            base() + Duration::minutes(end_min),
        )
        .unwrap()
    }

    #[test]
    fn derive_follows_window_before_deadline() {
        let w = window(0, 60);
        let policy = TaskExpiryPolicy::Overdue;
        assert_eq!(
            TaskStatus::derive(base() - Duration::minutes(1), &w, TaskStatus::Pending, policy),
            TaskStatus::Pending
        );
        assert_eq!(
            TaskStatus::derive(base(), &w, TaskStatus::Pending, policy),
            TaskStatus::Ongoing
        );
    }

    #[test]
    fn expired_task_stays_ongoing_under_overdue_policy() {
        let w = window(0, 60);
        let now = base() + Duration::minutes(60);
        assert_eq!(
            TaskStatus::derive(now, &w, TaskStatus::Ongoing, TaskExpiryPolicy::Overdue),
            TaskStatus::Ongoing
        );
        // A missed window still lands in ONGOING, not PENDING.
        assert_eq!(
            TaskStatus::derive(now, &w, TaskStatus::Pending, TaskExpiryPolicy::Overdue),
            TaskStatus::Ongoing
        );
    }

    #[test]
    fn expired_task_completes_under_complete_policy() {
        let w = window(0, 60);
        let now = base() + Duration::minutes(60);
        assert_eq!(
            TaskStatus::derive(now, &w, TaskStatus::Ongoing, TaskExpiryPolicy::Complete),
            TaskStatus::Completed
        );
    }

    #[test]
    fn overdue_is_informational() {
        let task = Task::new("s-1", "Essay", window(-120, -1), base());
        assert_eq!(task.status, TaskStatus::Ongoing);
        assert!(task.is_overdue(base()));
        assert_eq!(task.time_remaining(base()), Duration::minutes(-1));
    }

    #[test]
    fn complete_stamps_completed_at_once() {
        let mut task = Task::new("s-1", "Essay", window(0, 60), base());
        task.complete(base() + Duration::minutes(5));
        task.complete(base() + Duration::minutes(9));
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.completed_at, Some(base() + Duration::minutes(5)));
        assert_eq!(task.updated_at, base() + Duration::minutes(9));
        assert!(!task.is_overdue(base() + Duration::days(3)));
    }

    #[test]
    fn new_task_starts_unreminded_with_time_status() {
        let later = Task::new("s-1", "Lab", window(30, 90), base());
        assert_eq!(later.status, TaskStatus::Pending);
        assert!(!later.reminder_sent);

        let running = Task::new("s-1", "Lab", window(-30, 90), base());
        assert_eq!(running.status, TaskStatus::Ongoing);
    }

    #[test]
    fn parse_status_and_priority() {
        assert_eq!("ongoing".parse::<TaskStatus>().unwrap(), TaskStatus::Ongoing);
        assert_eq!("HIGH".parse::<TaskPriority>().unwrap(), TaskPriority::High);
        assert_eq!(
            "complete".parse::<TaskExpiryPolicy>().unwrap(),
            TaskExpiryPolicy::Complete
        );
        assert!("done".parse::<TaskStatus>().is_err());
    }

    fn any_status() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::Pending),
            Just(TaskStatus::Ongoing),
            Just(TaskStatus::Completed),
        ]
    }

    fn any_policy() -> impl Strategy<Value = TaskExpiryPolicy> {
        prop_oneof![
            Just(TaskExpiryPolicy::Overdue),
            Just(TaskExpiryPolicy::Complete),
        ]
    }

    proptest! {
        #[test]
        fn completed_is_sticky(
            start in -5_000i64..5_000,
            len in 0i64..5_000,
            now in -20_000i64..20_000,
            policy in any_policy(),
        ) {
            let w = window(start, start + len);
            let at = base() + Duration::minutes(now);
            prop_assert_eq!(
                TaskStatus::derive(at, &w, TaskStatus::Completed, policy),
                TaskStatus::Completed
            );
        }

        #[test]
        fn derivation_is_idempotent(
            start in -5_000i64..5_000,
            len in 0i64..5_000,
            now in -20_000i64..20_000,
            existing in any_status(),
            policy in any_policy(),
        ) {
            let w = window(start, start + len);
            let at = base() + Duration::minutes(now);
            let once = TaskStatus::derive(at, &w, existing, policy);
            let twice = TaskStatus::derive(at, &w, once, policy);
            prop_assert_eq!(once, twice);
        }
    }
}
