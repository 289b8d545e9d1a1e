//! Professor-created assessments. Status is a pure function of the window:
//!
//! ```text
//!   SCHEDULED ──(now ≥ start)──> ONGOING ──(now ≥ end)──> COMPLETED
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::window::{EntityKind, TimeWindow, TimeWindowed, WindowPhase};
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssessmentStatus {
    #[default]
    Scheduled,
    Ongoing,
    Completed,
}

impl AssessmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentStatus::Scheduled => "SCHEDULED",
            AssessmentStatus::Ongoing => "ONGOING",
            AssessmentStatus::Completed => "COMPLETED",
        }
    }

    pub fn derive(now: DateTime<Utc>, window: &TimeWindow) -> AssessmentStatus {
        match window.phase(now) {
            WindowPhase::Before => AssessmentStatus::Scheduled,
            WindowPhase::Active => AssessmentStatus::Ongoing,
            WindowPhase::Ended => AssessmentStatus::Completed,
        }
    }
}

impl fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssessmentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SCHEDULED" => Ok(AssessmentStatus::Scheduled),
            "ONGOING" => Ok(AssessmentStatus::Ongoing),
            "COMPLETED" => Ok(AssessmentStatus::Completed),
            _ => Err(ValidationError::InvalidValue {
                field: "status",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Professor id
    pub created_by: String,
    pub assigned_students: Vec<String>,
    pub window: TimeWindow,
    pub status: AssessmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When the window was first observed as ended.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Assessment {
    pub fn new(
        created_by: impl Into<String>,
        title: impl Into<String>,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> Self {
        let status = AssessmentStatus::derive(now, &window);
        Assessment {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            created_by: created_by.into(),
            assigned_students: Vec::new(),
            status,
            window,
            created_at: now,
            updated_at: now,
            completed_at: (status == AssessmentStatus::Completed).then_some(now),
        }
    }

    pub fn with_students(mut self, students: Vec<String>) -> Self {
        self.assigned_students = students;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn current_status(&self, now: DateTime<Utc>) -> AssessmentStatus {
        AssessmentStatus::derive(now, &self.window)
    }

    /// Open for submissions right now.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.window.phase(now) == WindowPhase::Active
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.window.start
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.window.end
    }
}

impl TimeWindowed for Assessment {
    type Status = AssessmentStatus;
    type Policy = ();

    const KIND: EntityKind = EntityKind::Assessment;

    fn id(&self) -> &str {
        &self.id
    }

    fn window(&self) -> &TimeWindow {
        &self.window
    }

    fn status(&self) -> AssessmentStatus {
        self.status
    }

    fn derive_status(&self, now: DateTime<Utc>, _: ()) -> AssessmentStatus {
        self.current_status(now)
    }

    fn is_completed(status: AssessmentStatus) -> bool {
        status == AssessmentStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap()
    }

    fn exam() -> Assessment {
        let window = TimeWindow::new(base(), base() + Duration::hours(2)).unwrap();
        Assessment::new("prof-1", "Midterm", window, base() - Duration::days(1))
    }

    #[test]
    fn status_tracks_window() {
        let a = exam();
        assert_eq!(a.status, AssessmentStatus::Scheduled);
        assert_eq!(a.current_status(base()), AssessmentStatus::Ongoing);
        assert_eq!(
            a.current_status(base() + Duration::hours(2)),
            AssessmentStatus::Completed
        );
    }

    #[test]
    fn created_after_window_is_stamped_completed() {
        let a = exam();
        assert!(a.completed_at.is_none());

        let window = TimeWindow::new(base(), base() + Duration::hours(2)).unwrap();
        let late = Assessment::new("prof-1", "Makeup", window, base() + Duration::hours(3));
        assert_eq!(late.status, AssessmentStatus::Completed);
        assert_eq!(late.completed_at, Some(base() + Duration::hours(3)));
    }

    #[test]
    fn availability_flags() {
        let a = exam();
        let before = base() - Duration::minutes(1);
        assert!(!a.is_available(before));
        assert!(!a.has_started(before));

        let during = base() + Duration::minutes(30);
        assert!(a.is_available(during));
        assert!(a.has_started(during));
        assert!(!a.has_ended(during));

        let after = base() + Duration::hours(2);
        assert!(!a.is_available(after));
        assert!(a.has_ended(after));
    }

    #[test]
    fn stored_status_is_ignored_by_derivation() {
        let mut a = exam();
        a.status = AssessmentStatus::Completed;
        assert_eq!(
            a.derive_status(base() - Duration::hours(1), ()),
            AssessmentStatus::Scheduled
        );
    }
}
