//! Read-only view of where every assessment stands relative to its window.

use serde::{Deserialize, Serialize};

use super::row_id;
use crate::clock::Clock;
use crate::error::DatabaseError;
use crate::model::{Assessment, AssessmentStatus, TimeWindow};
use crate::storage::StatusStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentSnapshot {
    pub id: String,
    pub title: String,
    pub window: TimeWindow,
    pub stored_status: AssessmentStatus,
    pub derived_status: AssessmentStatus,
    pub is_available: bool,
    pub has_started: bool,
    pub has_ended: bool,
}

impl AssessmentSnapshot {
    /// Stored status lags behind the clock (a status sweep is due).
    pub fn is_stale(&self) -> bool {
        self.stored_status != self.derived_status
    }
}

/// Snapshot every readable assessment at the clock's current instant.
/// Never writes.
pub fn assessment_report<S>(
    clock: &dyn Clock,
    store: &S,
) -> Result<Vec<AssessmentSnapshot>, DatabaseError>
where
    S: StatusStore<Assessment> + ?Sized,
{
    let now = clock.now();
    let mut snapshots = Vec::new();
    for loaded in store.list_all()? {
        let assessment = match loaded {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(id = %row_id(&e), error = %e, "skipping unreadable assessment");
                continue;
            }
        };
        snapshots.push(AssessmentSnapshot {
            derived_status: assessment.current_status(now),
            is_available: assessment.is_available(now),
            has_started: assessment.has_started(now),
            has_ended: assessment.has_ended(now),
            stored_status: assessment.status,
            window: assessment.window,
            title: assessment.title,
            id: assessment.id,
        });
    }
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::Database;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn report_flags_lagging_status() {
        let db = Database::open_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap();
        let window = TimeWindow::new(now - Duration::minutes(30), now + Duration::hours(1)).unwrap();
        let exam = Assessment::new("prof-1", "Quiz 3", window, now - Duration::days(1));
        db.create_assessment(&exam).unwrap();

        let report = assessment_report(&ManualClock::new(now), &db).unwrap();

        assert_eq!(report.len(), 1);
        let snap = &report[0];
        assert_eq!(snap.title, "Quiz 3");
        assert_eq!(snap.stored_status, AssessmentStatus::Scheduled);
        assert_eq!(snap.derived_status, AssessmentStatus::Ongoing);
        assert!(snap.is_available && snap.has_started && !snap.has_ended);
        assert!(snap.is_stale());

        // Reporting does not write.
        let stored = db.get_assessment(&exam.id).unwrap().unwrap();
        assert_eq!(stored.status, AssessmentStatus::Scheduled);
    }
}
