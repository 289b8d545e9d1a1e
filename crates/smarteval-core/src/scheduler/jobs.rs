//! The sweeps the scheduler runs, and their one-shot forms for the CLI.
//!
//! Every run opens its own connection to the database file, so a run never
//! holds a connection across ticks and a failed open only costs that run.

use std::path::PathBuf;
use std::sync::Arc;

use super::Scheduler;
use crate::clock::Clock;
use crate::engine::{
    assessment_report, AssessmentSnapshot, ReminderDispatcher, StatusEngine, SweepSummary,
};
use crate::error::DatabaseError;
use crate::notify::{LogNotifier, Notifier, OutboxNotifier};
use crate::storage::{Database, NotifierKind, SchedulerConfig};

/// Binds the engines to a database file, a clock and the scheduler settings.
pub struct SweepJobs {
    db_path: PathBuf,
    config: SchedulerConfig,
    notifier: NotifierKind,
    clock: Arc<dyn Clock>,
}

impl SweepJobs {
    pub fn new(
        db_path: impl Into<PathBuf>,
        config: SchedulerConfig,
        notifier: NotifierKind,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db_path: db_path.into(),
            config,
            notifier,
            clock,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn open(&self) -> Result<Database, DatabaseError> {
        Database::open_at(&self.db_path)
    }

    fn build_notifier(&self) -> Result<Box<dyn Notifier>, DatabaseError> {
        Ok(match self.notifier {
            NotifierKind::Log => Box::new(LogNotifier),
            NotifierKind::Outbox => {
                Box::new(OutboxNotifier::new(self.open()?, Arc::clone(&self.clock)))
            }
        })
    }

    /// One status sweep over tasks, then one over assessments. Each kind
    /// succeeds or fails on its own.
    pub fn status_sweep(&self) -> Vec<Result<SweepSummary, DatabaseError>> {
        vec![self.task_status_sweep(), self.assessment_status_sweep()]
    }

    /// One status sweep over tasks only.
    pub fn task_status_sweep(&self) -> Result<SweepSummary, DatabaseError> {
        let db = self.open()?;
        StatusEngine::new(self.config.task_expiry).sweep_tasks(self.clock.as_ref(), &db)
    }

    /// One status sweep over assessments only.
    pub fn assessment_status_sweep(&self) -> Result<SweepSummary, DatabaseError> {
        let db = self.open()?;
        StatusEngine::new(self.config.task_expiry).sweep_assessments(self.clock.as_ref(), &db)
    }

    /// One reminder sweep.
    pub fn reminder_sweep(&self) -> Result<SweepSummary, DatabaseError> {
        let db = self.open()?;
        let notifier = self.build_notifier()?;
        ReminderDispatcher::new(self.config.reminder_horizon()).dispatch_due(
            self.clock.as_ref(),
            &db,
            &db,
            notifier.as_ref(),
        )
    }

    pub fn report(&self) -> Result<Vec<AssessmentSnapshot>, DatabaseError> {
        let db = self.open()?;
        assessment_report(self.clock.as_ref(), &db)
    }

    /// Scheduled form of [`task_status_sweep`](Self::task_status_sweep).
    /// Never fails.
    pub fn run_task_status(&self) {
        if let Err(e) = self.task_status_sweep() {
            tracing::error!(kind = "task", error = %e, "status sweep failed");
        }
    }

    /// Scheduled form of
    /// [`assessment_status_sweep`](Self::assessment_status_sweep). Never fails.
    pub fn run_assessment_status(&self) {
        if let Err(e) = self.assessment_status_sweep() {
            tracing::error!(kind = "assessment", error = %e, "status sweep failed");
        }
    }

    /// Scheduled form of [`reminder_sweep`](Self::reminder_sweep). Never fails.
    pub fn run_reminders(&self) {
        if let Err(e) = self.reminder_sweep() {
            tracing::error!(error = %e, "reminder sweep failed");
        }
    }

    /// Logs the assessment report at debug level.
    pub fn run_report(&self) {
        match self.report() {
            Ok(snapshots) => {
                tracing::debug!(assessments = snapshots.len(), "assessment status report");
                for s in &snapshots {
                    tracing::debug!(
                        id = %s.id,
                        title = %s.title,
                        start = %s.window.start,
                        end = %s.window.end,
                        stored = %s.stored_status,
                        derived = %s.derived_status,
                        available = s.is_available,
                        started = s.has_started,
                        ended = s.has_ended,
                        "assessment"
                    );
                }
            }
            Err(e) => tracing::error!(error = %e, "assessment report failed"),
        }
    }

    /// Start the task status, assessment status, reminder and report loops
    /// on `scheduler`.
    pub fn register(self: Arc<Self>, scheduler: &mut Scheduler) {
        let tasks = Arc::clone(&self);
        scheduler.spawn("task-status", self.config.status_interval(), move || {
            tasks.run_task_status()
        });

        let assessments = Arc::clone(&self);
        scheduler.spawn("assessment-status", self.config.status_interval(), move || {
            assessments.run_assessment_status()
        });

        let reminders = Arc::clone(&self);
        scheduler.spawn("reminders", self.config.reminder_interval(), move || {
            reminders.run_reminders()
        });

        let report = Arc::clone(&self);
        scheduler.spawn("report", self.config.report_interval(), move || {
            report.run_report()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::{Assessment, AssessmentStatus, Student, Task, TaskStatus, TimeWindow};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 3, 8, 0, 0).unwrap()
    }

    fn seed(path: &std::path::Path) -> (String, String) {
        let db = Database::open_at(path).unwrap();
        db.upsert_student(&Student::new("s-1", "kim@uni.edu", "kim"))
            .unwrap();
        let window = TimeWindow::new(now() - Duration::hours(1), now() + Duration::hours(2)).unwrap();
        let mut task = Task::new("s-1", "Slides", window, now() - Duration::days(1));
        task.status = TaskStatus::Pending;
        db.create_task(&task).unwrap();

        let window = TimeWindow::new(now() - Duration::hours(3), now() - Duration::minutes(1)).unwrap();
        let exam = Assessment::new("prof-1", "Oral exam", window, now() - Duration::days(1));
        db.create_assessment(&exam).unwrap();
        (task.id, exam.id)
    }

    fn jobs(path: &std::path::Path, notifier: NotifierKind) -> SweepJobs {
        SweepJobs::new(
            path,
            SchedulerConfig::default(),
            notifier,
            Arc::new(ManualClock::new(now())),
        )
    }

    #[test]
    fn status_sweep_covers_both_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smarteval.db");
        let (task_id, exam_id) = seed(&path);

        let summaries: Vec<SweepSummary> = jobs(&path, NotifierKind::Log)
            .status_sweep()
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].updated, 1);
        assert_eq!(summaries[1].updated, 1);

        let db = Database::open_at(&path).unwrap();
        assert_eq!(
            db.get_task(&task_id).unwrap().unwrap().status,
            TaskStatus::Ongoing
        );
        assert_eq!(
            db.get_assessment(&exam_id).unwrap().unwrap().status,
            AssessmentStatus::Completed
        );
    }

    #[test]
    fn task_listing_failure_leaves_assessments_swept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smarteval.db");
        let (_, exam_id) = seed(&path);
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch("DROP TABLE tasks")
            .unwrap();
        let jobs = jobs(&path, NotifierKind::Log);

        let results = jobs.status_sweep();
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap().updated, 1);

        let db = Database::open_at(&path).unwrap();
        assert_eq!(
            db.get_assessment(&exam_id).unwrap().unwrap().status,
            AssessmentStatus::Completed
        );
    }

    #[test]
    fn scheduled_assessment_sweep_runs_without_tasks_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smarteval.db");
        let (_, exam_id) = seed(&path);
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch("DROP TABLE tasks")
            .unwrap();
        let jobs = jobs(&path, NotifierKind::Log);

        jobs.run_task_status();
        jobs.run_assessment_status();

        let db = Database::open_at(&path).unwrap();
        assert_eq!(
            db.get_assessment(&exam_id).unwrap().unwrap().status,
            AssessmentStatus::Completed
        );
    }

    #[tokio::test]
    async fn register_starts_one_loop_per_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smarteval.db");
        seed(&path);
        let mut scheduler = Scheduler::new();
        Arc::new(jobs(&path, NotifierKind::Log)).register(&mut scheduler);
        assert_eq!(scheduler.job_count(), 4);
        scheduler.shutdown().await;
    }

    #[test]
    fn reminder_sweep_queues_to_outbox() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smarteval.db");
        let (task_id, _) = seed(&path);
        let jobs = jobs(&path, NotifierKind::Outbox);

        let summary = jobs.reminder_sweep().unwrap();
        assert_eq!(summary.reminded, 1);
        assert_eq!(jobs.reminder_sweep().unwrap().scanned, 0);

        let db = Database::open_at(&path).unwrap();
        let outbox = db.list_outbox().unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].recipient, "kim@uni.edu");
        assert!(outbox[0].body.contains("Time Remaining: 2 hours and 0 minutes"));
        assert!(db.get_task(&task_id).unwrap().unwrap().reminder_sent);
    }

    #[test]
    fn report_reads_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smarteval.db");
        seed(&path);

        let report = jobs(&path, NotifierKind::Log).report().unwrap();
        assert_eq!(report.len(), 1);
        assert!(report[0].has_ended);
        assert_eq!(report[0].stored_status, AssessmentStatus::Scheduled);
    }

    #[test]
    fn open_failure_surfaces_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("smarteval.db");
        let jobs = jobs(&path, NotifierKind::Log);
        assert!(jobs
            .status_sweep()
            .iter()
            .all(|r| matches!(r, Err(DatabaseError::OpenFailed { .. }))));
        // Scheduled forms only log.
        jobs.run_task_status();
        jobs.run_assessment_status();
    }
}
