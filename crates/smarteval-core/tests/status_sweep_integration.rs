//! Integration tests for the status sweep against the SQLite store.
//!
//! These tests drive a manual clock across window boundaries and check that
//! stored status follows the derivation without redundant writes.

use chrono::{DateTime, Duration, TimeZone, Utc};
use smarteval_core::storage::{StatusChange, StatusStore, WriteOutcome};
use smarteval_core::{
    Assessment, AssessmentStatus, Clock, Database, EntityOutcome, ManualClock, StatusEngine, Task,
    TaskExpiryPolicy, TaskStatus, TimeWindow,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 10, 9, 0, 0).unwrap()
}

fn window(start: i64, end: i64) -> TimeWindow {
    TimeWindow::new(t0() + Duration::minutes(start), t0() + Duration::minutes(end)).unwrap()
}

fn updated_at(db: &Database, id: &str) -> DateTime<Utc> {
    db.get_task(id).unwrap().unwrap().updated_at
}

#[test]
fn test_task_lifecycle_over_time() {
    let db = Database::open_memory().unwrap();
    let task = Task::new("s-1", "Essay draft", window(60, 180), t0());
    assert_eq!(task.status, TaskStatus::Pending);
    db.create_task(&task).unwrap();

    let clock = ManualClock::new(t0());
    let engine = StatusEngine::default();

    // Before the window: nothing to do
    let summary = engine.sweep_tasks(&clock, &db).unwrap();
    assert_eq!(summary.unchanged, 1);

    // Window opens
    clock.advance(Duration::minutes(60));
    engine.sweep_tasks(&clock, &db).unwrap();
    let stored = db.get_task(&task.id).unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Ongoing);
    assert_eq!(stored.updated_at, t0() + Duration::minutes(60));

    // Deadline passes under the default policy: ONGOING and overdue
    clock.advance(Duration::minutes(200));
    engine.sweep_tasks(&clock, &db).unwrap();
    let stored = db.get_task(&task.id).unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Ongoing);
    assert!(stored.is_overdue(clock.now()));

    // Explicit completion sticks
    db.complete_task(&task.id, clock.now()).unwrap();
    clock.advance(Duration::days(1));
    let summary = engine.sweep_tasks(&clock, &db).unwrap();
    assert_eq!(summary.unchanged, 1);
    assert_eq!(
        db.get_task(&task.id).unwrap().unwrap().status,
        TaskStatus::Completed
    );
}

#[test]
fn test_missed_sweeps_heal_in_one_pass() {
    let db = Database::open_memory().unwrap();
    let mut task = Task::new("s-1", "Lab", window(-300, -60), t0() - Duration::days(1));
    task.status = TaskStatus::Pending;
    db.create_task(&task).unwrap();

    let clock = ManualClock::new(t0());
    let summary = StatusEngine::new(TaskExpiryPolicy::Complete)
        .sweep_tasks(&clock, &db)
        .unwrap();

    assert_eq!(
        summary.outcome_of(&task.id),
        Some(&EntityOutcome::updated("PENDING", "COMPLETED"))
    );
    let stored = db.get_task(&task.id).unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Completed);
    assert_eq!(stored.completed_at, Some(t0()));
}

#[test]
fn test_boundary_end_equals_now() {
    let db = Database::open_memory().unwrap();
    let task = Task::new("s-1", "Quiz prep", window(-60, 0), t0() - Duration::hours(2));
    let exam = Assessment::new("prof-1", "Quiz", window(-60, 0), t0() - Duration::hours(2));
    db.create_task(&task).unwrap();
    db.create_assessment(&exam).unwrap();

    let clock = ManualClock::new(t0());
    let engine = StatusEngine::new(TaskExpiryPolicy::Complete);
    engine.sweep_tasks(&clock, &db).unwrap();
    engine.sweep_assessments(&clock, &db).unwrap();

    assert_eq!(
        db.get_task(&task.id).unwrap().unwrap().status,
        TaskStatus::Completed
    );
    assert_eq!(
        db.get_assessment(&exam.id).unwrap().unwrap().status,
        AssessmentStatus::Completed
    );
}

#[test]
fn test_assessment_ends_completed_regardless_of_stored_status() {
    let db = Database::open_memory().unwrap();
    for stored in [AssessmentStatus::Scheduled, AssessmentStatus::Ongoing] {
        let mut exam = Assessment::new("prof-1", "Midterm", window(-120, -1), t0());
        exam.status = stored;
        exam.completed_at = None;
        db.create_assessment(&exam).unwrap();
    }

    let clock = ManualClock::new(t0());
    let engine = StatusEngine::default();
    let first = engine.sweep_assessments(&clock, &db).unwrap();
    assert_eq!(first.updated, 2);

    clock.advance(Duration::days(30));
    let later = engine.sweep_assessments(&clock, &db).unwrap();
    assert_eq!(later.unchanged, 2);
    for exam in db.list_assessments().unwrap() {
        assert_eq!(exam.status, AssessmentStatus::Completed);
        assert_eq!(exam.completed_at, Some(t0()));
    }
}

#[test]
fn test_repeat_sweep_performs_no_writes() {
    let db = Database::open_memory().unwrap();
    for (start, end) in [(-30, 30), (30, 90), (-90, -30)] {
        let mut task = Task::new("s-1", "Reading", window(start, end), t0() - Duration::days(1));
        task.status = TaskStatus::Pending;
        db.create_task(&task).unwrap();
    }

    let clock = ManualClock::new(t0());
    let engine = StatusEngine::default();
    let first = engine.sweep_tasks(&clock, &db).unwrap();
    assert_eq!(first.updated, 2);

    let stamps: Vec<_> = db
        .list_tasks()
        .unwrap()
        .iter()
        .map(|t| (t.id.clone(), t.updated_at))
        .collect();

    let second = engine.sweep_tasks(&clock, &db).unwrap();
    assert_eq!(second.updated, 0);
    for (id, stamp) in stamps {
        assert_eq!(updated_at(&db, &id), stamp);
    }
}

#[test]
fn test_completion_racing_a_sweep_wins() {
    let db = Database::open_memory().unwrap();
    let mut task = Task::new("s-1", "Poster", window(-30, 30), t0() - Duration::days(1));
    task.status = TaskStatus::Pending;
    db.create_task(&task).unwrap();

    // The student completes the task after a sweep read it as PENDING.
    let stale = db.get_task(&task.id).unwrap().unwrap();
    db.complete_task(&task.id, t0()).unwrap();

    let outcome = StatusStore::<Task>::save_status(
        &db,
        &stale.id,
        &StatusChange {
            from: stale.status,
            to: TaskStatus::Ongoing,
            updated_at: t0(),
            completed_at: None,
        },
    )
    .unwrap();
    assert_eq!(outcome, WriteOutcome::Stale);
    assert_eq!(
        db.get_task(&task.id).unwrap().unwrap().status,
        TaskStatus::Completed
    );
}
