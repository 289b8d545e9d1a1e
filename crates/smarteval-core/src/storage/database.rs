//! SQLite-backed entity store.
//!
//! Provides persistent storage for:
//! - Students (owner lookup for reminders)
//! - Tasks and assessments, with the partial status updates used by sweeps
//! - The reminder outbox consumed by an external mailer

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::migrations;
use super::{
    data_dir, Loaded, ReminderStore, StatusChange, StatusStore, StudentDirectory, WriteOutcome,
};
use crate::error::DatabaseError;
use crate::model::{
    horizon_end, Assessment, AssessmentStatus, Student, Task, TaskPriority, TaskStatus,
    TimeWindow,
};

/// How long a connection waits on a locked database file.
const BUSY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

const TASK_COLUMNS: &str = "id, student_id, title, description, start_at, end_at, status,
     priority, reminder_sent, created_at, updated_at, completed_at";

const ASSESSMENT_COLUMNS: &str = "id, title, description, created_by, assigned_students,
     start_at, end_at, status, created_at, updated_at, completed_at";

// === Helper Functions ===

/// Fixed-width UTC text, so lexical order matches time order.
fn format_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(table: &'static str, id: &str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRow {
            table,
            id: id.to_string(),
            message: format!("bad timestamp '{raw}': {e}"),
        })
}

fn parse_opt_ts(
    table: &'static str,
    id: &str,
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    raw.map(|s| parse_ts(table, id, s)).transpose()
}

fn corrupt(table: &'static str, id: &str, err: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::CorruptRow {
        table,
        id: id.to_string(),
        message: err.to_string(),
    }
}

/// Raw `tasks` row, decoded outside the rusqlite closure so a bad value
/// becomes a per-row error.
struct TaskRow {
    id: String,
    student_id: String,
    title: String,
    description: Option<String>,
    start_at: String,
    end_at: String,
    status: String,
    priority: String,
    reminder_sent: bool,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

impl TaskRow {
    fn from_row(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            student_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            start_at: row.get(4)?,
            end_at: row.get(5)?,
            status: row.get(6)?,
            priority: row.get(7)?,
            reminder_sent: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
            completed_at: row.get(11)?,
        })
    }

    fn into_task(self) -> Result<Task, DatabaseError> {
        const T: &str = "tasks";
        let window = TimeWindow::unchecked(
            parse_ts(T, &self.id, &self.start_at)?,
            parse_ts(T, &self.id, &self.end_at)?,
        );
        let status: TaskStatus = self.status.parse().map_err(|e| corrupt(T, &self.id, e))?;
        let priority: TaskPriority = self.priority.parse().map_err(|e| corrupt(T, &self.id, e))?;
        Ok(Task {
            created_at: parse_ts(T, &self.id, &self.created_at)?,
            updated_at: parse_ts(T, &self.id, &self.updated_at)?,
            completed_at: parse_opt_ts(T, &self.id, self.completed_at.as_deref())?,
            id: self.id,
            student_id: self.student_id,
            title: self.title,
            description: self.description,
            window,
            status,
            priority,
            reminder_sent: self.reminder_sent,
        })
    }
}

struct AssessmentRow {
    id: String,
    title: String,
    description: Option<String>,
    created_by: String,
    assigned_students: String,
    start_at: String,
    end_at: String,
    status: String,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

impl AssessmentRow {
    fn from_row(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            created_by: row.get(3)?,
            assigned_students: row.get(4)?,
            start_at: row.get(5)?,
            end_at: row.get(6)?,
            status: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
            completed_at: row.get(10)?,
        })
    }

    fn into_assessment(self) -> Result<Assessment, DatabaseError> {
        const T: &str = "assessments";
        let window = TimeWindow::unchecked(
            parse_ts(T, &self.id, &self.start_at)?,
            parse_ts(T, &self.id, &self.end_at)?,
        );
        let status: AssessmentStatus =
            self.status.parse().map_err(|e| corrupt(T, &self.id, e))?;
        let assigned_students: Vec<String> =
            serde_json::from_str(&self.assigned_students).map_err(|e| corrupt(T, &self.id, e))?;
        Ok(Assessment {
            created_at: parse_ts(T, &self.id, &self.created_at)?,
            updated_at: parse_ts(T, &self.id, &self.updated_at)?,
            completed_at: parse_opt_ts(T, &self.id, self.completed_at.as_deref())?,
            id: self.id,
            title: self.title,
            description: self.description,
            created_by: self.created_by,
            assigned_students,
            window,
            status,
        })
    }
}

/// A rendered reminder waiting for the external mailer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: i64,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// SQLite database holding students, tasks, assessments and the outbox.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/smarteval/smarteval.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let path = data_dir().map_err(DatabaseError::DataDir)?.join("smarteval.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        migrations::migrate(&self.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    // === Students ===

    /// Insert or replace a student record.
    pub fn upsert_student(&self, student: &Student) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO students (id, email, username) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET email = excluded.email, username = excluded.username",
            params![student.id, student.email, student.username],
        )?;
        Ok(())
    }

    pub fn get_student(&self, id: &str) -> Result<Option<Student>, DatabaseError> {
        let student = self
            .conn
            .query_row(
                "SELECT id, email, username FROM students WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Student {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        username: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(student)
    }

    pub fn list_students(&self) -> Result<Vec<Student>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, email, username FROM students ORDER BY username")?;
        let rows = stmt.query_map([], |row| {
            Ok(Student {
                id: row.get(0)?,
                email: row.get(1)?,
                username: row.get(2)?,
            })
        })?;
        let students = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(students)
    }

    // === Tasks ===

    pub fn create_task(&self, task: &Task) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO tasks (
                id, student_id, title, description, start_at, end_at, status,
                priority, reminder_sent, created_at, updated_at, completed_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                task.id,
                task.student_id,
                task.title,
                task.description,
                format_ts(task.window.start),
                format_ts(task.window.end),
                task.status.as_str(),
                task.priority.as_str(),
                task.reminder_sent,
                format_ts(task.created_at),
                format_ts(task.updated_at),
                task.completed_at.map(format_ts),
            ],
        )?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>, DatabaseError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![id], TaskRow::from_row)
            .optional()?;
        row.map(TaskRow::into_task).transpose()
    }

    /// All tasks, newest first.
    pub fn list_tasks(&self) -> Result<Vec<Task>, DatabaseError> {
        self.query_tasks("ORDER BY created_at DESC", params![])?
            .into_iter()
            .collect()
    }

    pub fn list_tasks_for_student(&self, student_id: &str) -> Result<Vec<Task>, DatabaseError> {
        self.query_tasks(
            "WHERE student_id = ?1 ORDER BY created_at DESC",
            params![student_id],
        )?
        .into_iter()
        .collect()
    }

    /// Mark a task completed by explicit action. Returns the updated task,
    /// or `None` if it does not exist.
    pub fn complete_task(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>, DatabaseError> {
        let Some(mut task) = self.get_task(id)? else {
            return Ok(None);
        };
        task.complete(now);
        self.conn.execute(
            "UPDATE tasks SET status = ?1, updated_at = ?2, completed_at = ?3 WHERE id = ?4",
            params![
                task.status.as_str(),
                format_ts(task.updated_at),
                task.completed_at.map(format_ts),
                task.id,
            ],
        )?;
        Ok(Some(task))
    }

    /// Delete a task. Returns whether a row was removed.
    pub fn delete_task(&self, id: &str) -> Result<bool, DatabaseError> {
        let n = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    /// A student's open tasks due within `horizon` of `now`, whether or not
    /// they were reminded.
    pub fn tasks_due_soon_for_student(
        &self,
        student_id: &str,
        now: DateTime<Utc>,
        horizon: Duration,
    ) -> Result<Vec<Task>, DatabaseError> {
        self.query_tasks(
            "WHERE student_id = ?1 AND end_at >= ?2 AND end_at <= ?3 AND status != 'COMPLETED'
             ORDER BY end_at",
            params![student_id, format_ts(now), format_ts(horizon_end(now, horizon))],
        )?
        .into_iter()
        .collect()
    }

    /// A student's tasks past their deadline and not completed.
    pub fn overdue_tasks_for_student(
        &self,
        student_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Task>, DatabaseError> {
        self.query_tasks(
            "WHERE student_id = ?1 AND end_at < ?2 AND status != 'COMPLETED' ORDER BY end_at",
            params![student_id, format_ts(now)],
        )?
        .into_iter()
        .collect()
    }

    fn query_tasks(
        &self,
        clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Loaded<Task>, DatabaseError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks {clause}");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params, TaskRow::from_row)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.into_task());
        }
        Ok(tasks)
    }

    // === Assessments ===

    pub fn create_assessment(&self, assessment: &Assessment) -> Result<(), DatabaseError> {
        let students_json = serde_json::to_string(&assessment.assigned_students)
            .map_err(|e| corrupt("assessments", &assessment.id, e))?;
        self.conn.execute(
            "INSERT INTO assessments (
                id, title, description, created_by, assigned_students,
                start_at, end_at, status, created_at, updated_at, completed_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                assessment.id,
                assessment.title,
                assessment.description,
                assessment.created_by,
                students_json,
                format_ts(assessment.window.start),
                format_ts(assessment.window.end),
                assessment.status.as_str(),
                format_ts(assessment.created_at),
                format_ts(assessment.updated_at),
                assessment.completed_at.map(format_ts),
            ],
        )?;
        Ok(())
    }

    pub fn get_assessment(&self, id: &str) -> Result<Option<Assessment>, DatabaseError> {
        let sql = format!("SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![id], AssessmentRow::from_row)
            .optional()?;
        row.map(AssessmentRow::into_assessment).transpose()
    }

    pub fn list_assessments(&self) -> Result<Vec<Assessment>, DatabaseError> {
        self.query_assessments()?.into_iter().collect()
    }

    pub fn delete_assessment(&self, id: &str) -> Result<bool, DatabaseError> {
        let n = self
            .conn
            .execute("DELETE FROM assessments WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    fn query_assessments(&self) -> Result<Loaded<Assessment>, DatabaseError> {
        let sql = format!("SELECT {ASSESSMENT_COLUMNS} FROM assessments ORDER BY start_at");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], AssessmentRow::from_row)?;
        let mut assessments = Vec::new();
        for row in rows {
            assessments.push(row?.into_assessment());
        }
        Ok(assessments)
    }

    // === Outbox ===

    pub fn append_outbox(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO reminder_outbox (recipient, subject, body, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![recipient, subject, body, format_ts(now)],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_outbox(&self) -> Result<Vec<OutboxEntry>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, recipient, subject, body, created_at FROM reminder_outbox ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut entries = Vec::new();
        for row in rows {
            let (id, recipient, subject, body, created_at) = row?;
            entries.push(OutboxEntry {
                created_at: parse_ts("reminder_outbox", &id.to_string(), &created_at)?,
                id,
                recipient,
                subject,
                body,
            });
        }
        Ok(entries)
    }

    /// Guarded status write on `table`: applies only while the stored status
    /// still equals `from`, and never overwrites an existing `completed_at`.
    fn write_status(
        &self,
        table: &'static str,
        id: &str,
        from: &str,
        to: &str,
        updated_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<WriteOutcome, DatabaseError> {
        let sql = format!(
            "UPDATE {table}
             SET status = ?1, updated_at = ?2, completed_at = COALESCE(completed_at, ?3)
             WHERE id = ?4 AND status = ?5"
        );
        let n = self.conn.execute(
            &sql,
            params![to, format_ts(updated_at), completed_at.map(format_ts), id, from],
        )?;
        if n > 0 {
            return Ok(WriteOutcome::Written);
        }
        self.missing_or_stale(table, id)
    }

    fn missing_or_stale(&self, table: &'static str, id: &str) -> Result<WriteOutcome, DatabaseError> {
        let sql = format!("SELECT 1 FROM {table} WHERE id = ?1");
        let exists = self
            .conn
            .query_row(&sql, params![id], |_| Ok(()))
            .optional()?
            .is_some();
        Ok(if exists {
            WriteOutcome::Stale
        } else {
            WriteOutcome::Missing
        })
    }
}

impl StatusStore<Task> for Database {
    fn list_all(&self) -> Result<Loaded<Task>, DatabaseError> {
        self.query_tasks("", params![])
    }

    fn save_status(
        &self,
        id: &str,
        change: &StatusChange<TaskStatus>,
    ) -> Result<WriteOutcome, DatabaseError> {
        self.write_status(
            "tasks",
            id,
            change.from.as_str(),
            change.to.as_str(),
            change.updated_at,
            change.completed_at,
        )
    }
}

impl StatusStore<Assessment> for Database {
    fn list_all(&self) -> Result<Loaded<Assessment>, DatabaseError> {
        self.query_assessments()
    }

    fn save_status(
        &self,
        id: &str,
        change: &StatusChange<AssessmentStatus>,
    ) -> Result<WriteOutcome, DatabaseError> {
        self.write_status(
            "assessments",
            id,
            change.from.as_str(),
            change.to.as_str(),
            change.updated_at,
            change.completed_at,
        )
    }
}

impl ReminderStore for Database {
    fn find_due_within(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Loaded<Task>, DatabaseError> {
        self.query_tasks(
            "WHERE end_at >= ?1 AND end_at <= ?2 AND status != 'COMPLETED' AND reminder_sent = 0
             ORDER BY end_at",
            params![format_ts(from), format_ts(to)],
        )
    }

    fn mark_reminded(&self, id: &str, at: DateTime<Utc>) -> Result<WriteOutcome, DatabaseError> {
        let n = self.conn.execute(
            "UPDATE tasks SET reminder_sent = 1, updated_at = ?1 WHERE id = ?2",
            params![format_ts(at), id],
        )?;
        if n > 0 {
            Ok(WriteOutcome::Written)
        } else {
            Ok(WriteOutcome::Missing)
        }
    }
}

impl StudentDirectory for Database {
    fn find_student(&self, id: &str) -> Result<Option<Student>, DatabaseError> {
        self.get_student(id)
    }
}
