//! Task management commands for CLI.

use chrono::{DateTime, Duration, Utc};
use clap::Subcommand;
use std::path::Path;

use smarteval_core::{Config, Database, Task, TaskPriority, TimeWindow};

use super::{parse_time, print_json, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Create {
        /// Task title
        title: String,
        /// Owning student ID
        #[arg(long)]
        student: String,
        /// Deadline (RFC 3339)
        #[arg(long, value_parser = parse_time)]
        end: DateTime<Utc>,
        /// Start of the task window (RFC 3339, default: now)
        #[arg(long, value_parser = parse_time)]
        start: Option<DateTime<Utc>>,
        /// Task description
        #[arg(long)]
        description: Option<String>,
        /// Priority: low, medium or high
        #[arg(long, default_value = "medium")]
        priority: TaskPriority,
    },
    /// List tasks
    List {
        /// Filter by student ID
        #[arg(long)]
        student: Option<String>,
    },
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// Mark a task completed
    Complete {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
    /// A student's open tasks due soon
    DueSoon {
        #[arg(long)]
        student: String,
        /// Look-ahead in hours (default: configured reminder horizon)
        #[arg(long)]
        hours: Option<u32>,
    },
    /// A student's tasks past their deadline
    Overdue {
        #[arg(long)]
        student: String,
    },
}

pub fn run(db: &Path, action: TaskAction) -> CliResult {
    let db = Database::open_at(db)?;
    let now = Utc::now();

    match action {
        TaskAction::Create {
            title,
            student,
            end,
            start,
            description,
            priority,
        } => {
            let window = TimeWindow::new(start.unwrap_or(now), end)?;
            let mut task = Task::new(student, title, window, now).with_priority(priority);
            if let Some(description) = description {
                task = task.with_description(description);
            }
            db.create_task(&task)?;
            println!("Task created: {}", task.id);
            print_json(&task)?;
        }
        TaskAction::List { student } => {
            let tasks = match student {
                Some(student) => db.list_tasks_for_student(&student)?,
                None => db.list_tasks()?,
            };
            print_json(&tasks)?;
        }
        TaskAction::Get { id } => {
            let task = db.get_task(&id)?.ok_or_else(|| format!("task not found: {id}"))?;
            print_json(&task)?;
        }
        TaskAction::Complete { id } => {
            let task = db
                .complete_task(&id, now)?
                .ok_or_else(|| format!("task not found: {id}"))?;
            println!("Task completed: {}", task.id);
        }
        TaskAction::Delete { id } => {
            if !db.delete_task(&id)? {
                return Err(format!("task not found: {id}").into());
            }
            println!("Task deleted: {id}");
        }
        TaskAction::DueSoon { student, hours } => {
            let horizon = match hours {
                Some(h) => Duration::hours(i64::from(h)),
                None => Config::load()?.scheduler.reminder_horizon(),
            };
            print_json(&db.tasks_due_soon_for_student(&student, now, horizon)?)?;
        }
        TaskAction::Overdue { student } => {
            print_json(&db.overdue_tasks_for_student(&student, now)?)?;
        }
    }
    Ok(())
}
