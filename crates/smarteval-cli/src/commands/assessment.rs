use chrono::{DateTime, Utc};
use clap::Subcommand;
use std::path::Path;

use smarteval_core::{Assessment, Database, TimeWindow};

use super::{parse_time, print_json, CliResult};

#[derive(Subcommand)]
pub enum AssessmentAction {
    /// Create a new assessment
    Create {
        /// Assessment title
        title: String,
        /// Professor ID
        #[arg(long)]
        created_by: String,
        /// Opens at (RFC 3339)
        #[arg(long, value_parser = parse_time)]
        start: DateTime<Utc>,
        /// Closes at (RFC 3339)
        #[arg(long, value_parser = parse_time)]
        end: DateTime<Utc>,
        /// Comma-separated student IDs
        #[arg(long)]
        students: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List assessments
    List,
    /// Get assessment details
    Get { id: String },
    /// Delete an assessment
    Delete { id: String },
}

pub fn run(db: &Path, action: AssessmentAction) -> CliResult {
    let db = Database::open_at(db)?;

    match action {
        AssessmentAction::Create {
            title,
            created_by,
            start,
            end,
            students,
            description,
        } => {
            let window = TimeWindow::new(start, end)?;
            let students = students
                .map(|s| {
                    s.split(',')
                        .map(|id| id.trim().to_string())
                        .filter(|id| !id.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            let mut assessment =
                Assessment::new(created_by, title, window, Utc::now()).with_students(students);
            if let Some(description) = description {
                assessment = assessment.with_description(description);
            }
            db.create_assessment(&assessment)?;
            println!("Assessment created: {}", assessment.id);
            print_json(&assessment)?;
        }
        AssessmentAction::List => print_json(&db.list_assessments()?)?,
        AssessmentAction::Get { id } => {
            let assessment = db
                .get_assessment(&id)?
                .ok_or_else(|| format!("assessment not found: {id}"))?;
            print_json(&assessment)?;
        }
        AssessmentAction::Delete { id } => {
            if !db.delete_assessment(&id)? {
                return Err(format!("assessment not found: {id}").into());
            }
            println!("Assessment deleted: {id}");
        }
    }
    Ok(())
}
