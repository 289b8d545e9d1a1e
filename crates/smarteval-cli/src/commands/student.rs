use clap::Subcommand;
use std::path::Path;

use smarteval_core::{Database, Student};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum StudentAction {
    /// Add or update a student
    Add {
        /// Student ID
        id: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
    },
    /// List students
    List,
}

pub fn run(db: &Path, action: StudentAction) -> CliResult {
    let db = Database::open_at(db)?;

    match action {
        StudentAction::Add {
            id,
            email,
            username,
        } => {
            db.upsert_student(&Student::new(id, email, username))?;
            println!("ok");
        }
        StudentAction::List => print_json(&db.list_students()?)?,
    }
    Ok(())
}
