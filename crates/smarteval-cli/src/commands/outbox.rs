use clap::Subcommand;
use std::path::Path;

use smarteval_core::Database;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum OutboxAction {
    /// List queued reminder messages
    List,
}

pub fn run(db: &Path, action: OutboxAction) -> CliResult {
    let db = Database::open_at(db)?;
    match action {
        OutboxAction::List => print_json(&db.list_outbox()?),
    }
}
