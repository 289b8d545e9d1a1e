//! One-shot sweeps, printed as JSON.

use clap::{Subcommand, ValueEnum};
use std::path::Path;
use std::sync::Arc;

use smarteval_core::{Config, SweepJobs, SystemClock};

use super::{print_json, CliResult};

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Task,
    Assessment,
    All,
}

#[derive(Subcommand)]
pub enum SweepAction {
    /// Re-derive status from the current time
    Status {
        #[arg(long, value_enum, default_value = "all")]
        kind: KindArg,
    },
    /// Send reminders for tasks due soon
    Reminders {
        /// Override the configured reminder horizon
        #[arg(long)]
        horizon_hours: Option<u32>,
    },
    /// Show where every assessment stands
    Report,
}

pub fn run(db: &Path, action: SweepAction) -> CliResult {
    let mut config = Config::load()?;
    if let SweepAction::Reminders {
        horizon_hours: Some(hours),
    } = action
    {
        config.scheduler.reminder_horizon_hours = hours;
        config.scheduler.validate()?;
    }
    let jobs = SweepJobs::new(
        db,
        config.scheduler,
        config.notifier.kind,
        Arc::new(SystemClock),
    );

    match action {
        SweepAction::Status { kind } => match kind {
            KindArg::Task => print_json(&jobs.task_status_sweep()?),
            KindArg::Assessment => print_json(&jobs.assessment_status_sweep()?),
            KindArg::All => {
                let mut summaries = Vec::new();
                let mut errors = Vec::new();
                for result in jobs.status_sweep() {
                    match result {
                        Ok(summary) => summaries.push(summary),
                        Err(e) => errors.push(e.to_string()),
                    }
                }
                print_json(&summaries)?;
                if errors.is_empty() {
                    Ok(())
                } else {
                    Err(errors.join("; ").into())
                }
            }
        },
        SweepAction::Reminders { .. } => print_json(&jobs.reminder_sweep()?),
        SweepAction::Report => print_json(&jobs.report()?),
    }
}
