use std::path::Path;
use std::sync::Arc;

use smarteval_core::{Config, Database, Scheduler, SweepJobs, SystemClock};

use super::CliResult;

pub fn run(db: &Path) -> CliResult {
    let config = Config::load()?;
    // Fail fast on an unusable database instead of inside every job.
    Database::open_at(db)?;

    let jobs = Arc::new(SweepJobs::new(
        db,
        config.scheduler.clone(),
        config.notifier.kind,
        Arc::new(SystemClock),
    ));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let mut scheduler = Scheduler::new();
        jobs.register(&mut scheduler);
        tracing::info!(
            db = %db.display(),
            notifier = ?config.notifier.kind,
            task_expiry = ?config.scheduler.task_expiry,
            "scheduler running, press Ctrl-C to stop"
        );

        let signal = tokio::signal::ctrl_c().await;
        scheduler.shutdown().await;
        signal?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
