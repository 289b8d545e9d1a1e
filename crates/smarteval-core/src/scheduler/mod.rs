//! Periodic job runner.
//!
//! Each job gets its own loop on a tokio interval. The first firing is
//! immediate, later firings follow the period measured from start, and a run
//! that overruns its period delays the next one instead of bursting. Jobs
//! are blocking closures executed on the blocking pool; a loop awaits its
//! job before waiting for the next tick, so runs of one job never overlap.
//!
//! ```rust,ignore
//! let mut scheduler = Scheduler::new();
//! scheduler.spawn("task-status", Duration::from_secs(60), move || jobs.run_task_status());
//! // ...
//! scheduler.shutdown().await;
//! ```

pub mod jobs;

pub use jobs::SweepJobs;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Owns the job loops and stops them together.
pub struct Scheduler {
    cancel: CancellationToken,
    loops: Vec<(String, JoinHandle<()>)>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            loops: Vec::new(),
        }
    }

    /// Number of running job loops.
    pub fn job_count(&self) -> usize {
        self.loops.len()
    }

    /// Token cancelled by [`shutdown`](Self::shutdown).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Start a loop running `job` every `period`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&mut self, name: impl Into<String>, period: Duration, job: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let name = name.into();
        let handle = tokio::spawn(run_loop(
            name.clone(),
            period,
            Arc::new(job),
            self.cancel.clone(),
        ));
        self.loops.push((name, handle));
    }

    /// Cancel every loop and wait for them to exit. A job that is running
    /// finishes first.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for (name, handle) in self.loops {
            if let Err(e) = handle.await {
                error!(job = %name, error = %e, "job loop ended abnormally");
            }
        }
        info!("scheduler stopped");
    }
}

async fn run_loop<F>(name: String, period: Duration, job: Arc<F>, cancel: CancellationToken)
where
    F: Fn() + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(job = %name, period_secs = period.as_secs(), "job scheduled");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let run = Arc::clone(&job);
        match tokio::task::spawn_blocking(move || run()).await {
            Ok(()) => {}
            Err(e) if e.is_panic() => error!(job = %name, "job panicked"),
            Err(e) => error!(job = %name, error = %e, "job did not complete"),
        }
    }

    info!(job = %name, "job stopped");
}
