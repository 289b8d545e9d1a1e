//! Status sweep: re-derive every entity's status from the current instant
//! and persist the ones that moved.
//!
//! The sweep is level-triggered. It compares the stored status with the
//! status the window implies at `now`, so a missed run is healed by the next
//! one and a repeated run at the same instant writes nothing.

use chrono::{DateTime, Utc};

use super::outcome::{EntityOutcome, SkipReason, SweepSummary};
use super::{log_summary, row_id};
use crate::clock::Clock;
use crate::error::DatabaseError;
use crate::model::{Assessment, Task, TaskExpiryPolicy, TimeWindowed};
use crate::storage::{StatusChange, StatusStore, WriteOutcome};

/// Applies time-derived status transitions to tasks and assessments.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusEngine {
    expiry: TaskExpiryPolicy,
}

impl StatusEngine {
    pub fn new(expiry: TaskExpiryPolicy) -> Self {
        Self { expiry }
    }

    pub fn expiry(&self) -> TaskExpiryPolicy {
        self.expiry
    }

    /// Sweep every entity of kind `E`, deriving with `policy`.
    ///
    /// # Errors
    /// Only when the store cannot list the entities. Per-entity problems are
    /// recorded in the returned summary.
    pub fn sweep<E, S>(
        clock: &dyn Clock,
        store: &S,
        policy: E::Policy,
    ) -> Result<SweepSummary, DatabaseError>
    where
        E: TimeWindowed,
        S: StatusStore<E> + ?Sized,
    {
        let now = clock.now();
        let mut summary = SweepSummary::new(E::KIND, now);

        let entities = store.list_all().map_err(|e| {
            tracing::error!(kind = %E::KIND, error = %e, "status sweep aborted");
            e
        })?;

        for loaded in entities {
            match loaded {
                Ok(entity) => {
                    let outcome = Self::apply(now, &entity, store, policy);
                    summary.record(entity.id(), outcome);
                }
                Err(e) => {
                    tracing::warn!(kind = %E::KIND, error = %e, "skipping unreadable row");
                    summary.record(row_id(&e), EntityOutcome::failed(&e));
                }
            }
        }

        log_summary("status", &summary);
        Ok(summary)
    }

    pub fn sweep_tasks<S>(&self, clock: &dyn Clock, store: &S) -> Result<SweepSummary, DatabaseError>
    where
        S: StatusStore<Task> + ?Sized,
    {
        Self::sweep::<Task, S>(clock, store, self.expiry)
    }

    pub fn sweep_assessments<S>(
        &self,
        clock: &dyn Clock,
        store: &S,
    ) -> Result<SweepSummary, DatabaseError>
    where
        S: StatusStore<Assessment> + ?Sized,
    {
        Self::sweep::<Assessment, S>(clock, store, ())
    }

    fn apply<E, S>(now: DateTime<Utc>, entity: &E, store: &S, policy: E::Policy) -> EntityOutcome
    where
        E: TimeWindowed,
        S: StatusStore<E> + ?Sized,
    {
        let existing = entity.status();
        let derived = entity.derive_status(now, policy);
        if derived == existing {
            return EntityOutcome::Unchanged;
        }

        let change = StatusChange {
            from: existing,
            to: derived,
            updated_at: now,
            completed_at: E::is_completed(derived).then_some(now),
        };

        match store.save_status(entity.id(), &change) {
            Ok(WriteOutcome::Written) => {
                tracing::info!(
                    kind = %E::KIND,
                    id = entity.id(),
                    from = %existing,
                    to = %derived,
                    at = %now,
                    "status transition"
                );
                EntityOutcome::updated(existing, derived)
            }
            Ok(WriteOutcome::Missing) => {
                tracing::debug!(kind = %E::KIND, id = entity.id(), "entity deleted during sweep");
                EntityOutcome::skipped(SkipReason::Vanished)
            }
            Ok(WriteOutcome::Stale) => {
                tracing::debug!(kind = %E::KIND, id = entity.id(), "status changed during sweep");
                EntityOutcome::skipped(SkipReason::Stale)
            }
            Err(e) => {
                tracing::warn!(
                    kind = %E::KIND,
                    id = entity.id(),
                    error = %e,
                    "failed to persist status"
                );
                EntityOutcome::failed(&e)
            }
        }
    }
}
