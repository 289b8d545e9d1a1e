//! Per-entity results and sweep summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::EntityKind;

/// Why an entity was passed over without being counted as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Deleted between the read and the write.
    Vanished,
    /// Status changed by someone else between the read and the write.
    Stale,
    /// Owning student could not be resolved.
    MissingOwner,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Vanished => write!(f, "vanished"),
            SkipReason::Stale => write!(f, "stale"),
            SkipReason::MissingOwner => write!(f, "missing owner"),
        }
    }
}

/// What a sweep did with one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EntityOutcome {
    Unchanged,
    Updated { from: String, to: String },
    Reminded,
    Skipped { reason: SkipReason },
    Failed { error: String },
}

impl EntityOutcome {
    pub fn updated(from: impl fmt::Display, to: impl fmt::Display) -> Self {
        EntityOutcome::Updated {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn skipped(reason: SkipReason) -> Self {
        EntityOutcome::Skipped { reason }
    }

    pub fn failed(error: impl fmt::Display) -> Self {
        EntityOutcome::Failed {
            error: error.to_string(),
        }
    }
}

/// Result of one sweep over one entity kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSummary {
    pub kind: EntityKind,
    pub started_at: DateTime<Utc>,
    pub scanned: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub reminded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// `(entity id, outcome)` in processing order.
    pub outcomes: Vec<(String, EntityOutcome)>,
}

impl SweepSummary {
    pub fn new(kind: EntityKind, started_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            started_at,
            scanned: 0,
            updated: 0,
            unchanged: 0,
            reminded: 0,
            skipped: 0,
            failed: 0,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, id: impl Into<String>, outcome: EntityOutcome) {
        self.scanned += 1;
        match &outcome {
            EntityOutcome::Unchanged => self.unchanged += 1,
            EntityOutcome::Updated { .. } => self.updated += 1,
            EntityOutcome::Reminded => self.reminded += 1,
            EntityOutcome::Skipped { .. } => self.skipped += 1,
            EntityOutcome::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push((id.into(), outcome));
    }

    /// No entity failed.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Something was written or went wrong.
    pub fn is_eventful(&self) -> bool {
        self.updated + self.reminded + self.skipped + self.failed > 0
    }

    pub fn outcome_of(&self, id: &str) -> Option<&EntityOutcome> {
        self.outcomes
            .iter()
            .find(|(entity, _)| entity == id)
            .map(|(_, outcome)| outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn record_keeps_counts_in_step() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut summary = SweepSummary::new(EntityKind::Task, at);
        summary.record("a", EntityOutcome::Unchanged);
        summary.record("b", EntityOutcome::updated("PENDING", "ONGOING"));
        summary.record("c", EntityOutcome::skipped(SkipReason::Vanished));
        summary.record("d", EntityOutcome::failed("disk full"));

        assert_eq!(summary.scanned, 4);
        assert_eq!(
            (summary.unchanged, summary.updated, summary.skipped, summary.failed),
            (1, 1, 1, 1)
        );
        assert!(!summary.is_clean());
        assert!(summary.is_eventful());
        assert_eq!(
            summary.outcome_of("b"),
            Some(&EntityOutcome::Updated {
                from: "PENDING".into(),
                to: "ONGOING".into()
            })
        );
    }

    #[test]
    fn quiet_sweep_is_clean_and_uneventful() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut summary = SweepSummary::new(EntityKind::Assessment, at);
        summary.record("a", EntityOutcome::Unchanged);
        assert!(summary.is_clean());
        assert!(!summary.is_eventful());
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let json = serde_json::to_value(EntityOutcome::skipped(SkipReason::MissingOwner)).unwrap();
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["reason"], "missing_owner");
    }
}
