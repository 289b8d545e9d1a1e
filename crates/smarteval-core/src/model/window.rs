//! Time windows and the pure phase classification shared by every
//! time-windowed entity.
//!
//! ```text
//!            start                 end
//!   Before     |      Active        |     Ended
//! ─────────────[────────────────────[──────────────>  now
//! ```
//!
//! Both bounds are half-open on the right: `now == start` is already
//! `Active`, `now == end` is already `Ended`.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// The active window of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, rejecting `end < start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build a window without checking the bounds.
    ///
    /// Stored rows are taken as-is; an inverted window simply classifies as
    /// `Ended` once `now >= end`.
    pub fn unchecked(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn phase(&self, now: DateTime<Utc>) -> WindowPhase {
        classify_window(now, self)
    }

    /// Whether `end` lies in the closed interval `[from, to]`.
    pub fn ends_within(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        from <= self.end && self.end <= to
    }
}

/// Latest instant the store can keep in its fixed-width text columns.
pub fn latest_instant() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_micro_opt(23, 59, 59, 999_999))
        .map_or(DateTime::<Utc>::MAX_UTC, |naive| naive.and_utc())
}

/// `now + horizon`, saturating at [`latest_instant`].
pub fn horizon_end(now: DateTime<Utc>, horizon: Duration) -> DateTime<Utc> {
    let latest = latest_instant();
    now.checked_add_signed(horizon)
        .map_or(latest, |end| end.min(latest))
}

/// Where `now` falls relative to a [`TimeWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPhase {
    Before,
    Active,
    Ended,
}

/// Classify `now` against `window`. Pure and total.
pub fn classify_window(now: DateTime<Utc>, window: &TimeWindow) -> WindowPhase {
    if now < window.start {
        WindowPhase::Before
    } else if now < window.end {
        WindowPhase::Active
    } else {
        WindowPhase::Ended
    }
}

/// Entity collections swept by the engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Task,
    Assessment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Task => write!(f, "task"),
            EntityKind::Assessment => write!(f, "assessment"),
        }
    }
}

/// Shape shared by tasks and assessments: an id, a window and a status that
/// can be re-derived from the current instant.
pub trait TimeWindowed {
    type Status: Copy + Eq + fmt::Debug + fmt::Display + Serialize;

    /// Extra input the derivation needs beyond the clock, `()` if none.
    type Policy: Copy;

    const KIND: EntityKind;

    fn id(&self) -> &str;

    fn window(&self) -> &TimeWindow;

    /// The stored status.
    fn status(&self) -> Self::Status;

    /// The status this entity should have at `now`.
    fn derive_status(&self, now: DateTime<Utc>, policy: Self::Policy) -> Self::Status;

    /// Whether `status` is a completed state (stamps `completed_at`).
    fn is_completed(status: Self::Status) -> bool;
}
