//! Non-fatal conditions collected during a search.

use std::fmt;

use chrono::NaiveDate;

use crate::partition::Period;

/// Something worth reporting that did not stop the search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchWarning {
    /// Days dropped because too many region points were missing.
    InsufficientData { dropped_days: usize },
    /// Days dropped because their smoothing window ran past the archive edge
    /// or over a missing day.
    IncompleteWindow { dropped_days: usize },
    /// A period produced fewer analogues than requested (possibly none).
    EmptyPeriod {
        period: Period,
        found: usize,
        requested: usize,
    },
    /// The snapshot date was not archived; the nearest archived day was used.
    SnapshotShifted {
        requested: NaiveDate,
        actual: NaiveDate,
    },
}

impl SearchWarning {
    /// Short machine-friendly kind, matching the error kinds.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchWarning::InsufficientData { .. } => "InsufficientDataWarning",
            SearchWarning::IncompleteWindow { .. } => "IncompleteWindowWarning",
            SearchWarning::EmptyPeriod { .. } => "EmptyPeriodWarning",
            SearchWarning::SnapshotShifted { .. } => "SnapshotShiftedWarning",
        }
    }
}

impl fmt::Display for SearchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchWarning::InsufficientData { dropped_days } => write!(
                f,
                "{} archive day(s) dropped for missing data in the region",
                dropped_days
            ),
            SearchWarning::IncompleteWindow { dropped_days } => write!(
                f,
                "{} archive day(s) dropped for an incomplete smoothing window",
                dropped_days
            ),
            SearchWarning::EmptyPeriod {
                period,
                found,
                requested,
            } if *found == 0 => write!(
                f,
                "no {} analogues found ({} requested)",
                period, requested
            ),
            SearchWarning::EmptyPeriod {
                period,
                found,
                requested,
            } => write!(
                f,
                "only {} of {} {} analogues found",
                found, requested, period
            ),
            SearchWarning::SnapshotShifted { requested, actual } => write!(
                f,
                "snapshot {} not in archive, using nearest day {}",
                requested, actual
            ),
        }
    }
}
