//! Past/present labelling of distance records.

use std::fmt;

use analogue_common::calendar::within_days;
use analogue_common::{AnalogueError, Result, YearRange};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{PeriodFilter, Periods};
use crate::distance::DistanceRecord;

/// Climate period an analogue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Past,
    Present,
}

impl Period {
    pub const ALL: [Period; 2] = [Period::Past, Period::Present];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Past => "past",
            Period::Present => "present",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a single date ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    In(Period),
    /// The snapshot date itself.
    Snapshot,
    /// Inside the present period but within the exclusion window.
    ExclusionWindow,
    /// In neither period.
    Outside,
    /// In a period the search was not asked for.
    Filtered,
}

/// Records split by period, with counts of what was left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub past: Vec<DistanceRecord>,
    pub present: Vec<DistanceRecord>,
    pub snapshot: usize,
    pub exclusion_window: usize,
    pub outside: usize,
    pub filtered: usize,
}

impl Partition {
    pub fn period(&self, period: Period) -> &[DistanceRecord] {
        match period {
            Period::Past => &self.past,
            Period::Present => &self.present,
        }
    }
}

/// Stateless labelling pass applying the exclusion rules.
///
/// The snapshot date is excluded from both periods. The `±window` days
/// around it are excluded from the present period only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodPartitioner {
    periods: Periods,
    snapshot: NaiveDate,
    exclusion_window_days: u32,
    filter: PeriodFilter,
}

impl PeriodPartitioner {
    pub fn new(
        past: YearRange,
        present: YearRange,
        snapshot: NaiveDate,
        exclusion_window_days: u32,
    ) -> Result<Self> {
        past.validate("periods.past")?;
        present.validate("periods.present")?;
        if past.overlaps(&present) {
            return Err(AnalogueError::invalid_field(
                "periods",
                format!("past {} and present {} overlap", past, present),
            ));
        }
        Ok(Self {
            periods: Periods { past, present },
            snapshot,
            exclusion_window_days,
            filter: PeriodFilter::Both,
        })
    }

    /// Only label records for the periods `filter` includes.
    pub fn with_filter(mut self, filter: PeriodFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn snapshot(&self) -> NaiveDate {
        self.snapshot
    }

    pub fn place(&self, date: NaiveDate) -> Placement {
        if date == self.snapshot {
            return Placement::Snapshot;
        }
        let period = if self.periods.past.contains(date) {
            Period::Past
        } else if self.periods.present.contains(date) {
            Period::Present
        } else {
            return Placement::Outside;
        };
        if !self.filter.includes(period) {
            return Placement::Filtered;
        }
        if period == Period::Present && within_days(date, self.snapshot, self.exclusion_window_days)
        {
            return Placement::ExclusionWindow;
        }
        Placement::In(period)
    }

    /// Split `records`, keeping their order within each period.
    pub fn partition(&self, records: &[DistanceRecord]) -> Partition {
        let mut out = Partition::default();
        for record in records {
            match self.place(record.date) {
                Placement::In(Period::Past) => out.past.push(*record),
                Placement::In(Period::Present) => out.present.push(*record),
                Placement::Snapshot => out.snapshot += 1,
                Placement::ExclusionWindow => out.exclusion_window += 1,
                Placement::Outside => out.outside += 1,
                Placement::Filtered => out.filtered += 1,
            }
        }
        out
    }
}
