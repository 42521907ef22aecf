//! Top-N analogue selection.

use std::cmp::Ordering;

use analogue_common::calendar::days_between;
use analogue_common::{AnalogueError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_N_ANALOGUES;
use crate::distance::DistanceRecord;
use crate::partition::Period;

/// One selected analogue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalogueResult {
    pub date: NaiveDate,
    pub distance: f64,
    pub period: Period,
    /// 1-based, ascending distance within the period.
    pub rank: usize,
}

impl AnalogueResult {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn day(&self) -> u32 {
        self.date.day()
    }
}

/// Ascending distance, earlier date first on ties.
pub fn rank_order(a: &DistanceRecord, b: &DistanceRecord) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.date.cmp(&b.date))
}

/// Picks the closest records of one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalogueSelector {
    n_analogues: usize,
    min_separation_days: u32,
}

impl Default for AnalogueSelector {
    fn default() -> Self {
        Self {
            n_analogues: DEFAULT_N_ANALOGUES,
            min_separation_days: 0,
        }
    }
}

impl AnalogueSelector {
    pub fn new(n_analogues: usize) -> Result<Self> {
        if n_analogues == 0 {
            return Err(AnalogueError::invalid_field("n_analogues", "must be > 0"));
        }
        Ok(Self {
            n_analogues,
            min_separation_days: 0,
        })
    }

    /// Reject candidates closer than `days` to an already selected analogue.
    pub fn with_min_separation(mut self, days: u32) -> Self {
        self.min_separation_days = days;
        self
    }

    pub fn n_analogues(&self) -> usize {
        self.n_analogues
    }

    /// Up to `n_analogues` records, ranked from 1.
    ///
    /// Fewer records than requested, or none, is not an error.
    pub fn select(&self, records: &[DistanceRecord], period: Period) -> Vec<AnalogueResult> {
        let mut sorted = records.to_vec();
        sorted.sort_by(rank_order);

        let mut chosen: Vec<DistanceRecord> = Vec::with_capacity(self.n_analogues);
        for record in sorted {
            if chosen.len() == self.n_analogues {
                break;
            }
            if self.min_separation_days > 0 && self.too_close(&chosen, record.date) {
                continue;
            }
            chosen.push(record);
        }

        chosen
            .into_iter()
            .enumerate()
            .map(|(i, record)| AnalogueResult {
                date: record.date,
                distance: record.distance,
                period,
                rank: i + 1,
            })
            .collect()
    }

    fn too_close(&self, chosen: &[DistanceRecord], date: NaiveDate) -> bool {
        let min = i64::from(self.min_separation_days);
        chosen
            .iter()
            .any(|c| days_between(c.date, date).abs() < min)
    }
}
