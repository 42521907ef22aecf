//! Latitude-weighted RMS distance between a reference pattern and every
//! archived day.
//!
//! The archive is read block by block. Each block carries a halo of extra
//! days on both sides so running means at block edges see their full window.
//! Days inside a block are independent and are evaluated on the rayon pool;
//! blocks are concatenated in date order.

use std::time::Instant;

use analogue_common::{
    AnalogueError, AnomalyArchive, BoundingBox, GridField, RegionIndices, Result,
};
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::DEFAULT_CHUNK_DAYS;
use crate::smoothing::RunningMean;
use crate::weighting::LatitudeWeighting;

/// Distance of one archived day to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceRecord {
    pub date: NaiveDate,
    pub distance: f64,
}

impl DistanceRecord {
    pub fn new(date: NaiveDate, distance: f64) -> Self {
        Self { date, distance }
    }

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

/// Knobs of the distance computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    pub weighting: LatitudeWeighting,
    pub smoothing: RunningMean,
    /// Fraction of region points that must be valid for a day to count.
    pub min_valid_fraction: f64,
    pub chunk_days: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            weighting: LatitudeWeighting::default(),
            smoothing: RunningMean::default(),
            min_valid_fraction: 1.0,
            chunk_days: DEFAULT_CHUNK_DAYS,
        }
    }
}

/// The region-sliced (and possibly smoothed) pattern being matched.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePattern {
    pub date: NaiveDate,
    pub values: Vec<f32>,
}

/// Result of comparing one candidate slice against the reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DayDistance {
    Valid(f64),
    /// Too few points valid in both candidate and reference.
    Insufficient { valid: usize, total: usize },
}

/// Weighted RMS difference over the points valid in both patterns.
///
/// `row_weights` holds one weight per latitude row; each row has `nlon`
/// points. The sum of squared differences is divided by the sum of the
/// broadcast weights of the contributing points. NaN, and `fill` when given,
/// mark missing points.
pub fn weighted_rms(
    candidate: &[f32],
    reference: &[f32],
    row_weights: &[f64],
    nlon: usize,
    fill: Option<f32>,
    min_valid_fraction: f64,
) -> DayDistance {
    let missing = |v: f32| v.is_nan() || fill == Some(v);
    let total = candidate.len();
    let mut valid = 0usize;
    let mut weighted_sq = 0.0f64;
    let mut weight_sum = 0.0f64;

    for (row, &w) in row_weights.iter().enumerate() {
        let span = row * nlon..(row + 1) * nlon;
        for (&c, &r) in candidate[span.clone()].iter().zip(&reference[span]) {
            if missing(c) || missing(r) {
                continue;
            }
            let diff = c as f64 - r as f64;
            weighted_sq += w * diff * diff;
            weight_sum += w;
            valid += 1;
        }
    }

    if total == 0 || (valid as f64) < min_valid_fraction * total as f64 || weight_sum <= 0.0 {
        return DayDistance::Insufficient { valid, total };
    }
    DayDistance::Valid((weighted_sq / weight_sum).sqrt())
}

/// Outcome of a full pass over the archive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceRun {
    /// One record per usable day, in date order.
    pub records: Vec<DistanceRecord>,
    /// Days dropped for missing data.
    pub insufficient: usize,
    /// Days whose smoothing window ran off the archive or across a gap.
    pub incomplete_window: usize,
}

impl DistanceRun {
    pub fn evaluated(&self) -> usize {
        self.records.len() + self.insufficient + self.incomplete_window
    }
}

enum DayOutcome {
    Record(DistanceRecord),
    Insufficient,
    IncompleteWindow,
}

/// Computes distances between a reference pattern and an archive.
pub struct DistanceEngine<'a> {
    archive: &'a dyn AnomalyArchive,
    region: RegionIndices,
    lats: Vec<f64>,
    lons: Vec<f64>,
    row_weights: Vec<f64>,
    options: EngineOptions,
}

impl<'a> DistanceEngine<'a> {
    /// Resolve `bbox` on the archive grid.
    ///
    /// Fails with `RegionOutOfBounds` when the box misses the archive.
    pub fn new(
        archive: &'a dyn AnomalyArchive,
        bbox: &BoundingBox,
        options: EngineOptions,
    ) -> Result<Self> {
        if options.chunk_days == 0 {
            return Err(AnalogueError::invalid_field("chunk_days", "must be > 0"));
        }
        let region = RegionIndices::resolve(archive.latitudes(), archive.longitudes(), bbox)?;
        let lats: Vec<f64> = region.lat.iter().map(|&i| archive.latitudes()[i]).collect();
        let lons: Vec<f64> = region.lon.iter().map(|&j| archive.longitudes()[j]).collect();
        let row_weights = options.weighting.weights(&lats);

        debug!(
            archive = %archive.describe(),
            nlat = lats.len(),
            nlon = lons.len(),
            crosses_seam = bbox.wraps(),
            "Resolved search region"
        );

        Ok(Self {
            archive,
            region,
            lats,
            lons,
            row_weights,
            options,
        })
    }

    pub fn region(&self) -> &RegionIndices {
        &self.region
    }

    pub fn latitudes(&self) -> &[f64] {
        &self.lats
    }

    pub fn longitudes(&self) -> &[f64] {
        &self.lons
    }

    pub fn row_weights(&self) -> &[f64] {
        &self.row_weights
    }

    /// Reference pattern on `date`, which must be on the archive time axis.
    pub fn reference(&self, date: NaiveDate) -> Result<ReferencePattern> {
        let unavailable = |reason: String| AnalogueError::ReferenceUnavailable { date, reason };

        let t = self
            .archive
            .dates()
            .binary_search(&date)
            .map_err(|_| unavailable("date is not in the archive".to_string()))?;

        let smoothing = self.options.smoothing;
        let lo = t.saturating_sub(smoothing.before());
        let hi = (t + smoothing.after() + 1).min(self.archive.len());
        let block = self.archive.read_block(lo, hi - lo, &self.region)?;

        let values = smoothing
            .pattern_at(&block, t - lo)
            .ok_or_else(|| {
                unavailable(format!(
                    "{}-day smoothing window does not fit the archive",
                    smoothing.window()
                ))
            })?
            .iter()
            .map(|&v| if block.is_missing(v) { f32::NAN } else { v })
            .collect::<Vec<f32>>();

        let total = values.len();
        let valid = values.iter().filter(|v| !v.is_nan()).count();
        if (valid as f64) < self.options.min_valid_fraction * total as f64 {
            return Err(unavailable(format!(
                "only {} of {} region points are valid",
                valid, total
            )));
        }

        Ok(ReferencePattern { date, values })
    }

    /// Distance of every archived day to `reference`.
    pub fn compute(&self, reference: &ReferencePattern) -> Result<DistanceRun> {
        let started = Instant::now();
        let n = self.archive.len();
        let smoothing = self.options.smoothing;
        let mut run = DistanceRun::default();

        let mut start = 0;
        while start < n {
            let end = (start + self.options.chunk_days).min(n);
            let lo = start.saturating_sub(smoothing.before());
            let hi = (end + smoothing.after()).min(n);
            let block = self.archive.read_block(lo, hi - lo, &self.region)?;

            let outcomes: Vec<DayOutcome> = (start..end)
                .into_par_iter()
                .map(|t| self.evaluate(&block, t - lo, reference))
                .collect();

            for outcome in outcomes {
                match outcome {
                    DayOutcome::Record(record) => run.records.push(record),
                    DayOutcome::Insufficient => run.insufficient += 1,
                    DayOutcome::IncompleteWindow => run.incomplete_window += 1,
                }
            }

            debug!(start = start, end = end, "Evaluated archive block");
            start = end;
        }

        metrics::counter!("analogue_days_evaluated_total").increment(run.evaluated() as u64);
        metrics::counter!("analogue_days_dropped_total", "reason" => "insufficient_data")
            .increment(run.insufficient as u64);
        metrics::counter!("analogue_days_dropped_total", "reason" => "incomplete_window")
            .increment(run.incomplete_window as u64);
        metrics::histogram!("analogue_distance_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        info!(
            reference = %reference.date,
            days = run.records.len(),
            insufficient = run.insufficient,
            incomplete_window = run.incomplete_window,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Computed analogue distances"
        );

        Ok(run)
    }

    fn evaluate(&self, block: &GridField, t: usize, reference: &ReferencePattern) -> DayOutcome {
        let Some(date) = block.date(t) else {
            return DayOutcome::IncompleteWindow;
        };
        let Some(pattern) = self.options.smoothing.pattern_at(block, t) else {
            return DayOutcome::IncompleteWindow;
        };

        match weighted_rms(
            &pattern,
            &reference.values,
            &self.row_weights,
            self.lons.len(),
            block.fill_value(),
            self.options.min_valid_fraction,
        ) {
            DayDistance::Valid(distance) => DayOutcome::Record(DistanceRecord::new(date, distance)),
            DayDistance::Insufficient { .. } => DayOutcome::Insufficient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analogue_common::InMemoryArchive;
    use test_utils::{assert_approx_eq, daily_dates, uniform_days, ymd};

    #[test]
    fn test_weighted_rms_uses_weight_sum() {
        // Two rows: weights 1 and 0.5, one column each.
        let d = weighted_rms(&[3.0, 0.0], &[0.0, 0.0], &[1.0, 0.5], 1, None, 1.0);
        match d {
            DayDistance::Valid(v) => assert_approx_eq!(v, (9.0f64 / 1.5).sqrt(), 1e-12),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_weighted_rms_identical_is_zero() {
        let p = [1.5, -2.0, 0.25, 4.0];
        assert_eq!(
            weighted_rms(&p, &p, &[0.3, 0.9], 2, None, 1.0),
            DayDistance::Valid(0.0)
        );
    }

    #[test]
    fn test_weighted_rms_missing_point_drops_day_by_default() {
        let d = weighted_rms(&[1.0, f32::NAN], &[0.0, 0.0], &[1.0], 2, None, 1.0);
        assert_eq!(d, DayDistance::Insufficient { valid: 1, total: 2 });

        // A looser threshold keeps it, using the valid point only.
        let d = weighted_rms(&[1.0, f32::NAN], &[0.0, 0.0], &[1.0], 2, None, 0.5);
        assert_eq!(d, DayDistance::Valid(1.0));
    }

    #[test]
    fn test_weighted_rms_fill_value_is_missing() {
        let d = weighted_rms(&[-999.0, 2.0], &[0.0, 0.0], &[1.0], 2, Some(-999.0), 1.0);
        assert_eq!(d, DayDistance::Insufficient { valid: 1, total: 2 });
    }

    #[test]
    fn test_chunking_does_not_change_results() {
        let dates = daily_dates(ymd(2000, 1, 1), 40);
        let day_values: Vec<f32> = (0..40).map(|i| ((i * 7) % 11) as f32).collect();
        let field = GridField::new_3d(
            uniform_days(&day_values, 6),
            vec![10.0, 0.0],
            vec![0.0, 1.0, 2.0],
            dates,
        )
        .unwrap();
        let archive = InMemoryArchive::new(field).unwrap();
        let bbox = BoundingBox::global();

        let run_with = |chunk_days: usize, window: u32| {
            let options = EngineOptions {
                chunk_days,
                smoothing: RunningMean::new(window).unwrap(),
                ..EngineOptions::default()
            };
            let engine = DistanceEngine::new(&archive, &bbox, options).unwrap();
            let reference = engine.reference(ymd(2000, 1, 20)).unwrap();
            engine.compute(&reference).unwrap()
        };

        for window in [1, 3, 4] {
            let whole = run_with(1000, window);
            for chunk in [1, 3, 7] {
                assert_eq!(run_with(chunk, window), whole, "chunk {} window {}", chunk, window);
            }
        }

        let smoothed = run_with(5, 3);
        assert_eq!(smoothed.records.len(), 38);
        assert_eq!(smoothed.incomplete_window, 2);
    }
}
