//! Centered running-mean smoothing along the time axis.
//!
//! A window of `n` days covers `(n - 1) / 2` days before the target day and
//! `n / 2` days after it, so even windows lean one day into the future. The
//! window must land on consecutive calendar days; a smoothed point is missing
//! if any contributing day is missing there.

use std::borrow::Cow;

use analogue_common::{AnalogueError, GridField, Result};

/// Running mean over a fixed number of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunningMean {
    window: usize,
}

impl Default for RunningMean {
    fn default() -> Self {
        Self { window: 1 }
    }
}

impl RunningMean {
    pub fn new(window_days: u32) -> Result<Self> {
        if window_days == 0 {
            return Err(AnalogueError::invalid_field(
                "smoothing.window_days",
                "must be >= 1",
            ));
        }
        Ok(Self {
            window: window_days as usize,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Days needed before the target day.
    pub fn before(&self) -> usize {
        (self.window - 1) / 2
    }

    /// Days needed after the target day.
    pub fn after(&self) -> usize {
        self.window / 2
    }

    pub fn is_identity(&self) -> bool {
        self.window == 1
    }

    /// Pattern of day `t` of `block`, smoothed if the window is wider than a day.
    ///
    /// Returns None when the window does not fit inside the block or spans a
    /// gap in the calendar. Missing points come back as NaN.
    pub fn pattern_at<'a>(&self, block: &'a GridField, t: usize) -> Option<Cow<'a, [f32]>> {
        if self.is_identity() {
            return block.slice(t).map(Cow::Borrowed);
        }
        if t < self.before() || t + self.after() >= block.ntime() {
            return None;
        }
        let first = t - self.before();
        let last = t + self.after();

        // Strictly increasing dates: consecutive iff the span is window - 1 days.
        let span = (block.date(last)? - block.date(first)?).num_days();
        if span != self.window as i64 - 1 {
            return None;
        }

        let n = block.slice_len();
        let mut sums = vec![0.0f64; n];
        let mut missing = vec![false; n];
        for day in first..=last {
            let slice = block.slice(day)?;
            for (k, &v) in slice.iter().enumerate() {
                if block.is_missing(v) {
                    missing[k] = true;
                } else {
                    sums[k] += v as f64;
                }
            }
        }

        let window = self.window as f64;
        let values = sums
            .iter()
            .zip(&missing)
            .map(|(&sum, &gap)| if gap { f32::NAN } else { (sum / window) as f32 })
            .collect();
        Some(Cow::Owned(values))
    }
}
