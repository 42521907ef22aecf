//! Synthetic anomaly data for tests.
//!
//! These generators create predictable, verifiable patterns. Values are laid
//! out row-major as `[day][lat][lon]`, matching the workspace grid layout.

use chrono::{Duration, NaiveDate};

/// Calendar date from year, month, day. Panics on an invalid date.
pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("invalid test date")
}

/// A regular coordinate axis: `start, start + step, ...` with `n` points.
///
/// ```
/// use test_utils::regular_axis;
///
/// assert_eq!(regular_axis(90.0, -45.0, 5), vec![90.0, 45.0, 0.0, -45.0, -90.0]);
/// ```
pub fn regular_axis(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// `n` consecutive calendar days starting at `start`.
pub fn daily_dates(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    (0..n).map(|i| start + Duration::days(i as i64)).collect()
}

/// Every day from `first` to `last` inclusive.
pub fn date_span(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let n = (last - first).num_days() + 1;
    daily_dates(first, n.max(0) as usize)
}

/// A grid where each cell value is `row * 1000 + col`.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(3, 2);
/// assert_eq!(grid, vec![0.0, 1.0, 2.0, 1000.0, 1001.0, 1002.0]);
/// ```
pub fn create_test_grid(nlat: usize, nlon: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(nlat * nlon);
    for row in 0..nlat {
        for col in 0..nlon {
            data.push((row * 1000 + col) as f32);
        }
    }
    data
}

/// One uniform slice per day, each filled with that day's value.
///
/// Against a uniform reference `r`, the weighted RMS distance of day `t`
/// is exactly `|day_values[t] - r|`, whatever the weights are. This makes
/// hand-computed distance scenarios easy to build.
pub fn uniform_days(day_values: &[f32], points_per_day: usize) -> Vec<f32> {
    day_values
        .iter()
        .flat_map(|&v| std::iter::repeat(v).take(points_per_day))
        .collect()
}

/// A smooth wave pattern for one day; `phase` shifts it in longitude.
pub fn wave_slice(nlat: usize, nlon: usize, phase: f64) -> Vec<f32> {
    let mut data = Vec::with_capacity(nlat * nlon);
    for row in 0..nlat {
        let y = row as f64 / nlat.max(1) as f64 * std::f64::consts::PI;
        for col in 0..nlon {
            let x = col as f64 / nlon.max(1) as f64 * 2.0 * std::f64::consts::PI;
            data.push((y.sin() * (x + phase).cos() * 10.0) as f32);
        }
    }
    data
}

/// A deterministic daily series of wave patterns whose phase drifts by
/// `phase_step` radians per day.
pub fn wave_series(ndays: usize, nlat: usize, nlon: usize, phase_step: f64) -> Vec<f32> {
    (0..ndays)
        .flat_map(|t| wave_slice(nlat, nlon, t as f64 * phase_step))
        .collect()
}

/// Overwrite the given flat indices with NaN.
pub fn inject_missing(values: &mut [f32], indices: &[usize]) {
    for &i in indices {
        if let Some(v) = values.get_mut(i) {
            *v = f32::NAN;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_dates_cross_leap_day() {
        let dates = daily_dates(ymd(2020, 2, 28), 3);
        assert_eq!(dates, vec![ymd(2020, 2, 28), ymd(2020, 2, 29), ymd(2020, 3, 1)]);
    }

    #[test]
    fn test_date_span_is_inclusive() {
        let span = date_span(ymd(2019, 12, 30), ymd(2020, 1, 2));
        assert_eq!(span.len(), 4);
        assert!(date_span(ymd(2020, 1, 2), ymd(2020, 1, 1)).is_empty());
    }

    #[test]
    fn test_uniform_days_layout() {
        let values = uniform_days(&[1.0, 2.0], 3);
        assert_eq!(values, vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_wave_series_shape_and_determinism() {
        let a = wave_series(4, 3, 8, 0.3);
        let b = wave_series(4, 3, 8, 0.3);
        assert_eq!(a.len(), 4 * 3 * 8);
        assert_eq!(a, b);
        assert_ne!(&a[0..24], &a[24..48]);
    }

    #[test]
    fn test_inject_missing_ignores_out_of_range() {
        let mut values = vec![0.0; 4];
        inject_missing(&mut values, &[1, 10]);
        assert!(values[1].is_nan());
        assert_eq!(values.iter().filter(|v| v.is_nan()).count(), 1);
    }
}
