//! Gridded scalar fields and region slicing.
//!
//! A [`GridField`] holds either a single lat/lon slice or a stack of daily
//! slices sharing the same axes. Values are stored row-major as
//! `[time][lat][lon]`; missing data is NaN or the optional fill value.

use chrono::NaiveDate;

use crate::bbox::{normalize_lon, BoundingBox};
use crate::error::{AnalogueError, Result};

/// Coordinate comparisons tolerate this much rounding noise (degrees).
const COORD_TOLERANCE: f64 = 1e-6;

/// A 2D (lat x lon) or 3D (time x lat x lon) scalar field.
///
/// Axes are fixed at construction; every derived field (region slice, time
/// window, smoothed copy) is a new allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct GridField {
    values: Vec<f32>,
    lats: Vec<f64>,
    lons: Vec<f64>,
    times: Option<Vec<NaiveDate>>,
    fill_value: Option<f32>,
}

impl GridField {
    /// Create a single-slice field.
    pub fn new_2d(values: Vec<f32>, lats: Vec<f64>, lons: Vec<f64>) -> Result<Self> {
        Self::check_axes(&lats, &lons)?;
        if values.len() != lats.len() * lons.len() {
            return Err(AnalogueError::invalid_grid(format!(
                "expected {} x {} = {} values, got {}",
                lats.len(),
                lons.len(),
                lats.len() * lons.len(),
                values.len()
            )));
        }
        Ok(Self {
            values,
            lats,
            lons,
            times: None,
            fill_value: None,
        })
    }

    /// Create a field with one slice per date. Dates must be strictly increasing.
    pub fn new_3d(
        values: Vec<f32>,
        lats: Vec<f64>,
        lons: Vec<f64>,
        times: Vec<NaiveDate>,
    ) -> Result<Self> {
        Self::check_axes(&lats, &lons)?;
        let expected = times.len() * lats.len() * lons.len();
        if values.len() != expected {
            return Err(AnalogueError::invalid_grid(format!(
                "expected {} x {} x {} = {} values, got {}",
                times.len(),
                lats.len(),
                lons.len(),
                expected,
                values.len()
            )));
        }
        if let Some(pair) = times.windows(2).find(|w| w[0] >= w[1]) {
            return Err(AnalogueError::invalid_grid(format!(
                "time axis must be strictly increasing ({} followed by {})",
                pair[0], pair[1]
            )));
        }
        Ok(Self {
            values,
            lats,
            lons,
            times: Some(times),
            fill_value: None,
        })
    }

    fn check_axes(lats: &[f64], lons: &[f64]) -> Result<()> {
        if lats.is_empty() || lons.is_empty() {
            return Err(AnalogueError::invalid_grid(
                "latitude and longitude axes must be non-empty",
            ));
        }
        if lats.iter().chain(lons.iter()).any(|v| !v.is_finite()) {
            return Err(AnalogueError::invalid_grid("coordinate axes must be finite"));
        }
        Ok(())
    }

    /// Treat `fill` as a missing-value sentinel in addition to NaN.
    pub fn with_fill_value(mut self, fill: f32) -> Self {
        self.fill_value = Some(fill);
        self
    }

    pub fn fill_value(&self) -> Option<f32> {
        self.fill_value
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn times(&self) -> Option<&[NaiveDate]> {
        self.times.as_deref()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn nlat(&self) -> usize {
        self.lats.len()
    }

    pub fn nlon(&self) -> usize {
        self.lons.len()
    }

    /// Number of time slices (1 for a 2D field).
    pub fn ntime(&self) -> usize {
        self.times.as_ref().map_or(1, |t| t.len())
    }

    /// Points per time slice.
    pub fn slice_len(&self) -> usize {
        self.nlat() * self.nlon()
    }

    pub fn is_3d(&self) -> bool {
        self.times.is_some()
    }

    /// True if `value` counts as missing data in this field.
    pub fn is_missing(&self, value: f32) -> bool {
        value.is_nan() || self.fill_value.map_or(false, |fill| value == fill)
    }

    /// Values of one time slice, row-major `[lat][lon]`.
    pub fn slice(&self, t: usize) -> Option<&[f32]> {
        if t >= self.ntime() {
            return None;
        }
        let n = self.slice_len();
        self.values.get(t * n..(t + 1) * n)
    }

    /// Value at (time, lat, lon) indices.
    pub fn get(&self, t: usize, i: usize, j: usize) -> Option<f32> {
        if i >= self.nlat() || j >= self.nlon() {
            return None;
        }
        self.slice(t).map(|s| s[i * self.nlon() + j])
    }

    /// Date of slice `t`, if the field has a time axis.
    pub fn date(&self, t: usize) -> Option<NaiveDate> {
        self.times.as_ref().and_then(|times| times.get(t).copied())
    }

    /// Restrict the field to the grid points inside `bbox`.
    ///
    /// Fails with `RegionOutOfBounds` if the box misses the field's coverage.
    pub fn slice_region(&self, bbox: &BoundingBox) -> Result<GridField> {
        let indices = RegionIndices::resolve(&self.lats, &self.lons, bbox)?;
        Ok(self.select(&indices))
    }

    /// Gather the points named by `indices` from every time slice.
    pub fn select(&self, indices: &RegionIndices) -> GridField {
        let nlon = self.nlon();
        let mut values = Vec::with_capacity(self.ntime() * indices.len());
        for t in 0..self.ntime() {
            let base = t * self.slice_len();
            for &i in &indices.lat {
                let row = base + i * nlon;
                values.extend(indices.lon.iter().map(|&j| self.values[row + j]));
            }
        }

        GridField {
            values,
            lats: indices.lat.iter().map(|&i| self.lats[i]).collect(),
            lons: indices.lon.iter().map(|&j| self.lons[j]).collect(),
            times: self.times.clone(),
            fill_value: self.fill_value,
        }
    }

    /// Like [`GridField::select`], rejecting indices outside the grid.
    pub fn select_checked(&self, indices: &RegionIndices) -> Result<GridField> {
        let lat_ok = indices.lat.iter().all(|&i| i < self.nlat());
        let lon_ok = indices.lon.iter().all(|&j| j < self.nlon());
        if !lat_ok || !lon_ok || indices.is_empty() {
            return Err(AnalogueError::invalid_grid(format!(
                "region indices {:?} do not fit a {} x {} grid",
                indices.shape(),
                self.nlat(),
                self.nlon()
            )));
        }
        Ok(self.select(indices))
    }

    /// Copy out `count` consecutive time slices starting at `start`.
    pub fn time_window(&self, start: usize, count: usize) -> Result<GridField> {
        let times = self
            .times
            .as_ref()
            .ok_or_else(|| AnalogueError::invalid_grid("time window requested on a 2D field"))?;
        if start + count > times.len() {
            return Err(AnalogueError::invalid_grid(format!(
                "time window {}..{} exceeds {} slices",
                start,
                start + count,
                times.len()
            )));
        }
        let n = self.slice_len();
        Ok(GridField {
            values: self.values[start * n..(start + count) * n].to_vec(),
            lats: self.lats.clone(),
            lons: self.lons.clone(),
            times: Some(times[start..start + count].to_vec()),
            fill_value: self.fill_value,
        })
    }
}

/// Index of the date closest to `date` in a sorted slice; ties go to the earlier date.
pub fn nearest_date_index(dates: &[NaiveDate], date: NaiveDate) -> Option<usize> {
    if dates.is_empty() {
        return None;
    }
    match dates.binary_search(&date) {
        Ok(idx) => Some(idx),
        Err(0) => Some(0),
        Err(idx) if idx >= dates.len() => Some(dates.len() - 1),
        Err(idx) => {
            let before = (date - dates[idx - 1]).num_days();
            let after = (dates[idx] - date).num_days();
            if before <= after {
                Some(idx - 1)
            } else {
                Some(idx)
            }
        }
    }
}

/// Coverage box of a pair of coordinate axes.
pub fn axis_coverage(lats: &[f64], lons: &[f64]) -> BoundingBox {
    let (lat_min, lat_max) = min_max(lats);
    let (lon_min, lon_max) = min_max(lons);
    BoundingBox::new(lon_min, lon_max, lat_min, lat_max)
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Grid indices selected by a bounding box.
///
/// `lat` keeps the grid's own latitude order. `lon` runs west to east
/// starting at the box's western edge: a box spanning the grid's longitude
/// seam becomes two index ranges concatenated, each in grid order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionIndices {
    pub lat: Vec<usize>,
    pub lon: Vec<usize>,
}

impl RegionIndices {
    /// Resolve the indices of `lats`/`lons` covered by `bbox`.
    pub fn resolve(lats: &[f64], lons: &[f64], bbox: &BoundingBox) -> Result<Self> {
        bbox.validate()?;

        let out_of_bounds = || {
            AnalogueError::region_out_of_bounds(
                bbox.to_string(),
                axis_coverage(lats, lons).to_string(),
            )
        };

        let lat = select_latitudes(lats, bbox).ok_or_else(out_of_bounds)?;
        let lon = select_longitudes(lons, bbox).ok_or_else(out_of_bounds)?;

        Ok(Self { lat, lon })
    }

    /// Number of grid points in the region.
    pub fn len(&self) -> usize {
        self.lat.len() * self.lon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (nlat, nlon) of the region.
    pub fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    /// Inclusive (min, max) latitude index; the hyperslab a reader must fetch.
    pub fn lat_bounds(&self) -> Option<(usize, usize)> {
        Some((*self.lat.iter().min()?, *self.lat.iter().max()?))
    }
}

fn select_latitudes(lats: &[f64], bbox: &BoundingBox) -> Option<Vec<usize>> {
    let inside: Vec<usize> = (0..lats.len())
        .filter(|&i| {
            lats[i] >= bbox.lat_min - COORD_TOLERANCE && lats[i] <= bbox.lat_max + COORD_TOLERANCE
        })
        .collect();
    if !inside.is_empty() {
        return Some(inside);
    }

    // The box may sit between two grid rows: take the rows enclosing it.
    let (axis_min, axis_max) = min_max(lats);
    if bbox.lat_max < axis_min || bbox.lat_min > axis_max {
        return None;
    }
    let below = nearest_where(lats, |lat| lat < bbox.lat_min, |lat| lat);
    let above = nearest_where(lats, |lat| lat > bbox.lat_max, |lat| -lat);
    let mut rows: Vec<usize> = below.into_iter().chain(above).collect();
    rows.sort_unstable();
    rows.dedup();
    Some(rows)
}

fn select_longitudes(lons: &[f64], bbox: &BoundingBox) -> Option<Vec<usize>> {
    if bbox.covers_all_longitudes() {
        return Some((0..lons.len()).collect());
    }

    let west = normalize_lon(bbox.lon_min);
    let span = bbox.lon_span();
    let offset = |lon: f64| normalize_lon(lon - west);

    let mut inside: Vec<usize> = (0..lons.len())
        .filter(|&j| {
            let off = offset(lons[j]);
            off <= span + COORD_TOLERANCE || off >= 360.0 - COORD_TOLERANCE
        })
        .collect();

    if inside.is_empty() {
        // Narrow box between two columns: take the enclosing pair, provided
        // they are neighbours on the grid.
        let east_col = nearest_where(lons, |_| true, |lon| -offset(lon))?;
        let west_col = nearest_where(lons, |_| true, |lon| offset(lon))?;
        let gap = offset(lons[east_col]) + (360.0 - offset(lons[west_col]));
        if gap > typical_spacing(lons)? * 1.5 {
            return None;
        }
        let mut pair = vec![west_col, east_col];
        pair.dedup();
        return Some(pair);
    }

    // Splice at the grid seam: order by eastward distance from the west edge.
    // Stable sort keeps grid order inside each contiguous piece.
    inside.sort_by(|&a, &b| {
        let oa = wrap_offset(offset(lons[a]));
        let ob = wrap_offset(offset(lons[b]));
        oa.total_cmp(&ob)
    });
    inside.dedup();
    Some(inside)
}

/// Offsets just below 360 belong to the west edge itself.
fn wrap_offset(off: f64) -> f64 {
    if off >= 360.0 - COORD_TOLERANCE {
        off - 360.0
    } else {
        off
    }
}

/// Index maximising `score` among coordinates satisfying `pred`.
fn nearest_where(
    coords: &[f64],
    pred: impl Fn(f64) -> bool,
    score: impl Fn(f64) -> f64,
) -> Option<usize> {
    (0..coords.len())
        .filter(|&i| pred(coords[i]))
        .max_by(|&a, &b| score(coords[a]).total_cmp(&score(coords[b])))
}

fn typical_spacing(coords: &[f64]) -> Option<f64> {
    coords
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .filter(|d| *d > 0.0)
        .min_by(|a, b| a.total_cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(start: f64, step: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    fn ramp_field(lats: Vec<f64>, lons: Vec<f64>) -> GridField {
        let n = lats.len() * lons.len();
        GridField::new_2d((0..n).map(|v| v as f32).collect(), lats, lons).unwrap()
    }

    #[test]
    fn test_shape_validation() {
        assert!(GridField::new_2d(vec![0.0; 5], vec![0.0, 1.0], vec![0.0, 1.0]).is_err());
        let d0 = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let d1 = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let err = GridField::new_3d(vec![0.0; 2], vec![0.0], vec![0.0], vec![d0, d1]);
        assert!(err.is_err());
    }

    #[test]
    fn test_full_box_round_trip() {
        let field = ramp_field(axis(90.0, -2.5, 73), axis(0.0, 2.5, 144));
        let sliced = field.slice_region(&BoundingBox::global()).unwrap();
        assert_eq!(sliced, field);
    }

    #[test]
    fn test_descending_latitudes_keep_order() {
        let field = ramp_field(axis(60.0, -10.0, 7), axis(0.0, 10.0, 4));
        let sliced = field
            .slice_region(&BoundingBox::new(0.0, 30.0, 15.0, 45.0))
            .unwrap();
        assert_eq!(sliced.lats(), &[40.0, 30.0, 20.0]);
        assert_eq!(sliced.get(0, 0, 0), Some(8.0));
    }

    #[test]
    fn test_wraparound_splices_columns() {
        let field = ramp_field(vec![0.0], axis(0.0, 10.0, 36));
        let sliced = field
            .slice_region(&BoundingBox::new(340.0, 20.0, -5.0, 5.0))
            .unwrap();
        assert_eq!(sliced.lons(), &[340.0, 350.0, 0.0, 10.0, 20.0]);
        assert_eq!(sliced.values(), &[34.0, 35.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_wraparound_on_signed_grid() {
        let field = ramp_field(vec![0.0], axis(-180.0, 10.0, 36));
        let sliced = field
            .slice_region(&BoundingBox::new(160.0, 200.0, -5.0, 5.0))
            .unwrap();
        assert_eq!(sliced.lons(), &[160.0, 170.0, -180.0, -170.0, -160.0]);
    }

    #[test]
    fn test_box_between_rows_takes_enclosing_rows() {
        let field = ramp_field(axis(0.0, 10.0, 5), axis(0.0, 10.0, 5));
        let sliced = field
            .slice_region(&BoundingBox::new(0.0, 40.0, 12.0, 18.0))
            .unwrap();
        assert_eq!(sliced.lats(), &[10.0, 20.0]);
    }

    #[test]
    fn test_disjoint_box_is_out_of_bounds() {
        let field = ramp_field(axis(-70.0, 1.0, 11), axis(290.0, 1.0, 11));
        let err = field
            .slice_region(&BoundingBox::new(0.0, 10.0, 40.0, 50.0))
            .unwrap_err();
        assert!(matches!(err, AnalogueError::RegionOutOfBounds { .. }));
    }

    #[test]
    fn test_nearest_time_index_ties_go_earlier() {
        let dates: Vec<NaiveDate> = [1, 3, 5]
            .iter()
            .map(|&d| NaiveDate::from_ymd_opt(2020, 1, d).unwrap())
            .collect();
        let target = NaiveDate::from_ymd_opt(2020, 1, 4).unwrap();
        assert_eq!(nearest_date_index(&dates, target), Some(1));
        let late = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        assert_eq!(nearest_date_index(&dates, late), Some(2));
        assert_eq!(nearest_date_index(&[], late), None);
    }

    #[test]
    fn test_fill_value_counts_as_missing() {
        let field = ramp_field(vec![0.0], vec![0.0]).with_fill_value(-999.0);
        assert!(field.is_missing(-999.0));
        assert!(field.is_missing(f32::NAN));
        assert!(!field.is_missing(0.0));
    }
}
