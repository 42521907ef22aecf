//! Archive abstraction consumed by the distance engine.
//!
//! An archive is a daily anomaly time series on a fixed lat/lon grid. The
//! engine never asks for the whole thing at once: it pulls region-restricted
//! blocks of consecutive days, so implementations are free to keep data on
//! disk and load it lazily.

use chrono::NaiveDate;

use crate::error::{AnalogueError, Result};
use crate::grid::{GridField, RegionIndices};

/// Read-only, thread-safe access to a daily anomaly archive.
pub trait AnomalyArchive: Send + Sync {
    /// Latitude axis of the full grid (degrees, any order).
    fn latitudes(&self) -> &[f64];

    /// Longitude axis of the full grid (degrees).
    fn longitudes(&self) -> &[f64];

    /// One strictly increasing date per time slice.
    fn dates(&self) -> &[NaiveDate];

    /// Missing-value sentinel used by the stored data, besides NaN.
    fn fill_value(&self) -> Option<f32> {
        None
    }

    /// Read slices `start..start + count`, restricted to `region`.
    ///
    /// The returned field is 3D with `count` dates and the region's axes.
    fn read_block(
        &self,
        start: usize,
        count: usize,
        region: &RegionIndices,
    ) -> Result<GridField>;

    /// Human-readable identifier for log lines.
    fn describe(&self) -> String {
        format!("archive of {} days", self.dates().len())
    }

    fn len(&self) -> usize {
        self.dates().len()
    }

    fn is_empty(&self) -> bool {
        self.dates().is_empty()
    }
}

/// An archive fully resident in memory.
#[derive(Debug, Clone)]
pub struct InMemoryArchive {
    field: GridField,
}

impl InMemoryArchive {
    /// Wrap a 3D field. Fails for 2D fields.
    pub fn new(field: GridField) -> Result<Self> {
        if !field.is_3d() {
            return Err(AnalogueError::invalid_grid(
                "an archive needs a time axis; got a 2D field",
            ));
        }
        Ok(Self { field })
    }

    pub fn field(&self) -> &GridField {
        &self.field
    }
}

impl AnomalyArchive for InMemoryArchive {
    fn latitudes(&self) -> &[f64] {
        self.field.lats()
    }

    fn longitudes(&self) -> &[f64] {
        self.field.lons()
    }

    fn dates(&self) -> &[NaiveDate] {
        self.field.times().unwrap_or(&[])
    }

    fn fill_value(&self) -> Option<f32> {
        self.field.fill_value()
    }

    fn read_block(
        &self,
        start: usize,
        count: usize,
        region: &RegionIndices,
    ) -> Result<GridField> {
        self.field.time_window(start, count)?.select_checked(region)
    }

    fn describe(&self) -> String {
        format!(
            "in-memory archive ({} days, {} x {} grid)",
            self.field.ntime(),
            self.field.nlat(),
            self.field.nlon()
        )
    }
}
