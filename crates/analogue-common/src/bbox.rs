//! Bounding box types and operations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnalogueError, Result};

/// A geographic bounding box in degrees.
///
/// Longitudes may be given in either the 0..360 or the -180..180 convention.
/// A box whose `lon_min` is greater than its `lon_max` wraps across the
/// 0/360 (or ±180) meridian, e.g. `lon_min = 350, lon_max = 10`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl BoundingBox {
    /// Create a new bounding box from its edges.
    pub fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Self {
        Self {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        }
    }

    /// Global coverage in the 0..360 convention.
    pub fn global() -> Self {
        Self::new(0.0, 360.0, -90.0, 90.0)
    }

    /// Check the box is usable for region slicing.
    pub fn validate(&self) -> Result<()> {
        let edges = [self.lon_min, self.lon_max, self.lat_min, self.lat_max];
        if edges.iter().any(|v| !v.is_finite()) {
            return Err(AnalogueError::invalid_field(
                "region",
                format!("non-finite edge in {}", self),
            ));
        }
        if self.lat_min > self.lat_max {
            return Err(AnalogueError::invalid_field(
                "region",
                format!("lat_min {} greater than lat_max {}", self.lat_min, self.lat_max),
            ));
        }
        if self.lat_min < -90.0 || self.lat_max > 90.0 {
            return Err(AnalogueError::invalid_field(
                "region",
                format!("latitudes must lie within [-90, 90], got {}", self),
            ));
        }
        Ok(())
    }

    /// True when the box, taken literally, spans at least one full turn of longitude.
    pub fn covers_all_longitudes(&self) -> bool {
        self.lon_max - self.lon_min >= 360.0
    }

    /// True when the box crosses the seam of the 0..360 convention.
    pub fn wraps(&self) -> bool {
        !self.covers_all_longitudes() && normalize_lon(self.lon_min) > normalize_lon(self.lon_max)
    }

    /// Longitudinal extent in degrees, accounting for wraparound.
    pub fn lon_span(&self) -> f64 {
        if self.covers_all_longitudes() {
            return 360.0;
        }
        let span = normalize_lon(self.lon_max) - normalize_lon(self.lon_min);
        if span < 0.0 {
            span + 360.0
        } else {
            span
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lon[{}, {}] lat[{}, {}]",
            self.lon_min, self.lon_max, self.lat_min, self.lat_max
        )
    }
}

/// Map a longitude into [0, 360).
pub fn normalize_lon(lon: f64) -> f64 {
    let wrapped = lon.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
