//! Latitude area weights.
//!
//! On a regular lat/lon grid a cell's area shrinks with cos(latitude). Each
//! grid row's squared differences are scaled by that factor so polar rows
//! do not dominate the distance.

use analogue_common::{AnalogueError, Result};

/// Smallest weight any row receives unless configured otherwise.
pub const DEFAULT_POLE_WEIGHT_FLOOR: f64 = 1e-6;

/// cos(latitude) weights clamped below by a floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatitudeWeighting {
    floor: f64,
}

impl Default for LatitudeWeighting {
    fn default() -> Self {
        Self {
            floor: DEFAULT_POLE_WEIGHT_FLOOR,
        }
    }
}

impl LatitudeWeighting {
    /// A floor of 0 gives exactly zero weight at ±90°.
    pub fn new(floor: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&floor) {
            return Err(AnalogueError::invalid_field(
                "distance.pole_weight_floor",
                format!("must lie in [0, 1], got {}", floor),
            ));
        }
        Ok(Self { floor })
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Weight of one latitude in degrees.
    pub fn weight(&self, lat: f64) -> f64 {
        // cos(90°) evaluates to ~6e-17 rather than 0.
        let w = if lat.abs() >= 90.0 {
            0.0
        } else {
            lat.to_radians().cos()
        };
        w.max(self.floor)
    }

    /// One weight per latitude, same order.
    pub fn weights(&self, lats: &[f64]) -> Vec<f64> {
        lats.iter().map(|&lat| self.weight(lat)).collect()
    }
}
