//! Typed search configuration and event definitions.
//!
//! These structs deserialize straight from the pipeline's YAML files. Every
//! optional field has a default; [`AnalogueConfig::validate`] and
//! [`EventDefinition::validate`] reject anything the search cannot run with.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use analogue_common::{AnalogueError, BoundingBox, Result, YearRange};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::partition::Period;
use crate::weighting::DEFAULT_POLE_WEIGHT_FLOOR;

/// Default number of analogues kept per period.
pub const DEFAULT_N_ANALOGUES: usize = 15;

/// Default number of days read from the archive per chunk.
pub const DEFAULT_CHUNK_DAYS: usize = 365;

/// Search parameters shared by every event of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalogueConfig {
    /// Analogues kept per period.
    #[serde(default = "default_n_analogues")]
    pub n_analogues: usize,

    #[serde(default)]
    pub distance: DistanceSettings,

    pub periods: Periods,

    /// Days either side of the snapshot removed from the present period.
    #[serde(default)]
    pub exclusion_window_days: u32,

    /// Minimum spacing between two analogues of the same period (0 = off).
    #[serde(default)]
    pub min_separation_days: u32,

    #[serde(default)]
    pub smoothing: SmoothingSettings,

    /// Archive days read per block.
    #[serde(default = "default_chunk_days")]
    pub chunk_days: usize,
}

fn default_n_analogues() -> usize {
    DEFAULT_N_ANALOGUES
}

fn default_chunk_days() -> usize {
    DEFAULT_CHUNK_DAYS
}

/// How candidate and reference patterns are compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceSettings {
    /// Anomaly variable the patterns are drawn from.
    #[serde(default = "default_match_variable")]
    pub match_variable: String,

    /// A day is kept only if at least this fraction of region points is valid.
    #[serde(default = "default_min_valid_fraction")]
    pub min_valid_fraction: f64,

    /// Lower bound applied to cos(latitude) weights.
    #[serde(default = "default_pole_weight_floor")]
    pub pole_weight_floor: f64,
}

fn default_match_variable() -> String {
    "psurf".to_string()
}

fn default_min_valid_fraction() -> f64 {
    1.0
}

fn default_pole_weight_floor() -> f64 {
    DEFAULT_POLE_WEIGHT_FLOOR
}

impl Default for DistanceSettings {
    fn default() -> Self {
        Self {
            match_variable: default_match_variable(),
            min_valid_fraction: default_min_valid_fraction(),
            pole_weight_floor: default_pole_weight_floor(),
        }
    }
}

/// Past and present year ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Periods {
    pub past: YearRange,
    pub present: YearRange,
}

/// Running-mean smoothing applied to reference and candidates alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmoothingSettings {
    /// Window length in days; 1 disables smoothing.
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

fn default_window_days() -> u32 {
    1
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
        }
    }
}

impl AnalogueConfig {
    /// Configuration with the given periods and every other field defaulted.
    pub fn new(past: YearRange, present: YearRange) -> Self {
        Self {
            n_analogues: DEFAULT_N_ANALOGUES,
            distance: DistanceSettings::default(),
            periods: Periods { past, present },
            exclusion_window_days: 0,
            min_separation_days: 0,
            smoothing: SmoothingSettings::default(),
            chunk_days: DEFAULT_CHUNK_DAYS,
        }
    }

    /// Check every field; the first problem found is reported.
    pub fn validate(&self) -> Result<()> {
        if self.n_analogues == 0 {
            return Err(AnalogueError::invalid_field("n_analogues", "must be > 0"));
        }

        self.periods.past.validate("periods.past")?;
        self.periods.present.validate("periods.present")?;
        if self.periods.past.overlaps(&self.periods.present) {
            return Err(AnalogueError::invalid_field(
                "periods",
                format!(
                    "past {} and present {} overlap",
                    self.periods.past, self.periods.present
                ),
            ));
        }

        let fraction = self.distance.min_valid_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(AnalogueError::invalid_field(
                "distance.min_valid_fraction",
                format!("must lie in (0, 1], got {}", fraction),
            ));
        }

        let floor = self.distance.pole_weight_floor;
        if !(0.0..=1.0).contains(&floor) {
            return Err(AnalogueError::invalid_field(
                "distance.pole_weight_floor",
                format!("must lie in [0, 1], got {}", floor),
            ));
        }

        if self.distance.match_variable.trim().is_empty() {
            return Err(AnalogueError::invalid_field(
                "distance.match_variable",
                "must not be empty",
            ));
        }

        if self.smoothing.window_days == 0 {
            return Err(AnalogueError::invalid_field(
                "smoothing.window_days",
                "must be >= 1",
            ));
        }

        if self.chunk_days == 0 {
            return Err(AnalogueError::invalid_field("chunk_days", "must be > 0"));
        }

        Ok(())
    }
}

/// One extreme event to find analogues for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub name: String,
    pub snapshot_date: NaiveDate,
    pub region: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Overrides `smoothing.window_days` for this event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing_days: Option<u32>,
}

impl EventDefinition {
    pub fn new(name: impl Into<String>, snapshot_date: NaiveDate, region: BoundingBox) -> Self {
        Self {
            name: name.into(),
            snapshot_date,
            region,
            description: None,
            smoothing_days: None,
        }
    }

    pub fn with_smoothing_days(mut self, days: u32) -> Self {
        self.smoothing_days = Some(days);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AnalogueError::invalid_field("name", "event name must not be empty"));
        }
        // Names become directory names.
        if self.name.contains(['/', '\\']) || self.name == "." || self.name == ".." {
            return Err(AnalogueError::invalid_field(
                "name",
                format!("'{}' is not usable as a directory name", self.name),
            ));
        }
        if self.smoothing_days == Some(0) {
            return Err(AnalogueError::invalid_field(
                format!("{}.smoothing_days", self.name),
                "must be >= 1",
            ));
        }
        self.region.validate().map_err(|e| {
            AnalogueError::configuration(format!("event '{}': {}", self.name, e))
        })
    }

    /// Smoothing window for this event, falling back to the run default.
    pub fn smoothing_window(&self, config: &AnalogueConfig) -> u32 {
        self.smoothing_days.unwrap_or(config.smoothing.window_days)
    }
}

/// Validate a list of events, including name uniqueness.
pub fn validate_events(events: &[EventDefinition]) -> Result<()> {
    let mut seen = HashSet::new();
    for event in events {
        event.validate()?;
        if !seen.insert(event.name.as_str()) {
            return Err(AnalogueError::configuration(format!(
                "duplicate event name '{}'",
                event.name
            )));
        }
    }
    Ok(())
}

/// Which periods a search should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodFilter {
    Past,
    Present,
    #[default]
    Both,
}

impl PeriodFilter {
    pub fn includes(&self, period: Period) -> bool {
        match self {
            PeriodFilter::Both => true,
            PeriodFilter::Past => period == Period::Past,
            PeriodFilter::Present => period == Period::Present,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodFilter::Past => "past",
            PeriodFilter::Present => "present",
            PeriodFilter::Both => "both",
        }
    }
}

impl FromStr for PeriodFilter {
    type Err = AnalogueError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "past" => Ok(Self::Past),
            "present" => Ok(Self::Present),
            "both" | "all" => Ok(Self::Both),
            other => Err(AnalogueError::invalid_field(
                "period",
                format!("expected past, present or both; got '{}'", other),
            )),
        }
    }
}

impl fmt::Display for PeriodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run switches that are not part of the YAML configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub period_filter: PeriodFilter,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AnalogueConfig {
        AnalogueConfig::new(YearRange::new(1948, 1987), YearRange::new(1988, 2026))
    }

    #[test]
    fn test_defaults() {
        let c = config();
        assert_eq!(c.n_analogues, 15);
        assert_eq!(c.distance.match_variable, "psurf");
        assert_eq!(c.distance.min_valid_fraction, 1.0);
        assert_eq!(c.smoothing.window_days, 1);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_overlapping_periods_rejected() {
        let c = AnalogueConfig::new(YearRange::new(1950, 1990), YearRange::new(1990, 2020));
        let err = c.validate().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_invalid_fields_rejected() {
        let mut c = config();
        c.n_analogues = 0;
        assert!(c.validate().is_err());

        let mut c = config();
        c.distance.min_valid_fraction = 0.0;
        assert!(c.validate().is_err());

        let mut c = config();
        c.distance.pole_weight_floor = f64::NAN;
        assert!(c.validate().is_err());

        let mut c = config();
        c.chunk_days = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_event_validation() {
        let date = NaiveDate::from_ymd_opt(2020, 2, 8).unwrap();
        let region = BoundingBox::new(290.0, 310.0, -70.0, -60.0);
        let good = EventDefinition::new("peninsula", date, region);
        assert!(good.validate().is_ok());

        let inverted = EventDefinition::new("bad", date, BoundingBox::new(0.0, 10.0, 20.0, 10.0));
        assert!(inverted.validate().unwrap_err().is_configuration());

        let slash = EventDefinition::new("a/b", date, BoundingBox::global());
        assert!(slash.validate().is_err());

        let dup = vec![good.clone(), good];
        assert!(validate_events(&dup).is_err());
    }

    #[test]
    fn test_smoothing_override() {
        let date = NaiveDate::from_ymd_opt(2020, 2, 8).unwrap();
        let event = EventDefinition::new("e", date, BoundingBox::global());
        assert_eq!(event.smoothing_window(&config()), 1);
        assert_eq!(event.with_smoothing_days(5).smoothing_window(&config()), 5);
    }

    #[test]
    fn test_period_filter_parsing() {
        assert_eq!("past".parse::<PeriodFilter>().unwrap(), PeriodFilter::Past);
        assert_eq!("BOTH".parse::<PeriodFilter>().unwrap(), PeriodFilter::Both);
        assert!("future".parse::<PeriodFilter>().is_err());
        assert!(PeriodFilter::Present.includes(Period::Present));
        assert!(!PeriodFilter::Present.includes(Period::Past));
    }
}
