//! Single-event analogue search.
//!
//! Ties the stages together: resolve the region, build the reference
//! pattern, compute distances over the archive, partition by period and
//! select the top analogues. Nothing is written here; the caller decides
//! what to do with the outcome.

use std::time::Instant;

use analogue_common::grid::nearest_date_index;
use analogue_common::{AnalogueError, AnomalyArchive, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::{AnalogueConfig, EventDefinition, PeriodFilter, SearchOptions};
use crate::distance::{DistanceEngine, DistanceRecord, EngineOptions};
use crate::partition::{Partition, Period, PeriodPartitioner};
use crate::selector::{AnalogueResult, AnalogueSelector};
use crate::smoothing::RunningMean;
use crate::warnings::SearchWarning;
use crate::weighting::LatitudeWeighting;

/// Everything a search produced for one event.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub event: String,
    /// Snapshot as configured.
    pub requested_snapshot: NaiveDate,
    /// Archived day used as the reference.
    pub snapshot: NaiveDate,
    /// Periods that were searched; the others are left empty.
    pub periods: PeriodFilter,
    pub past: Vec<AnalogueResult>,
    pub present: Vec<AnalogueResult>,
    /// Every computed distance, in date order.
    pub all_distances: Vec<DistanceRecord>,
    pub warnings: Vec<SearchWarning>,
}

impl SearchOutcome {
    pub fn period(&self, period: Period) -> &[AnalogueResult] {
        match period {
            Period::Past => &self.past,
            Period::Present => &self.present,
        }
    }

    /// Past results followed by present results.
    pub fn results(&self) -> impl Iterator<Item = &AnalogueResult> {
        self.past.iter().chain(self.present.iter())
    }
}

/// Engine options implied by a configuration and an event.
pub fn engine_options(config: &AnalogueConfig, event: &EventDefinition) -> Result<EngineOptions> {
    Ok(EngineOptions {
        weighting: LatitudeWeighting::new(config.distance.pole_weight_floor)?,
        smoothing: RunningMean::new(event.smoothing_window(config))?,
        min_valid_fraction: config.distance.min_valid_fraction,
        chunk_days: config.chunk_days,
    })
}

/// Run the full search for one event against `archive`.
pub fn search_event(
    archive: &dyn AnomalyArchive,
    event: &EventDefinition,
    config: &AnalogueConfig,
    options: &SearchOptions,
) -> Result<SearchOutcome> {
    config.validate()?;
    event.validate()?;
    let started = Instant::now();

    info!(
        event = %event.name,
        snapshot = %event.snapshot_date,
        region = %event.region,
        archive = %archive.describe(),
        periods = %options.period_filter,
        "Starting analogue search"
    );

    let engine = DistanceEngine::new(archive, &event.region, engine_options(config, event)?)?;

    let mut warnings = Vec::new();
    let snapshot = nearest_date_index(archive.dates(), event.snapshot_date)
        .map(|i| archive.dates()[i])
        .ok_or_else(|| AnalogueError::ReferenceUnavailable {
            date: event.snapshot_date,
            reason: "archive has no days".to_string(),
        })?;
    if snapshot != event.snapshot_date {
        warnings.push(SearchWarning::SnapshotShifted {
            requested: event.snapshot_date,
            actual: snapshot,
        });
    }

    let reference = engine.reference(snapshot)?;
    let run = engine.compute(&reference)?;
    if run.insufficient > 0 {
        warnings.push(SearchWarning::InsufficientData {
            dropped_days: run.insufficient,
        });
    }
    if run.incomplete_window > 0 {
        warnings.push(SearchWarning::IncompleteWindow {
            dropped_days: run.incomplete_window,
        });
    }

    let partition: Partition = PeriodPartitioner::new(
        config.periods.past,
        config.periods.present,
        snapshot,
        config.exclusion_window_days,
    )?
    .with_filter(options.period_filter)
    .partition(&run.records);

    let selector =
        AnalogueSelector::new(config.n_analogues)?.with_min_separation(config.min_separation_days);

    let mut past = Vec::new();
    let mut present = Vec::new();
    for period in Period::ALL {
        if !options.period_filter.includes(period) {
            continue;
        }
        let selected = selector.select(partition.period(period), period);
        if selected.len() < config.n_analogues {
            warnings.push(SearchWarning::EmptyPeriod {
                period,
                found: selected.len(),
                requested: config.n_analogues,
            });
        }
        match period {
            Period::Past => past = selected,
            Period::Present => present = selected,
        }
    }

    for warning in &warnings {
        warn!(event = %event.name, kind = warning.kind(), "{}", warning);
    }

    metrics::counter!("analogue_searches_total").increment(1);
    metrics::histogram!("analogue_search_duration_seconds").record(started.elapsed().as_secs_f64());

    info!(
        event = %event.name,
        past = past.len(),
        present = present.len(),
        excluded_snapshot = partition.snapshot,
        excluded_window = partition.exclusion_window,
        outside_periods = partition.outside,
        warnings = warnings.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Analogue search complete"
    );

    Ok(SearchOutcome {
        event: event.name.clone(),
        requested_snapshot: event.snapshot_date,
        snapshot,
        periods: options.period_filter,
        past,
        present,
        all_distances: run.records,
        warnings,
    })
}
