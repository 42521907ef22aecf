//! Batch execution over a list of events.
//!
//! The archive is opened once per batch. Each event is searched and written
//! independently: a failing event is recorded and the batch moves on.

use std::fmt;
use std::time::Instant;

use analogue_common::AnalogueError;
use analogue_engine::{
    search_event, AnalogueConfig, EventDefinition, ResultWriter, SearchOptions, SearchOutcome,
};
use anomaly_archive::YearlyArchive;
use tracing::{error, info};

use crate::paths::PipelinePaths;

/// What happened to one event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventStatus {
    Completed {
        past: usize,
        present: usize,
        warnings: usize,
    },
    /// Results covering the requested periods already existed and `--force`
    /// was not given.
    Skipped,
    Failed {
        kind: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventReport {
    pub event: String,
    pub status: EventStatus,
}

/// Per-event reports of a batch, in processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub reports: Vec<EventReport>,
}

impl BatchSummary {
    fn count(&self, pred: impl Fn(&EventStatus) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.status)).count()
    }

    pub fn completed(&self) -> usize {
        self.count(|s| matches!(s, EventStatus::Completed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, EventStatus::Skipped))
    }

    pub fn failed(&self) -> impl Iterator<Item = &EventReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, EventStatus::Failed { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed: Vec<String> = self
            .failed()
            .map(|r| match &r.status {
                EventStatus::Failed { kind, .. } => format!("{} ({})", r.event, kind),
                _ => r.event.clone(),
            })
            .collect();
        write!(
            f,
            "{} completed, {} skipped, {} failed",
            self.completed(),
            self.skipped(),
            failed.len()
        )?;
        if !failed.is_empty() {
            write!(f, ": {}", failed.join(", "))?;
        }
        Ok(())
    }
}

/// Runs the search for a set of events against one dataset.
pub struct BatchRunner<'a> {
    paths: &'a PipelinePaths,
    dataset: &'a str,
    config: &'a AnalogueConfig,
    options: SearchOptions,
    force: bool,
}

impl<'a> BatchRunner<'a> {
    pub fn new(paths: &'a PipelinePaths, dataset: &'a str, config: &'a AnalogueConfig) -> Self {
        Self {
            paths,
            dataset,
            config,
            options: SearchOptions::default(),
            force: false,
        }
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    /// Recompute events whose results already exist.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Process `events` in order.
    ///
    /// Fails only when the batch cannot start at all (missing or unreadable
    /// anomaly archive); per-event failures end up in the summary.
    pub fn run(&self, events: &[EventDefinition]) -> Result<BatchSummary, AnalogueError> {
        let started = Instant::now();
        let mut summary = BatchSummary::default();

        let pending: Vec<&EventDefinition> = events
            .iter()
            .filter(|event| {
                let writer = self.writer(event);
                if !self.force && writer.is_complete(self.options.period_filter) {
                    info!(
                        event = %event.name,
                        path = %writer.analogues_path().display(),
                        "Results exist, skipping (use --force to recompute)"
                    );
                    summary.reports.push(EventReport {
                        event: event.name.clone(),
                        status: EventStatus::Skipped,
                    });
                    false
                } else {
                    true
                }
            })
            .collect();

        if pending.is_empty() {
            return Ok(summary);
        }

        let archive = YearlyArchive::open(
            self.paths.anomaly_dir(self.dataset),
            self.dataset,
            &self.config.distance.match_variable,
        )?;

        for event in pending {
            let status = match self.run_event(&archive, event) {
                Ok(outcome) => EventStatus::Completed {
                    past: outcome.past.len(),
                    present: outcome.present.len(),
                    warnings: outcome.warnings.len(),
                },
                Err(e) => {
                    error!(
                        dataset = self.dataset,
                        event = %event.name,
                        kind = e.kind(),
                        error = %e,
                        "Analogue search failed"
                    );
                    EventStatus::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
            };
            summary.reports.push(EventReport {
                event: event.name.clone(),
                status,
            });
        }

        info!(
            dataset = self.dataset,
            events = summary.reports.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch finished"
        );
        Ok(summary)
    }

    fn run_event(
        &self,
        archive: &YearlyArchive,
        event: &EventDefinition,
    ) -> Result<SearchOutcome, AnalogueError> {
        let outcome = search_event(archive, event, self.config, &self.options)?;
        self.writer(event).write(&outcome)?;
        Ok(outcome)
    }

    fn writer(&self, event: &EventDefinition) -> ResultWriter {
        ResultWriter::new(self.paths.output_dir(self.dataset, &event.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analogue_common::{BoundingBox, GridField, YearRange};
    use analogue_engine::{read_analogues_file, PeriodFilter};
    use anomaly_archive::{write_json_grid, year_file_name, FileFormat};
    use test_utils::{date_span, temp_test_dir, uniform_days, ymd};

    const DATASET: &str = "era5";

    /// One JSON anomaly file per year, each day uniform with a value that
    /// grows with distance from the snapshot.
    fn seed_archive(paths: &PipelinePaths, years: &[i32]) {
        let dir = paths.anomaly_dir(DATASET);
        std::fs::create_dir_all(&dir).unwrap();
        let snapshot = ymd(2020, 2, 8);
        for &year in years {
            let dates = date_span(ymd(year, 1, 1), ymd(year, 3, 31));
            let values: Vec<f32> = dates
                .iter()
                .map(|d| ((*d - snapshot).num_days().abs() % 97) as f32 * 0.1)
                .collect();
            let field = GridField::new_3d(
                uniform_days(&values, 6),
                vec![-60.0, -65.0, -70.0],
                vec![295.0, 305.0],
                dates,
            )
            .unwrap();
            let path = dir.join(year_file_name("psurf", year, FileFormat::Json));
            write_json_grid(&path, &field, "psurf").unwrap();
        }
    }

    fn config() -> AnalogueConfig {
        let mut config =
            AnalogueConfig::new(YearRange::new(1980, 1981), YearRange::new(2019, 2020));
        config.n_analogues = 5;
        config.exclusion_window_days = 3;
        config
    }

    fn events() -> Vec<EventDefinition> {
        vec![
            EventDefinition::new(
                "peninsula",
                ymd(2020, 2, 8),
                BoundingBox::new(290.0, 310.0, -70.0, -60.0),
            ),
            EventDefinition::new(
                "elsewhere",
                ymd(2020, 2, 8),
                BoundingBox::new(10.0, 20.0, 40.0, 50.0),
            ),
        ]
    }

    #[test]
    fn test_failed_event_does_not_stop_batch() {
        let root = temp_test_dir();
        let paths = PipelinePaths::new(root.path());
        seed_archive(&paths, &[1980, 1981, 2019, 2020]);
        let config = config();

        let summary = BatchRunner::new(&paths, DATASET, &config)
            .run(&events())
            .unwrap();

        assert_eq!(summary.completed(), 1);
        assert!(!summary.is_success());
        let failed: Vec<&EventReport> = summary.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].event, "elsewhere");
        assert!(matches!(
            failed[0].status,
            EventStatus::Failed { kind: "RegionOutOfBoundsError", .. }
        ));
        assert_eq!(
            summary.to_string(),
            "1 completed, 0 skipped, 1 failed: elsewhere (RegionOutOfBoundsError)"
        );

        let out = paths.output_dir(DATASET, "peninsula");
        let rows = read_analogues_file(&out.join("analogues.csv")).unwrap();
        assert_eq!(rows.len(), 10);
        assert!(rows
            .iter()
            .all(|r| r.date != ymd(2020, 2, 8)));
        assert!(!paths.output_dir(DATASET, "elsewhere").exists());
    }

    #[test]
    fn test_existing_results_are_skipped_unless_forced() {
        let root = temp_test_dir();
        let paths = PipelinePaths::new(root.path());
        seed_archive(&paths, &[1980, 2020]);
        let config = config();
        let event = &events()[..1];

        let first = BatchRunner::new(&paths, DATASET, &config).run(event).unwrap();
        assert_eq!(first.completed(), 1);

        let again = BatchRunner::new(&paths, DATASET, &config).run(event).unwrap();
        assert_eq!(again.skipped(), 1);
        assert!(again.is_success());

        let forced = BatchRunner::new(&paths, DATASET, &config)
            .with_force(true)
            .with_options(SearchOptions {
                period_filter: PeriodFilter::Past,
            })
            .run(event)
            .unwrap();
        assert_eq!(forced.completed(), 1);
        let rows =
            read_analogues_file(&paths.output_dir(DATASET, "peninsula").join("analogues.csv"))
                .unwrap();
        assert!(rows.iter().all(|r| r.period == analogue_engine::Period::Past));
    }

    #[test]
    fn test_past_only_results_do_not_satisfy_full_run() {
        let root = temp_test_dir();
        let paths = PipelinePaths::new(root.path());
        seed_archive(&paths, &[1980, 2020]);
        let config = config();
        let event = &events()[..1];
        let past_only = SearchOptions {
            period_filter: PeriodFilter::Past,
        };

        let first = BatchRunner::new(&paths, DATASET, &config)
            .with_options(past_only)
            .run(event)
            .unwrap();
        assert_eq!(first.completed(), 1);

        let past_again = BatchRunner::new(&paths, DATASET, &config)
            .with_options(past_only)
            .run(event)
            .unwrap();
        assert_eq!(past_again.skipped(), 1);

        let full = BatchRunner::new(&paths, DATASET, &config).run(event).unwrap();
        assert_eq!(full.skipped(), 0);
        assert!(matches!(
            full.reports[0].status,
            EventStatus::Completed { past: 5, present: 5, .. }
        ));
        let rows =
            read_analogues_file(&paths.output_dir(DATASET, "peninsula").join("analogues.csv"))
                .unwrap();
        assert!(rows.iter().any(|r| r.period == analogue_engine::Period::Present));
    }

    #[test]
    fn test_missing_archive_is_prerequisite_error() {
        let root = temp_test_dir();
        let paths = PipelinePaths::new(root.path());
        let config = config();

        let err = BatchRunner::new(&paths, DATASET, &config)
            .run(&events())
            .unwrap_err();
        assert_eq!(err.kind(), "PrerequisiteMissingError");
        assert!(err.to_string().contains("F01_preprocess"));
    }
}
