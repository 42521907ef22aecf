//! End-to-end searches over small in-memory archives with known distances.

use analogue_common::{BoundingBox, GridField, InMemoryArchive, YearRange};
use analogue_engine::{
    search_event, AnalogueConfig, EventDefinition, Period, PeriodFilter, SearchOptions,
    SearchWarning,
};
use chrono::{Datelike, NaiveDate};
use test_utils::{assert_approx_eq, date_span, periods, uniform_days, wave_series, ymd};

const LATS: [f64; 2] = [10.0, 0.0];
const LONS: [f64; 3] = [0.0, 1.0, 2.0];
const POINTS: usize = LATS.len() * LONS.len();

/// An archive where each day is uniform, so its distance to a zero
/// reference is exactly its value.
fn uniform_archive(days: &[(NaiveDate, f32)]) -> InMemoryArchive {
    let dates: Vec<NaiveDate> = days.iter().map(|(d, _)| *d).collect();
    let values: Vec<f32> = days.iter().map(|(_, v)| *v).collect();
    let field = GridField::new_3d(
        uniform_days(&values, POINTS),
        LATS.to_vec(),
        LONS.to_vec(),
        dates,
    )
    .unwrap();
    InMemoryArchive::new(field).unwrap()
}

fn standard_config() -> AnalogueConfig {
    AnalogueConfig::new(
        YearRange::new(periods::PAST.0, periods::PAST.1),
        YearRange::new(periods::PRESENT.0, periods::PRESENT.1),
    )
}

fn event(snapshot: NaiveDate) -> EventDefinition {
    EventDefinition::new("test_event", snapshot, BoundingBox::global())
}

const SCENARIO_DISTANCES: [f32; 10] = [3.1, 0.5, 7.2, 0.5, 9.9, 1.0, 2.0, 4.4, 0.5, 6.6];

fn scenario_archive() -> InMemoryArchive {
    let mut days: Vec<(NaiveDate, f32)> = date_span(ymd(1980, 1, 1), ymd(1980, 1, 10))
        .into_iter()
        .zip(SCENARIO_DISTANCES)
        .collect();
    days.push((ymd(2020, 2, 8), 0.0));
    uniform_archive(&days)
}

#[test]
fn test_top_three_breaks_ties_by_date() {
    let archive = scenario_archive();
    let mut config = standard_config();
    config.n_analogues = 3;

    let outcome = search_event(
        &archive,
        &event(ymd(2020, 2, 8)),
        &config,
        &SearchOptions::default(),
    )
    .unwrap();

    let dates: Vec<NaiveDate> = outcome.past.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![ymd(1980, 1, 2), ymd(1980, 1, 4), ymd(1980, 1, 9)]);
    let ranks: Vec<usize> = outcome.past.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    for r in &outcome.past {
        assert_approx_eq!(r.distance, 0.5, 1e-6);
        assert_eq!(r.period, Period::Past);
    }

    // The only present day is the snapshot itself.
    assert!(outcome.present.is_empty());
    assert!(outcome.warnings.contains(&SearchWarning::EmptyPeriod {
        period: Period::Present,
        found: 0,
        requested: 3,
    }));
}

#[test]
fn test_fourth_rank_is_next_smallest_distance() {
    let archive = scenario_archive();
    let mut config = standard_config();
    config.n_analogues = 4;

    let outcome = search_event(
        &archive,
        &event(ymd(2020, 2, 8)),
        &config,
        &SearchOptions::default(),
    )
    .unwrap();

    assert_eq!(outcome.past.len(), 4);
    assert_eq!(outcome.past[3].date, ymd(1980, 1, 6));
    assert_eq!(outcome.past[3].rank, 4);
    assert_approx_eq!(outcome.past[3].distance, 1.0, 1e-6);
}

#[test]
fn test_exclusion_window_applies_to_present_only() {
    let snapshot = ymd(2020, 2, 8);
    let mut days: Vec<(NaiveDate, f32)> = Vec::new();
    // Past candidates on the same calendar days as the window.
    for d in date_span(ymd(1970, 2, 1), ymd(1970, 2, 15)) {
        days.push((d, 0.2));
    }
    // Window days match closely; days just outside match less well.
    for d in date_span(ymd(2020, 1, 25), ymd(2020, 2, 22)) {
        let v = if d == snapshot {
            0.0
        } else if (ymd(2020, 2, 1)..=ymd(2020, 2, 15)).contains(&d) {
            0.1
        } else {
            1.0
        };
        days.push((d, v));
    }
    let archive = uniform_archive(&days);

    let mut config = standard_config();
    config.n_analogues = 50;
    config.exclusion_window_days = 7;

    let outcome =
        search_event(&archive, &event(snapshot), &config, &SearchOptions::default()).unwrap();

    assert_eq!(outcome.past.len(), 15);
    assert!(outcome
        .present
        .iter()
        .all(|r| !(ymd(2020, 2, 1)..=ymd(2020, 2, 15)).contains(&r.date)));
    let present: Vec<NaiveDate> = outcome.present.iter().map(|r| r.date).collect();
    assert!(present.contains(&ymd(2020, 1, 31)));
    assert!(present.contains(&ymd(2020, 2, 16)));
    // 2020-01-25..31 and 2020-02-16..22
    assert_eq!(present.len(), 14);
}

#[test]
fn test_day_with_missing_gridpoint_is_dropped() {
    let days = [
        (ymd(1980, 1, 1), 1.0),
        (ymd(1980, 1, 2), 2.0),
        (ymd(1980, 1, 3), 3.0),
        (ymd(2020, 2, 8), 0.0),
    ];
    let dates: Vec<NaiveDate> = days.iter().map(|(d, _)| *d).collect();
    let mut values = uniform_days(&days.iter().map(|(_, v)| *v).collect::<Vec<_>>(), POINTS);
    // One gridpoint of 1980-01-02 is missing.
    values[POINTS + 4] = f32::NAN;
    let field = GridField::new_3d(values, LATS.to_vec(), LONS.to_vec(), dates).unwrap();
    let archive = InMemoryArchive::new(field).unwrap();

    let outcome = search_event(
        &archive,
        &event(ymd(2020, 2, 8)),
        &standard_config(),
        &SearchOptions::default(),
    )
    .unwrap();

    assert!(outcome.all_distances.iter().all(|r| r.date != ymd(1980, 1, 2)));
    assert!(outcome.past.iter().all(|r| r.date != ymd(1980, 1, 2)));
    assert_eq!(outcome.past.len(), 2);
    assert!(outcome
        .warnings
        .contains(&SearchWarning::InsufficientData { dropped_days: 1 }));
}

#[test]
fn test_fill_value_counts_as_missing() {
    let dates = vec![ymd(1980, 1, 1), ymd(1980, 1, 2), ymd(2020, 2, 8)];
    let mut values = uniform_days(&[1.0, 2.0, 0.0], POINTS);
    values[0] = -9999.0;
    let field = GridField::new_3d(values, LATS.to_vec(), LONS.to_vec(), dates)
        .unwrap()
        .with_fill_value(-9999.0);
    let archive = InMemoryArchive::new(field).unwrap();

    let outcome = search_event(
        &archive,
        &event(ymd(2020, 2, 8)),
        &standard_config(),
        &SearchOptions::default(),
    )
    .unwrap();

    let dates: Vec<NaiveDate> = outcome.past.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![ymd(1980, 1, 2)]);
}

fn wave_archive(start: NaiveDate, ndays: usize, nlat: usize, nlon: usize) -> InMemoryArchive {
    let lats: Vec<f64> = (0..nlat).map(|i| 60.0 - 10.0 * i as f64).collect();
    let lons: Vec<f64> = (0..nlon).map(|j| 5.0 * j as f64).collect();
    let dates = test_utils::daily_dates(start, ndays);
    let field = GridField::new_3d(wave_series(ndays, nlat, nlon, 0.37), lats, lons, dates).unwrap();
    InMemoryArchive::new(field).unwrap()
}

#[test]
fn test_result_properties_on_wave_archive() {
    // 1985-06-01 onwards straddles the past/present boundary.
    let archive = wave_archive(ymd(1985, 6, 1), 1400, 4, 8);
    let snapshot = ymd(1988, 3, 14);
    let mut config = standard_config();
    config.n_analogues = 10;
    config.exclusion_window_days = 5;
    config.chunk_days = 97;

    let outcome =
        search_event(&archive, &event(snapshot), &config, &SearchOptions::default()).unwrap();

    assert_eq!(outcome.snapshot, snapshot);
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.all_distances.len(), 1400);
    assert!(outcome.all_distances.iter().all(|r| r.distance >= 0.0));
    let at_snapshot = outcome
        .all_distances
        .iter()
        .find(|r| r.date == snapshot)
        .unwrap();
    assert_eq!(at_snapshot.distance, 0.0);

    for period in Period::ALL {
        let results = outcome.period(period);
        assert!(results.len() <= config.n_analogues);
        assert!(results.iter().all(|r| r.date != snapshot));
        assert!(results.iter().all(|r| r.period == period));
        for pair in results.windows(2) {
            assert!(
                pair[0].distance < pair[1].distance
                    || (pair[0].distance == pair[1].distance && pair[0].date < pair[1].date)
            );
        }
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.rank, i + 1);
        }
    }
    assert!(outcome.past.iter().all(|r| r.date.year() <= 1987));
    assert!(outcome.present.iter().all(|r| r.date.year() >= 1988));
}

#[test]
fn test_chunk_size_does_not_change_results() {
    let archive = wave_archive(ymd(1986, 1, 1), 900, 3, 5);
    let snapshot = ymd(1987, 7, 4);
    let mut config = standard_config();
    config.smoothing.window_days = 5;

    config.chunk_days = 900;
    let whole = search_event(&archive, &event(snapshot), &config, &SearchOptions::default())
        .unwrap();
    config.chunk_days = 13;
    let chunked = search_event(&archive, &event(snapshot), &config, &SearchOptions::default())
        .unwrap();

    assert_eq!(whole.all_distances, chunked.all_distances);
    assert_eq!(whole.past, chunked.past);
    assert_eq!(whole.present, chunked.present);
}

#[test]
fn test_archive_edges_report_incomplete_window() {
    let archive = wave_archive(ymd(1986, 1, 1), 60, 3, 5);
    let mut config = standard_config();
    config.smoothing.window_days = 5;

    let outcome = search_event(
        &archive,
        &event(ymd(1986, 1, 30)),
        &config,
        &SearchOptions::default(),
    )
    .unwrap();

    // Two days lost at each end of the archive.
    assert_eq!(outcome.all_distances.len(), 56);
    assert!(outcome
        .warnings
        .contains(&SearchWarning::IncompleteWindow { dropped_days: 4 }));
    assert!(!outcome
        .warnings
        .iter()
        .any(|w| matches!(w, SearchWarning::InsufficientData { .. })));
}

#[test]
fn test_period_filter_skips_other_period() {
    let archive = scenario_archive();
    let options = SearchOptions {
        period_filter: PeriodFilter::Present,
    };
    let outcome =
        search_event(&archive, &event(ymd(2020, 2, 8)), &standard_config(), &options).unwrap();
    assert!(outcome.past.is_empty());
    assert!(outcome
        .warnings
        .iter()
        .all(|w| !matches!(w, SearchWarning::EmptyPeriod { period: Period::Past, .. })));
}

#[test]
fn test_unarchived_snapshot_uses_nearest_day() {
    let archive = scenario_archive();
    let outcome = search_event(
        &archive,
        &event(ymd(2020, 2, 10)),
        &standard_config(),
        &SearchOptions::default(),
    )
    .unwrap();
    assert_eq!(outcome.snapshot, ymd(2020, 2, 8));
    assert!(outcome.warnings.contains(&SearchWarning::SnapshotShifted {
        requested: ymd(2020, 2, 10),
        actual: ymd(2020, 2, 8),
    }));
}

#[test]
fn test_region_outside_grid_is_error() {
    let archive = scenario_archive();
    let far_away = EventDefinition::new(
        "nowhere",
        ymd(2020, 2, 8),
        BoundingBox::new(100.0, 120.0, -50.0, -40.0),
    );
    let err = search_event(
        &archive,
        &far_away,
        &standard_config(),
        &SearchOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), "RegionOutOfBoundsError");
}

#[test]
fn test_reference_with_missing_data_is_unavailable() {
    let dates = vec![ymd(1980, 1, 1), ymd(2020, 2, 8)];
    let mut values = uniform_days(&[1.0, 0.0], POINTS);
    values[POINTS] = f32::NAN;
    let field = GridField::new_3d(values, LATS.to_vec(), LONS.to_vec(), dates).unwrap();
    let archive = InMemoryArchive::new(field).unwrap();

    let err = search_event(
        &archive,
        &event(ymd(2020, 2, 8)),
        &standard_config(),
        &SearchOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), "ReferenceUnavailableError");
}
