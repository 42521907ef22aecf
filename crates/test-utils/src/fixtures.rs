//! Common test fixtures for analogue search tests.
//!
//! Regions, periods and configuration documents modelled on the events the
//! pipeline is run against.

/// Event regions as `(lon_min, lon_max, lat_min, lat_max)`.
pub mod regions {
    /// Antarctic Peninsula heatwave region, 0..360 convention.
    pub const ANTARCTIC_PENINSULA: (f64, f64, f64, f64) = (290.0, 310.0, -70.0, -60.0);

    /// Western Europe, signed longitudes crossing Greenwich.
    pub const WESTERN_EUROPE: (f64, f64, f64, f64) = (-10.0, 20.0, 35.0, 60.0);

    /// The same meridian crossing written in the 0..360 convention.
    pub const GREENWICH_WRAP: (f64, f64, f64, f64) = (350.0, 10.0, -10.0, 10.0);

    /// Whole globe.
    pub const GLOBAL: (f64, f64, f64, f64) = (0.0, 360.0, -90.0, 90.0);

    /// Inverted latitudes; must fail validation.
    pub const INVERTED: (f64, f64, f64, f64) = (0.0, 10.0, 20.0, 10.0);
}

/// Past/present year ranges as `(start_year, end_year)`.
pub mod periods {
    pub const PAST: (i32, i32) = (1948, 1987);
    pub const PRESENT: (i32, i32) = (1988, 2026);
}

/// YAML documents in the shape the CLI reads.
pub mod yaml {
    /// A complete analogue configuration.
    pub const ANALOGUE_CONFIG: &str = r#"
n_analogues: 15
distance:
  match_variable: psurf
  min_valid_fraction: 1.0
periods:
  past:
    start_year: 1948
    end_year: 1987
  present:
    start_year: 1988
    end_year: 2026
exclusion_window_days: 7
"#;

    /// Two events, one of which crosses the 0/360 seam.
    pub const EXTREME_EVENTS: &str = r#"
events:
  - name: antarctica_peninsula_2020
    snapshot_date: "2020-02-08"
    description: Record temperatures at Esperanza
    region:
      lon_min: 290.0
      lon_max: 310.0
      lat_min: -70.0
      lat_max: -60.0
  - name: greenwich_storm_2021
    snapshot_date: "2021-01-10"
    smoothing_days: 3
    region:
      lon_min: 350.0
      lon_max: 10.0
      lat_min: 40.0
      lat_max: 55.0
"#;
}
