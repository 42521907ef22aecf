//! File-backed daily anomaly archives.
//!
//! The preprocessing stage leaves one anomaly file per variable and year in
//! `Data/F01_preprocess/<dataset>/anomaly/`. This crate discovers those files,
//! checks they share a grid, and stitches them into a single lazily read
//! [`AnomalyArchive`](analogue_common::AnomalyArchive).
//!
//! # Formats
//!
//! - `.json`: always available, see [`json::JsonAnomalyFile`]
//! - `.nc`: NetCDF, behind the `netcdf` feature (needs libnetcdf)

pub mod archive;
pub mod error;
pub mod json;
pub mod layout;
#[cfg(feature = "netcdf")]
pub mod nc;
pub mod reader;

pub use archive::YearlyArchive;
pub use error::{ArchiveError, ArchiveResult};
pub use json::{read_json_grid, write_json_grid, JsonAnomalyFile};
pub use layout::{discover_year_files, year_file_name, FileFormat, YearFile};
pub use reader::GridHeader;
