//! Format dispatch for yearly anomaly files.

use analogue_common::{GridField, RegionIndices};
use chrono::NaiveDate;

use crate::error::{ArchiveError, ArchiveResult};
use crate::layout::{FileFormat, YearFile};

/// Coordinate axes of one yearly file.
#[derive(Debug, Clone, PartialEq)]
pub struct GridHeader {
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub dates: Vec<NaiveDate>,
}

/// Read the axes of `file` without loading its values.
pub fn read_header(file: &YearFile, variable: &str) -> ArchiveResult<GridHeader> {
    match file.format {
        FileFormat::Json => crate::json::read_json_header(&file.path),
        FileFormat::NetCdf => read_netcdf_header(file, variable),
    }
}

/// Read every day of `file`, restricted to `region`. Missing data is NaN.
pub fn read_region(
    file: &YearFile,
    variable: &str,
    region: &RegionIndices,
) -> ArchiveResult<GridField> {
    match file.format {
        FileFormat::Json => Ok(crate::json::read_json_grid(&file.path)?.select_checked(region)?),
        FileFormat::NetCdf => read_netcdf_region(file, variable, region),
    }
}

#[cfg(feature = "netcdf")]
fn read_netcdf_header(file: &YearFile, variable: &str) -> ArchiveResult<GridHeader> {
    crate::nc::read_netcdf_header(&file.path, variable)
}

#[cfg(feature = "netcdf")]
fn read_netcdf_region(
    file: &YearFile,
    variable: &str,
    region: &RegionIndices,
) -> ArchiveResult<GridField> {
    crate::nc::read_netcdf_region(&file.path, variable, region)
}

#[cfg(not(feature = "netcdf"))]
fn read_netcdf_header(file: &YearFile, _variable: &str) -> ArchiveResult<GridHeader> {
    Err(netcdf_disabled(file))
}

#[cfg(not(feature = "netcdf"))]
fn read_netcdf_region(
    file: &YearFile,
    _variable: &str,
    _region: &RegionIndices,
) -> ArchiveResult<GridField> {
    Err(netcdf_disabled(file))
}

#[cfg(not(feature = "netcdf"))]
fn netcdf_disabled(file: &YearFile) -> ArchiveError {
    ArchiveError::Unsupported {
        path: file.path.clone(),
        reason: "built without the `netcdf` feature".to_string(),
    }
}
