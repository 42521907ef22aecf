//! Yearly anomaly grids stored as NetCDF.
//!
//! Expects a `(time, lat, lon)` variable named after the anomaly variable,
//! CF time units on the time axis, and optional packing attributes
//! (`scale_factor`, `add_offset`, `_FillValue` / `missing_value`).

use std::path::Path;

use analogue_common::calendar::CfTimeUnits;
use analogue_common::{GridField, RegionIndices};
use chrono::NaiveDate;

use crate::error::{ArchiveError, ArchiveResult};
use crate::reader::GridHeader;

const LAT_NAMES: [&str; 2] = ["lat", "latitude"];
const LON_NAMES: [&str; 2] = ["lon", "longitude"];
const TIME_NAMES: [&str; 2] = ["time", "valid_time"];

fn open(path: &Path) -> ArchiveResult<netcdf::File> {
    netcdf::open(path)
        .map_err(|e| ArchiveError::invalid(path, format!("Failed to open NetCDF: {}", e)))
}

fn find_variable<'f>(file: &'f netcdf::File, names: &[&str]) -> Option<netcdf::Variable<'f>> {
    names.iter().find_map(|name| file.variable(name))
}

fn read_axis(file: &netcdf::File, names: &[&str], path: &Path) -> ArchiveResult<Vec<f64>> {
    let var = find_variable(file, names)
        .ok_or_else(|| ArchiveError::missing(path, format!("{} coordinate", names[0])))?;
    var.get_values::<f64, _>(..)
        .map_err(|e| ArchiveError::invalid(path, format!("Failed to read {}: {}", names[0], e)))
}

fn read_dates(file: &netcdf::File, path: &Path) -> ArchiveResult<Vec<NaiveDate>> {
    let var = find_variable(file, &TIME_NAMES)
        .ok_or_else(|| ArchiveError::missing(path, "time coordinate"))?;
    let units = get_str_attr(&var, "units")
        .ok_or_else(|| ArchiveError::missing(path, "time units attribute"))?;
    let units = CfTimeUnits::parse(&units)?;

    let offsets: Vec<f64> = var
        .get_values(..)
        .map_err(|e| ArchiveError::invalid(path, format!("Failed to read time: {}", e)))?;

    offsets
        .iter()
        .map(|&offset| {
            units.to_date(offset).ok_or_else(|| {
                ArchiveError::invalid(path, format!("time offset {} out of range", offset))
            })
        })
        .collect()
}

/// Read the coordinate axes of a NetCDF anomaly file.
pub fn read_netcdf_header(path: &Path, variable: &str) -> ArchiveResult<GridHeader> {
    let file = open(path)?;
    if file.variable(variable).is_none() {
        return Err(ArchiveError::missing(path, format!("{} variable", variable)));
    }
    Ok(GridHeader {
        lats: read_axis(&file, &LAT_NAMES, path)?,
        lons: read_axis(&file, &LON_NAMES, path)?,
        dates: read_dates(&file, path)?,
    })
}

/// Read the rows spanned by `region` for every day, then gather its points.
pub fn read_netcdf_region(
    path: &Path,
    variable: &str,
    region: &RegionIndices,
) -> ArchiveResult<GridField> {
    let file = open(path)?;
    let lats = read_axis(&file, &LAT_NAMES, path)?;
    let lons = read_axis(&file, &LON_NAMES, path)?;
    let dates = read_dates(&file, path)?;

    let var = file
        .variable(variable)
        .ok_or_else(|| ArchiveError::missing(path, format!("{} variable", variable)))?;

    let (lat0, lat1) = region
        .lat_bounds()
        .filter(|&(_, hi)| hi < lats.len())
        .ok_or_else(|| ArchiveError::invalid(path, "region rows outside the file's grid"))?;

    // Only the latitude band is sliced on disk; longitude runs may wrap.
    let raw: Vec<f32> = var
        .get_values((.., lat0..lat1 + 1, ..))
        .map_err(|e| ArchiveError::invalid(path, format!("Failed to read {}: {}", variable, e)))?;

    let scale = get_f64_attr(&var, "scale_factor").unwrap_or(1.0);
    let offset = get_f64_attr(&var, "add_offset").unwrap_or(0.0);
    let fill = get_f64_attr(&var, "_FillValue").or_else(|| get_f64_attr(&var, "missing_value"));

    let values: Vec<f32> = raw
        .iter()
        .map(|&v| {
            if fill.map_or(false, |f| f as f32 == v) {
                f32::NAN
            } else {
                (v as f64 * scale + offset) as f32
            }
        })
        .collect();

    let band = GridField::new_3d(values, lats[lat0..=lat1].to_vec(), lons, dates)
        .map_err(|e| ArchiveError::invalid(path, e.to_string()))?;
    let shifted = RegionIndices {
        lat: region.lat.iter().map(|&i| i - lat0).collect(),
        lon: region.lon.clone(),
    };
    Ok(band.select_checked(&shifted)?)
}

// =============================================================================
// Attribute helpers
// =============================================================================

/// Check for an attribute before fetching it; missing optional attributes
/// otherwise produce HDF5 diagnostics on stderr.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

fn get_str_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}
