//! JSON anomaly grids.
//!
//! JSON has no NaN, so missing points are `null`. A `_FillValue` sentinel is
//! also honoured for files converted from packed NetCDF. Both become NaN on
//! read.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use analogue_common::GridField;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, ArchiveResult};
use crate::reader::GridHeader;

/// Serialized form of one yearly anomaly file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonAnomalyFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub time: Vec<NaiveDate>,
    /// Row-major `[time][lat][lon]`.
    pub values: Vec<Option<f32>>,
    #[serde(
        default,
        rename = "_FillValue",
        skip_serializing_if = "Option::is_none"
    )]
    pub fill_value: Option<f32>,
}

/// Axes only; `values` is skipped without being materialised.
#[derive(Deserialize)]
struct JsonHeader {
    lat: Vec<f64>,
    lon: Vec<f64>,
    time: Vec<NaiveDate>,
}

fn open(path: &Path) -> ArchiveResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| ArchiveError::io(path, e))
}

/// Read the coordinate axes of a JSON anomaly file.
pub fn read_json_header(path: &Path) -> ArchiveResult<GridHeader> {
    let header: JsonHeader = serde_json::from_reader(open(path)?)
        .map_err(|e| ArchiveError::invalid(path, e.to_string()))?;
    Ok(GridHeader {
        lats: header.lat,
        lons: header.lon,
        dates: header.time,
    })
}

/// Read a whole JSON anomaly file as a 3D field.
pub fn read_json_grid(path: &Path) -> ArchiveResult<GridField> {
    let file: JsonAnomalyFile = serde_json::from_reader(open(path)?)
        .map_err(|e| ArchiveError::invalid(path, e.to_string()))?;

    let fill = file.fill_value;
    let values = file
        .values
        .into_iter()
        .map(|v| match v {
            Some(x) if Some(x) != fill => x,
            _ => f32::NAN,
        })
        .collect();

    GridField::new_3d(values, file.lat, file.lon, file.time)
        .map_err(|e| ArchiveError::invalid(path, e.to_string()))
}

/// Write a 3D field in the JSON anomaly layout.
///
/// Missing values (NaN or the field's fill value) are written as `null`.
pub fn write_json_grid(path: &Path, field: &GridField, variable: &str) -> ArchiveResult<()> {
    let times = field
        .times()
        .ok_or_else(|| ArchiveError::invalid(path, "cannot write a field without a time axis"))?;

    let doc = JsonAnomalyFile {
        variable: Some(variable.to_string()),
        units: None,
        lat: field.lats().to_vec(),
        lon: field.lons().to_vec(),
        time: times.to_vec(),
        values: field
            .values()
            .iter()
            .map(|&v| (!field.is_missing(v)).then_some(v))
            .collect(),
        fill_value: None,
    };

    let file = File::create(path).map_err(|e| ArchiveError::io(path, e))?;
    serde_json::to_writer(BufWriter::new(file), &doc)
        .map_err(|e| ArchiveError::invalid(path, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nulls_and_fill_values_become_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anomaly_psurf_2000.json");
        std::fs::write(
            &path,
            r#"{"lat":[10.0],"lon":[0.0,1.0],"time":["2000-01-01"],
                "values":[null,-999.0],"_FillValue":-999.0}"#,
        )
        .unwrap();

        let field = read_json_grid(&path).unwrap();
        assert!(field.values().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_header_skips_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anomaly_psurf_2000.json");
        std::fs::write(
            &path,
            r#"{"variable":"psurf","lat":[10.0,0.0],"lon":[0.0],
                "time":["2000-01-01","2000-01-02"],"values":[1,2,3,4]}"#,
        )
        .unwrap();

        let header = read_json_header(&path).unwrap();
        assert_eq!(header.lats, vec![10.0, 0.0]);
        assert_eq!(header.dates.len(), 2);
    }

    #[test]
    fn test_shape_mismatch_is_invalid_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anomaly_psurf_2000.json");
        std::fs::write(
            &path,
            r#"{"lat":[0.0],"lon":[0.0],"time":["2000-01-01"],"values":[1,2]}"#,
        )
        .unwrap();
        assert!(matches!(
            read_json_grid(&path),
            Err(ArchiveError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_write_then_read_preserves_missing_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anomaly_psurf_2000.json");
        let date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let field =
            GridField::new_3d(vec![1.5, f32::NAN], vec![0.0], vec![0.0, 1.0], vec![date]).unwrap();

        write_json_grid(&path, &field, "psurf").unwrap();
        let back = read_json_grid(&path).unwrap();
        assert_eq!(back.values()[0], 1.5);
        assert!(back.values()[1].is_nan());
    }
}
