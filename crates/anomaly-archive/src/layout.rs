//! Yearly anomaly file naming and discovery.
//!
//! The preprocessing stage writes one file per variable and year, named
//! `anomaly_<variable>_<year>.<ext>`, into a single directory per dataset.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ArchiveError, ArchiveResult};

/// On-disk encoding of a yearly anomaly file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Json,
    NetCdf,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "nc" | "nc4" => Some(Self::NetCdf),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::NetCdf => "nc",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One year of anomalies for one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearFile {
    pub year: i32,
    pub path: PathBuf,
    pub format: FileFormat,
}

/// File name the preprocessing stage uses for `variable` in `year`.
pub fn year_file_name(variable: &str, year: i32, format: FileFormat) -> String {
    format!("anomaly_{}_{}.{}", variable, year, format.extension())
}

/// Inverse of [`year_file_name`]; None for files belonging to other variables.
pub fn parse_year_file_name(name: &str, variable: &str) -> Option<(i32, FileFormat)> {
    let rest = name.strip_prefix("anomaly_")?.strip_prefix(variable)?;
    let rest = rest.strip_prefix('_')?;
    let (year, ext) = rest.split_once('.')?;
    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((year.parse().ok()?, FileFormat::from_extension(ext)?))
}

/// List the yearly files for `variable` in `dir`, sorted by year.
///
/// Returns an empty list when nothing matches; the caller decides whether
/// that is fatal. A year present in two formats is rejected.
pub fn discover_year_files(dir: &Path, variable: &str) -> ArchiveResult<Vec<YearFile>> {
    let mut files = Vec::new();

    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| ArchiveError::io(dir, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if let Some((year, format)) = parse_year_file_name(name, variable) {
            files.push(YearFile {
                year,
                path: entry.path().to_path_buf(),
                format,
            });
        }
    }

    files.sort_by_key(|f| f.year);

    if let Some(pair) = files.windows(2).find(|w| w[0].year == w[1].year) {
        return Err(ArchiveError::invalid(
            dir,
            format!(
                "year {} present twice ({} and {})",
                pair[0].year,
                pair[0].path.display(),
                pair[1].path.display()
            ),
        ));
    }

    debug!(
        dir = %dir.display(),
        variable = variable,
        count = files.len(),
        "Discovered yearly anomaly files"
    );

    Ok(files)
}
