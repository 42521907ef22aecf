//! Lazy multi-year archive stitched from yearly anomaly files.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use analogue_common::{AnalogueError, AnomalyArchive, GridField, RegionIndices, Result, YearRange};
use chrono::NaiveDate;
use lru::LruCache;
use tracing::{debug, info};

use crate::error::{ArchiveError, ArchiveResult};
use crate::layout::{discover_year_files, YearFile};
use crate::reader::{read_header, read_region};

/// Years kept decoded at once. A chunk plus its smoothing halo straddles at
/// most two files.
const CACHED_YEARS: usize = 2;

/// Axis values from different files must agree to this many degrees.
const AXIS_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    file: usize,
    region: RegionIndices,
}

/// Daily anomalies for one dataset and variable, one file per year.
///
/// Opening reads only the coordinate axes of each file. Values are decoded
/// a year at a time when [`AnomalyArchive::read_block`] first touches that
/// year, restricted to the requested region.
pub struct YearlyArchive {
    dataset: String,
    variable: String,
    dir: PathBuf,
    files: Vec<YearFile>,
    /// Position of each file's first day on the stitched axis, plus the total.
    offsets: Vec<usize>,
    lats: Vec<f64>,
    lons: Vec<f64>,
    dates: Vec<NaiveDate>,
    cache: Mutex<LruCache<CacheKey, Arc<GridField>>>,
}

impl YearlyArchive {
    /// Open every yearly file for `variable` in `dir`.
    pub fn open(dir: impl AsRef<Path>, dataset: &str, variable: &str) -> Result<Self> {
        Self::open_years(dir, dataset, variable, None)
    }

    /// Open the yearly files whose year lies in `years` (all when None).
    ///
    /// Fails with `PrerequisiteMissing` when the directory or the files are
    /// absent, so the caller can point at the preprocessing stage.
    pub fn open_years(
        dir: impl AsRef<Path>,
        dataset: &str,
        variable: &str,
        years: Option<YearRange>,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(AnalogueError::prerequisite_missing(dataset, dir));
        }

        let files: Vec<YearFile> = discover_year_files(dir, variable)?
            .into_iter()
            .filter(|f| years.map_or(true, |range| range.contains_year(f.year)))
            .collect();
        if files.is_empty() {
            return Err(AnalogueError::prerequisite_missing(
                dataset,
                dir.join(format!("anomaly_{}_<year>.*", variable)),
            ));
        }

        let first = read_header(&files[0], variable)?;
        let lats = first.lats;
        let lons = first.lons;
        let mut dates = first.dates;
        let mut offsets = vec![0, dates.len()];

        for file in &files[1..] {
            let header = read_header(file, variable)?;
            check_axis(&lats, &header.lats, "latitude", &files[0].path, &file.path)?;
            check_axis(&lons, &header.lons, "longitude", &files[0].path, &file.path)?;

            if let (Some(&last), Some(&next)) = (dates.last(), header.dates.first()) {
                if next <= last {
                    return Err(ArchiveError::invalid(
                        &file.path,
                        format!("starts on {} but the previous year ends on {}", next, last),
                    )
                    .into());
                }
            }
            dates.extend(header.dates);
            offsets.push(dates.len());
        }

        info!(
            dataset = dataset,
            variable = variable,
            years = files.len(),
            days = dates.len(),
            nlat = lats.len(),
            nlon = lons.len(),
            "Opened anomaly archive"
        );

        let capacity = NonZeroUsize::new(CACHED_YEARS).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            dataset: dataset.to_string(),
            variable: variable.to_string(),
            dir: dir.to_path_buf(),
            files,
            offsets,
            lats,
            lons,
            dates,
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Years present, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.files.iter().map(|f| f.year).collect()
    }

    /// One year restricted to `region`, decoded at most once while cached.
    fn load_year(&self, file: usize, region: &RegionIndices) -> Result<Arc<GridField>> {
        let key = CacheKey {
            file,
            region: region.clone(),
        };

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(field) = cache.get(&key) {
            metrics::counter!("anomaly_archive_cache_hits_total").increment(1);
            return Ok(Arc::clone(field));
        }

        let year_file = &self.files[file];
        debug!(path = %year_file.path.display(), "Decoding anomaly year");
        metrics::counter!("anomaly_archive_year_loads_total").increment(1);

        let field = Arc::new(read_region(year_file, &self.variable, region)?);
        let expected = self.offsets[file + 1] - self.offsets[file];
        if field.ntime() != expected {
            return Err(ArchiveError::invalid(
                &year_file.path,
                format!("has {} days, header reported {}", field.ntime(), expected),
            )
            .into());
        }
        cache.put(key, Arc::clone(&field));
        Ok(field)
    }

    fn region_axes(&self, region: &RegionIndices) -> Result<(Vec<f64>, Vec<f64>)> {
        let lats: Option<Vec<f64>> =
            region.lat.iter().map(|&i| self.lats.get(i).copied()).collect();
        let lons: Option<Vec<f64>> =
            region.lon.iter().map(|&j| self.lons.get(j).copied()).collect();
        match (lats, lons) {
            (Some(lats), Some(lons)) if !lats.is_empty() && !lons.is_empty() => Ok((lats, lons)),
            _ => Err(AnalogueError::invalid_grid(format!(
                "region indices {:?} do not fit a {} x {} grid",
                region.shape(),
                self.lats.len(),
                self.lons.len()
            ))),
        }
    }
}

impl AnomalyArchive for YearlyArchive {
    fn latitudes(&self) -> &[f64] {
        &self.lats
    }

    fn longitudes(&self) -> &[f64] {
        &self.lons
    }

    fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    fn read_block(
        &self,
        start: usize,
        count: usize,
        region: &RegionIndices,
    ) -> Result<GridField> {
        let end = start + count;
        if end > self.dates.len() {
            return Err(AnalogueError::invalid_grid(format!(
                "block {}..{} exceeds {} archived days",
                start,
                end,
                self.dates.len()
            )));
        }
        let (lats, lons) = self.region_axes(region)?;

        let mut values = Vec::with_capacity(count * region.len());
        for file in 0..self.files.len() {
            let (file_start, file_end) = (self.offsets[file], self.offsets[file + 1]);
            let lo = start.max(file_start);
            let hi = end.min(file_end);
            if lo >= hi {
                continue;
            }
            let year = self.load_year(file, region)?;
            let window = year.time_window(lo - file_start, hi - lo)?;
            values.extend_from_slice(window.values());
        }

        GridField::new_3d(values, lats, lons, self.dates[start..end].to_vec())
    }

    fn describe(&self) -> String {
        format!(
            "{} {} anomalies in {} ({} years, {} days)",
            self.dataset,
            self.variable,
            self.dir.display(),
            self.files.len(),
            self.dates.len()
        )
    }
}

fn check_axis(
    expected: &[f64],
    actual: &[f64],
    name: &str,
    first: &Path,
    other: &Path,
) -> ArchiveResult<()> {
    let mismatch = |detail: String| ArchiveError::AxisMismatch {
        first: first.to_path_buf(),
        other: other.to_path_buf(),
        detail,
    };
    if expected.len() != actual.len() {
        return Err(mismatch(format!(
            "{} axis has {} points instead of {}",
            name,
            actual.len(),
            expected.len()
        )));
    }
    if let Some((i, (a, b))) = expected
        .iter()
        .zip(actual)
        .enumerate()
        .find(|(_, (a, b))| (*a - *b).abs() > AXIS_TOLERANCE)
    {
        return Err(mismatch(format!("{} {} is {} instead of {}", name, i, b, a)));
    }
    Ok(())
}
