//! CSV result tables.
//!
//! `analogues.csv` is read by the plotting stage and its seven columns are a
//! fixed contract: `date,distance,year,month,day,rank,period`. Every file of
//! an event is rendered to a temporary sibling first and only renamed into
//! place once all of them rendered. Any previous `analogues.csv` is removed
//! before the first rename and the new one is renamed last, so a present
//! `analogues.csv` always belongs to the sibling tables next to it.
//!
//! A per-period table exists only for the periods that were searched, which
//! is how [`ResultWriter::is_complete`] tells a past-only result set from a
//! full one.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use analogue_common::{AnalogueError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::distance::DistanceRecord;
use crate::config::PeriodFilter;
use crate::partition::Period;
use crate::search::SearchOutcome;
use crate::selector::AnalogueResult;

pub const ANALOGUES_FILE: &str = "analogues.csv";
pub const PAST_ANALOGUES_FILE: &str = "past_analogues.csv";
pub const PRESENT_ANALOGUES_FILE: &str = "present_analogues.csv";
pub const ALL_DISTANCES_FILE: &str = "all_distances.csv";

pub const ANALOGUE_COLUMNS: [&str; 7] =
    ["date", "distance", "year", "month", "day", "rank", "period"];
pub const DISTANCE_COLUMNS: [&str; 5] = ["date", "distance", "year", "month", "day"];

#[derive(Debug, Serialize, Deserialize)]
struct AnalogueRow {
    date: NaiveDate,
    distance: f64,
    year: i32,
    month: u32,
    day: u32,
    rank: usize,
    period: Period,
}

impl From<&AnalogueResult> for AnalogueRow {
    fn from(r: &AnalogueResult) -> Self {
        Self {
            date: r.date,
            distance: r.distance,
            year: r.year(),
            month: r.month(),
            day: r.day(),
            rank: r.rank,
            period: r.period,
        }
    }
}

#[derive(Debug, Serialize)]
struct DistanceRow {
    date: NaiveDate,
    distance: f64,
    year: i32,
    month: u32,
    day: u32,
}

fn csv_error(err: csv::Error) -> AnalogueError {
    AnalogueError::Output(format!("CSV error: {}", err))
}

fn headerless<W: Write>(out: W, columns: &[&str]) -> Result<csv::Writer<W>> {
    // Headers are written by hand so empty tables still carry them.
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(columns).map_err(csv_error)?;
    Ok(writer)
}

/// Write analogue rows, header included, in the order given.
pub fn write_analogues<'a, W: Write>(
    out: W,
    results: impl IntoIterator<Item = &'a AnalogueResult>,
) -> Result<()> {
    let mut writer = headerless(out, &ANALOGUE_COLUMNS)?;
    for result in results {
        writer.serialize(AnalogueRow::from(result)).map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write every computed distance, header included.
pub fn write_distances<'a, W: Write>(
    out: W,
    records: impl IntoIterator<Item = &'a DistanceRecord>,
) -> Result<()> {
    let mut writer = headerless(out, &DISTANCE_COLUMNS)?;
    for r in records {
        writer
            .serialize(DistanceRow {
                date: r.date,
                distance: r.distance,
                year: r.year(),
                month: r.month(),
                day: r.day(),
            })
            .map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

/// Parse an analogue table written by [`write_analogues`].
pub fn read_analogues<R: io::Read>(input: R) -> Result<Vec<AnalogueResult>> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers().map_err(csv_error)?.clone();
    if headers.iter().ne(ANALOGUE_COLUMNS.iter().copied()) {
        return Err(AnalogueError::Output(format!(
            "unexpected analogue columns: {:?}",
            headers.iter().collect::<Vec<_>>()
        )));
    }
    reader
        .deserialize::<AnalogueRow>()
        .map(|row| {
            let row = row.map_err(csv_error)?;
            Ok(AnalogueResult {
                date: row.date,
                distance: row.distance,
                period: row.period,
                rank: row.rank,
            })
        })
        .collect()
}

pub fn read_analogues_file(path: &Path) -> Result<Vec<AnalogueResult>> {
    let file = File::open(path)
        .map_err(|e| AnalogueError::Output(format!("{}: {}", path.display(), e)))?;
    read_analogues(io::BufReader::new(file))
}

/// Paths written for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub analogues: PathBuf,
    /// None when the past period was not searched.
    pub past: Option<PathBuf>,
    pub present: Option<PathBuf>,
    pub all_distances: PathBuf,
}

/// Writes an event's result tables into one directory.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    dir: PathBuf,
}

impl ResultWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn analogues_path(&self) -> PathBuf {
        self.dir.join(ANALOGUES_FILE)
    }

    pub fn period_path(&self, period: Period) -> PathBuf {
        match period {
            Period::Past => self.dir.join(PAST_ANALOGUES_FILE),
            Period::Present => self.dir.join(PRESENT_ANALOGUES_FILE),
        }
    }

    /// True once a result set covering every period in `periods` has been written.
    pub fn is_complete(&self, periods: PeriodFilter) -> bool {
        self.analogues_path().is_file()
            && Period::ALL
                .into_iter()
                .filter(|p| periods.includes(*p))
                .all(|p| self.period_path(p).is_file())
    }

    /// Render all tables, then move them into place.
    pub fn write(&self, outcome: &SearchOutcome) -> Result<WrittenFiles> {
        fs::create_dir_all(&self.dir).map_err(|e| self.io_error(e))?;

        let mut tables = Vec::new();
        for period in Period::ALL {
            if outcome.periods.includes(period) {
                let tmp = self.render(|out| write_analogues(out, outcome.period(period)))?;
                tables.push((tmp, self.period_path(period)));
            }
        }
        let distances = self.render(|out| write_distances(out, &outcome.all_distances))?;
        let combined = self.render(|out| write_analogues(out, outcome.results()))?;

        // From here on the directory is inconsistent until the last rename.
        self.remove_if_present(&self.analogues_path())?;
        for period in Period::ALL {
            if !outcome.periods.includes(period) {
                self.remove_if_present(&self.period_path(period))?;
            }
        }

        let files = WrittenFiles {
            analogues: self.analogues_path(),
            past: outcome
                .periods
                .includes(Period::Past)
                .then(|| self.period_path(Period::Past)),
            present: outcome
                .periods
                .includes(Period::Present)
                .then(|| self.period_path(Period::Present)),
            all_distances: self.dir.join(ALL_DISTANCES_FILE),
        };

        for (tmp, path) in tables {
            self.persist(tmp, &path)?;
        }
        self.persist(distances, &files.all_distances)?;
        self.persist(combined, &files.analogues)?;

        info!(
            event = %outcome.event,
            dir = %self.dir.display(),
            periods = %outcome.periods,
            rows = outcome.past.len() + outcome.present.len(),
            "Wrote analogue tables"
        );
        Ok(files)
    }

    fn remove_if_present(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AnalogueError::Output(format!("{}: {}", path.display(), e))),
        }
    }

    fn render(
        &self,
        body: impl FnOnce(&mut io::BufWriter<&File>) -> Result<()>,
    ) -> Result<NamedTempFile> {
        let tmp = NamedTempFile::new_in(&self.dir).map_err(|e| self.io_error(e))?;
        {
            let mut out = io::BufWriter::new(tmp.as_file());
            body(&mut out)?;
            out.flush().map_err(|e| self.io_error(e))?;
        }
        Ok(tmp)
    }

    fn persist(&self, tmp: NamedTempFile, path: &Path) -> Result<()> {
        tmp.persist(path)
            .map(|_| ())
            .map_err(|e| AnalogueError::Output(format!("{}: {}", path.display(), e.error)))
    }

    fn io_error(&self, err: io::Error) -> AnalogueError {
        AnalogueError::Output(format!("{}: {}", self.dir.display(), err))
    }
}
