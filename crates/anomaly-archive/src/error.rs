//! Error types for anomaly file reading.

use std::path::PathBuf;

use analogue_common::AnalogueError;
use thiserror::Error;

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Error types for anomaly file reading.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// File I/O error
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Missing required variable, dimension or attribute
    #[error("Missing required data in {}: {what}", path.display())]
    MissingData { path: PathBuf, what: String },

    /// Content that cannot be interpreted as an anomaly grid
    #[error("Invalid data format in {}: {message}", path.display())]
    InvalidFormat { path: PathBuf, message: String },

    /// Yearly files disagree on the grid
    #[error("Grid of {} does not match {}: {detail}", other.display(), first.display())]
    AxisMismatch {
        first: PathBuf,
        other: PathBuf,
        detail: String,
    },

    /// File extension this build cannot read
    #[error("Unsupported anomaly file {}: {reason}", path.display())]
    Unsupported { path: PathBuf, reason: String },

    #[error(transparent)]
    Grid(#[from] AnalogueError),
}

impl ArchiveError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn missing(path: impl Into<PathBuf>, what: impl Into<String>) -> Self {
        Self::MissingData {
            path: path.into(),
            what: what.into(),
        }
    }

    pub fn invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<ArchiveError> for AnalogueError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Grid(inner) => inner,
            other => AnalogueError::archive_read(other.to_string()),
        }
    }
}
