//! Error types for analogue search.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias using AnalogueError.
pub type Result<T> = std::result::Result<T, AnalogueError>;

/// Primary error type for analogue search operations.
///
/// Every variant is fatal for the event being searched. Non-fatal conditions
/// (dropped days, short periods) are reported as warnings by the engine.
#[derive(Debug, Error)]
pub enum AnalogueError {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid value for '{field}': {message}")]
    InvalidField { field: String, message: String },

    // === Input Data Errors ===
    #[error("Prerequisite data missing for dataset '{dataset}': {}", path.display())]
    PrerequisiteMissing { dataset: String, path: PathBuf },

    #[error("Region {requested} does not intersect archive coverage {coverage}")]
    RegionOutOfBounds { requested: String, coverage: String },

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Reference pattern unavailable at {date}: {reason}")]
    ReferenceUnavailable { date: NaiveDate, reason: String },

    #[error("Failed to read archive: {0}")]
    ArchiveRead(String),

    // === Output Errors ===
    #[error("Failed to write results: {0}")]
    Output(String),
}

impl AnalogueError {
    /// Create a Configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an InvalidField error.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a PrerequisiteMissing error.
    pub fn prerequisite_missing(dataset: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::PrerequisiteMissing {
            dataset: dataset.into(),
            path: path.into(),
        }
    }

    /// Create a RegionOutOfBounds error.
    pub fn region_out_of_bounds(requested: impl Into<String>, coverage: impl Into<String>) -> Self {
        Self::RegionOutOfBounds {
            requested: requested.into(),
            coverage: coverage.into(),
        }
    }

    /// Create an InvalidGrid error.
    pub fn invalid_grid(msg: impl Into<String>) -> Self {
        Self::InvalidGrid(msg.into())
    }

    /// Create an ArchiveRead error.
    pub fn archive_read(msg: impl Into<String>) -> Self {
        Self::ArchiveRead(msg.into())
    }

    /// True for errors raised before any computation starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AnalogueError::Configuration(_) | AnalogueError::InvalidField { .. }
        )
    }

    /// Short machine-friendly kind, used in batch summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalogueError::Configuration(_) | AnalogueError::InvalidField { .. } => {
                "ConfigurationError"
            }
            AnalogueError::PrerequisiteMissing { .. } => "PrerequisiteMissingError",
            AnalogueError::RegionOutOfBounds { .. } => "RegionOutOfBoundsError",
            AnalogueError::InvalidGrid(_) => "InvalidGridError",
            AnalogueError::ReferenceUnavailable { .. } => "ReferenceUnavailableError",
            AnalogueError::ArchiveRead(_) => "ArchiveReadError",
            AnalogueError::Output(_) => "OutputError",
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for AnalogueError {
    fn from(err: std::io::Error) -> Self {
        AnalogueError::Output(err.to_string())
    }
}
