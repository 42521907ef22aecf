//! On-disk layout of the analogue pipeline.

use std::path::{Path, PathBuf};

use analogue_common::AnalogueError;

const PREPROCESS_DIR: &str = "Data/F01_preprocess";
const SEARCH_DIR: &str = "Data/F02_analogue_search";

/// Resolves every input and output location from the pipeline root.
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    root: PathBuf,
}

impl PipelinePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Yearly anomaly files written by the preprocessing stage.
    pub fn anomaly_dir(&self, dataset: &str) -> PathBuf {
        self.root.join(PREPROCESS_DIR).join(dataset).join("anomaly")
    }

    /// Result tables of one event.
    pub fn output_dir(&self, dataset: &str, event: &str) -> PathBuf {
        self.root.join(SEARCH_DIR).join(dataset).join(event)
    }
}

/// Dataset names become directory names.
pub fn validate_dataset(dataset: &str) -> Result<(), AnalogueError> {
    let usable = !dataset.is_empty()
        && dataset
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if usable {
        Ok(())
    } else {
        Err(AnalogueError::invalid_field(
            "dataset",
            format!("'{}' is not a valid dataset name", dataset),
        ))
    }
}
