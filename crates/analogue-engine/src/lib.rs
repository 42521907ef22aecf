//! Analogue search engine.
//!
//! Given a daily anomaly archive and an event (a snapshot date plus a
//! geographic box), finds the historical days whose anomaly pattern over the
//! box most resembles the snapshot, separately for a past and a present
//! period.
//!
//! # Pipeline
//!
//! ```text
//! EventDefinition + AnalogueConfig
//!      │
//!      ▼
//! DistanceEngine::new(archive, region)   ─► RegionOutOfBounds
//!      │
//!      ├─► reference(snapshot)           ─► ReferenceUnavailable
//!      │
//!      ├─► compute()  chunked, parallel weighted RMS per day
//!      │
//!      ▼
//! PeriodPartitioner  (drop snapshot, exclusion window, out-of-period days)
//!      │
//!      ▼
//! AnalogueSelector   (top N per period, ranked)
//!      │
//!      ▼
//! ResultWriter       (analogues.csv and friends, written atomically)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use analogue_engine::{search_event, AnalogueConfig, ResultWriter, SearchOptions};
//!
//! let outcome = search_event(&archive, &event, &config, &SearchOptions::default())?;
//! ResultWriter::new(output_dir).write(&outcome)?;
//! ```

pub mod config;
pub mod distance;
pub mod partition;
pub mod search;
pub mod selector;
pub mod smoothing;
pub mod warnings;
pub mod weighting;
pub mod writer;

// Re-export commonly used types at crate root
pub use config::{
    validate_events, AnalogueConfig, EventDefinition, PeriodFilter, SearchOptions,
    DEFAULT_N_ANALOGUES,
};
pub use distance::{weighted_rms, DistanceEngine, DistanceRecord, DistanceRun, EngineOptions};
pub use partition::{Partition, Period, PeriodPartitioner, Placement};
pub use search::{search_event, SearchOutcome};
pub use selector::{AnalogueResult, AnalogueSelector};
pub use smoothing::RunningMean;
pub use warnings::SearchWarning;
pub use weighting::LatitudeWeighting;
pub use writer::{read_analogues, read_analogues_file, ResultWriter, WrittenFiles};
