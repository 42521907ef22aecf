//! Common types and utilities shared across the analogue search workspace.

pub mod archive;
pub mod bbox;
pub mod calendar;
pub mod error;
pub mod grid;

pub use archive::{AnomalyArchive, InMemoryArchive};
pub use bbox::BoundingBox;
pub use calendar::{parse_date, YearRange};
pub use error::{AnalogueError, Result};
pub use grid::{GridField, RegionIndices};
