//! Force-displacement curve feature extraction for key switch measurements.
//!
//! Raw press/release captures are loaded, split into strokes, and reduced to a
//! small [`CurveMetadata`] record (bottom-out, tactile peak/trough, tactile
//! flag). Every numeric stage is a pure function over point slices; the batch
//! driver in [`pipeline`] fans files out across threads and [`Registry`]
//! collects the results once the whole batch is done.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod derivative;
pub mod extrema;
pub mod features;
pub mod loader;
pub mod pipeline;
pub mod registry;
pub mod simplify;
pub mod store;
pub mod stroke;

pub use features::{extract_features, tactile_threshold};
pub use loader::{is_excluded, load_samples};
pub use pipeline::{process_batch, process_source, run_batch, BatchOutput, ProcessedCurve, SourceFile};
pub use registry::{normalize_key, KeyCollision, Registry};
pub use store::{CurveSource, CurveStore, DirSource};
pub use stroke::partition;

#[derive(Error, Debug)]
pub enum FcError {
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed curve record: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub downstroke: Vec<Point>,
    pub upstroke: Vec<Point>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveMetadata {
    pub bottom_out: Point,
    pub tactile_max: Point,
    pub tactile_min: Point,
    pub is_tactile: bool,
}

impl Default for CurveMetadata {
    fn default() -> Self {
        Self {
            bottom_out: Point::ORIGIN,
            tactile_max: Point::ORIGIN,
            tactile_min: Point::ORIGIN,
            is_tactile: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Params {
    pub header_lines: usize,
    pub displacement_column: String,
    pub force_column: String,
    pub exclude_pattern: String,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            header_lines: 5,
            displacement_column: "displacement".to_string(),
            force_column: "force".to_string(),
            exclude_pattern: "HighResolutionRaw".to_string(),
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), FcError> {
        if self.displacement_column.trim().is_empty() {
            return Err(FcError::InvalidParameter(
                "displacement column name is empty".into(),
            ));
        }
        if self.force_column.trim().is_empty() {
            return Err(FcError::InvalidParameter("force column name is empty".into()));
        }
        if self.exclude_pattern.trim().is_empty() {
            return Err(FcError::InvalidParameter("exclude pattern is empty".into()));
        }
        Ok(())
    }
}
