//! # Plant Kit Common - Shared Types and Utilities
//!
//! Shared data structures for the plant-kit workspace: analysis parameters,
//! the observation store that collects measured traits, small geometry value
//! types and the summary statistics used by the image-analysis crates.
//!
//! ## Example
//!
//! ```rust
//! use plant_kit_common::{Datatype, Observation, ObservationValue, Outputs, Params};
//!
//! let params = Params::default();
//! let mut outputs = Outputs::new();
//! outputs.add_observation(Observation {
//!     sample: params.sample_label.clone(),
//!     variable: "area".to_string(),
//!     trait_name: "area".to_string(),
//!     method: "phenotype::analyze::size".to_string(),
//!     scale: "pixels".to_string(),
//!     datatype: Datatype::Int,
//!     value: ObservationValue::Int(1234),
//!     label: "pixels".to_string(),
//! });
//!
//! assert_eq!(outputs.len(), 1);
//! ```

use serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use thiserror::Error;

pub mod outputs;
pub mod params;

// Re-exports for convenience
pub use outputs::{Datatype, Observation, ObservationValue, Outputs};
pub use params::{DebugMode, Params};

/// Result type for shared plant-kit operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Standard error type for shared plant-kit operations
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,

    #[error("Configuration validation failed: {details}")]
    ValidationFailed { details: String },

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

/// 2D point with floating-point coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance_to(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Size with width and height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    /// Create a new size
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Calculate the area
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Ratio of the longer side to the shorter one, always >= 1.
    ///
    /// Degenerate sizes (a zero side) report infinity.
    pub fn elongation(&self) -> f64 {
        let long = self.width.max(self.height);
        let short = self.width.min(self.height);
        if short <= 0.0 {
            f64::INFINITY
        } else {
            long / short
        }
    }
}

/// Min / max / mean of a set of values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Summary statistics shared by the analysis crates
pub mod stats {
    use super::Summary;

    /// Median of `values`, averaging the two middle values for even lengths.
    ///
    /// NaN values are ordered last. Returns `None` for an empty slice.
    pub fn median(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    /// Arithmetic mean, `None` for an empty slice
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    /// Min, max and mean in a single pass
    pub fn summarize(values: &[f64]) -> Option<Summary> {
        let mean = mean(values)?;
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        Some(Summary { min, max, mean })
    }
}
