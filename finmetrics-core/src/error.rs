//! Error taxonomy for the transform layer.
//!
//! Every variant is a deterministic consequence of bad input or bad
//! configuration. Nothing here is transient, so nothing is retried.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    /// Calibration history has no usable spread between its bounds.
    #[error(
        "degenerate calibration window: lower bound {lower} >= upper bound {upper} \
         (supply a longer or more variable history)"
    )]
    DegenerateCalibration { lower: f64, upper: f64 },

    #[error("invalid signal band {thresholds:?}: thresholds must be finite and non-decreasing")]
    InvalidBand { thresholds: [f64; 4] },

    #[error("invalid moving-average window {window}: must be >= 1")]
    InvalidWindow { window: usize },

    #[error("invalid percentile bounds ({lower}, {upper}): need 0 <= lower < upper <= 100")]
    InvalidPercentile { lower: f64, upper: f64 },

    #[error("invalid period {periods}: must be >= 1")]
    InvalidPeriod { periods: usize },

    #[error("series '{name}' is not strictly increasing at index {index}")]
    UnorderedSeries { name: String, index: usize },

    #[error("no aggregation rule given for field '{field}'")]
    MissingAggregation { field: String },
}

pub type Result<T> = std::result::Result<T, MetricError>;
