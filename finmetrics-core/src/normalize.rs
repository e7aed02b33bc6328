//! Percentile normalization onto a 0–100 scale.
//!
//! Bounds come from a calibration window (typically a longer history than the
//! query range). Values below the lower bound map to 0, above the upper bound
//! to 100, linearly in between.

use crate::error::{MetricError, Result};
use crate::percentile::{quantile_sorted, sorted_finite, QuantileMethod};
use crate::series::TimeSeries;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_LOWER_PERCENTILE: f64 = 1.0;
pub const DEFAULT_UPPER_PERCENTILE: f64 = 99.0;

/// Relative spread below which a calibration window counts as flat.
const FLAT_TOLERANCE: f64 = 1e-12;

/// How calibration bounds are derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoundsMethod {
    /// Empirical percentiles of the calibration window.
    Percentile { lower: f64, upper: f64 },
    /// Raw minimum and maximum of the calibration window.
    MinMax,
}

impl Default for BoundsMethod {
    fn default() -> Self {
        Self::Percentile {
            lower: DEFAULT_LOWER_PERCENTILE,
            upper: DEFAULT_UPPER_PERCENTILE,
        }
    }
}

impl BoundsMethod {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Percentile { lower, upper } => validate_percentiles(lower, upper),
            Self::MinMax => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizeOptions {
    #[serde(default)]
    pub bounds: BoundsMethod,
    #[serde(default)]
    pub quantile: QuantileMethod,
}

impl NormalizeOptions {
    pub fn percentiles(lower: f64, upper: f64) -> Self {
        Self {
            bounds: BoundsMethod::Percentile { lower, upper },
            quantile: QuantileMethod::default(),
        }
    }
}

/// Lower/upper bounds derived from a calibration window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationBounds {
    pub lower: f64,
    pub upper: f64,
}

impl CalibrationBounds {
    pub fn from_calibration(calibration: &TimeSeries, opts: &NormalizeOptions) -> Result<Self> {
        opts.bounds.validate()?;
        let sorted = sorted_finite(&calibration.present_values());

        let bounds = match opts.bounds {
            BoundsMethod::Percentile { lower, upper } => (
                quantile_sorted(&sorted, lower, opts.quantile),
                quantile_sorted(&sorted, upper, opts.quantile),
            ),
            BoundsMethod::MinMax => (sorted.first().copied(), sorted.last().copied()),
        };

        let (lower, upper) = match bounds {
            (Some(lower), Some(upper)) => (lower, upper),
            _ => {
                return Err(MetricError::DegenerateCalibration {
                    lower: f64::NAN,
                    upper: f64::NAN,
                })
            }
        };

        let scale = 1.0_f64.max(lower.abs()).max(upper.abs());
        if upper - lower <= FLAT_TOLERANCE * scale {
            return Err(MetricError::DegenerateCalibration { lower, upper });
        }

        debug!(
            calibration = calibration.name(),
            samples = sorted.len(),
            lower,
            upper,
            "calibration bounds"
        );
        Ok(Self { lower, upper })
    }

    /// Rescale one value onto [0, 100].
    pub fn scale(&self, value: f64) -> f64 {
        (100.0 * (value - self.lower) / (self.upper - self.lower)).clamp(0.0, 100.0)
    }
}

/// Normalize `raw` against `calibration` using the given percentiles.
pub fn normalize(
    raw: &TimeSeries,
    calibration: &TimeSeries,
    lower_percentile: f64,
    upper_percentile: f64,
) -> Result<TimeSeries> {
    normalize_with(
        raw,
        calibration,
        &NormalizeOptions::percentiles(lower_percentile, upper_percentile),
    )
}

/// Normalize with explicit options.
pub fn normalize_with(
    raw: &TimeSeries,
    calibration: &TimeSeries,
    opts: &NormalizeOptions,
) -> Result<TimeSeries> {
    let bounds = CalibrationBounds::from_calibration(calibration, opts)?;
    Ok(raw.map(format!("{}_normalized", raw.name()), |&v| {
        v.is_finite().then(|| bounds.scale(v))
    }))
}

fn validate_percentiles(lower: f64, upper: f64) -> Result<()> {
    let ok = lower.is_finite()
        && upper.is_finite()
        && (0.0..=100.0).contains(&lower)
        && (0.0..=100.0).contains(&upper)
        && lower < upper;
    if ok {
        Ok(())
    } else {
        Err(MetricError::InvalidPercentile { lower, upper })
    }
}
