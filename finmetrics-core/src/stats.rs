//! Summary statistics over a series' present values.

use crate::percentile::{quantile_sorted, sorted_finite, QuantileMethod};
use crate::series::TimeSeries;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SeriesStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Sample standard deviation (n - 1). `None` below two values.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Most recent present value.
    pub current: Option<f64>,
}

impl SeriesStats {
    pub fn from_series(series: &TimeSeries) -> Self {
        let values = series.present_values();
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = (values.len() > 1).then(|| {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1.0)).sqrt()
        });
        let sorted = sorted_finite(&values);

        Self {
            count: values.len(),
            mean: Some(mean),
            median: quantile_sorted(&sorted, 50.0, QuantileMethod::Linear),
            std,
            min: sorted.first().copied(),
            max: sorted.last().copied(),
            current: series.last_present().map(|(_, v)| v),
        }
    }
}

/// Statistics of a deviation series plus the share of time spent above and
/// below the average. Flat, so it writes as a single CSV row.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DeviationStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub current: Option<f64>,
    /// Percent of present values above zero.
    pub pct_bullish: f64,
    /// Percent of present values below zero.
    pub pct_bearish: f64,
}

impl DeviationStats {
    pub fn from_series(deviation: &TimeSeries) -> Self {
        let SeriesStats {
            count,
            mean,
            median,
            std,
            min,
            max,
            current,
        } = SeriesStats::from_series(deviation);
        if count == 0 {
            return Self::default();
        }
        let values = deviation.present_values();
        let share = |pred: fn(&f64) -> bool| {
            100.0 * values.iter().filter(|v| pred(v)).count() as f64 / count as f64
        };
        Self {
            count,
            mean,
            median,
            std,
            min,
            max,
            current,
            pct_bullish: share(|v| *v > 0.0),
            pct_bearish: share(|v| *v < 0.0),
        }
    }
}
