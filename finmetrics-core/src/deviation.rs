//! Deviation from a trailing simple moving average.
//!
//! `deviation[t] = (price[t] - sma[t]) / sma[t]` where `sma[t]` is the mean
//! of the `window` observations ending at `t`. The first `window - 1` points
//! have no value. A window holding a missing observation has no value either.

use crate::error::{MetricError, Result};
use crate::series::{Observation, Series, TimeSeries};

/// Trailing simple moving average, inclusive of the current observation.
pub fn sma(price: &TimeSeries, window: usize) -> Result<TimeSeries> {
    if window == 0 {
        return Err(MetricError::InvalidWindow { window });
    }
    let values = price.values();
    let mut averages = vec![None; values.len()];

    let mut sum = 0.0;
    let mut missing_in_window = 0usize;
    // Length of the run of identical values ending at `i`.
    let mut run = 0usize;
    for (i, value) in values.iter().enumerate() {
        match value {
            Some(v) => sum += v,
            None => missing_in_window += 1,
        }
        run = match (value, i.checked_sub(1).and_then(|j| values[j])) {
            (Some(v), Some(prev)) if *v == prev => run + 1,
            (Some(_), _) => 1,
            (None, _) => 0,
        };
        if i >= window {
            match values[i - window] {
                Some(v) => sum -= v,
                None => missing_in_window -= 1,
            }
        }
        // `sum` only ever holds present values, so a gap leaving the window
        // needs no correction.
        if i + 1 >= window && missing_in_window == 0 {
            // a flat window averages to exactly its value
            averages[i] = match value {
                Some(v) if run >= window => Some(*v),
                _ => Some(sum / window as f64),
            };
        }
    }

    Ok(rebuild(price, format!("sma_{window}"), averages))
}

/// SMA and deviation computed together.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviationColumns {
    pub sma: TimeSeries,
    pub deviation: TimeSeries,
}

/// Relative distance of `price` from its `window`-period SMA.
pub fn deviation(price: &TimeSeries, window: usize) -> Result<TimeSeries> {
    deviation_with_sma(price, window).map(|cols| cols.deviation)
}

pub fn deviation_with_sma(price: &TimeSeries, window: usize) -> Result<DeviationColumns> {
    let sma = sma(price, window)?;
    let deviations = price
        .iter()
        .zip(sma.iter())
        .map(|(p, m)| match (p.finite(), m.finite()) {
            (Some(p), Some(m)) if m != 0.0 => Some((p - m) / m),
            _ => None,
        })
        .collect();
    let deviation = rebuild(price, "deviation", deviations);
    Ok(DeviationColumns { sma, deviation })
}

fn rebuild(like: &TimeSeries, name: impl Into<String>, values: Vec<Option<f64>>) -> TimeSeries {
    let points = like
        .dates()
        .zip(values)
        .map(|(date, value)| Observation { date, value })
        .collect();
    Series::from_ordered(name, points)
}
