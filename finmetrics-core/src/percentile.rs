//! Empirical quantiles and percentile ranks.

use crate::series::{Observation, Series, TimeSeries};
use serde::{Deserialize, Serialize};

/// How a percentile is interpolated between order statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantileMethod {
    /// Rank `p * (n + 1)` (1-based), interpolated and clamped to the sample
    /// extremes. The 99th percentile of 99 ones and a single 100 is ~99.
    #[default]
    Exclusive,
    /// Rank `p * (n - 1)` (0-based), interpolated. Never leaves the sample range.
    Linear,
}

/// Percentile `pct` (0..=100) of an ascending, finite slice.
pub fn quantile_sorted(sorted: &[f64], pct: f64, method: QuantileMethod) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => return None,
        1 => return Some(sorted[0]),
        _ => {}
    }
    let p = (pct / 100.0).clamp(0.0, 1.0);

    match method {
        QuantileMethod::Linear => {
            let h = p * (n - 1) as f64;
            let lo = h.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
        }
        QuantileMethod::Exclusive => {
            let h = p * (n + 1) as f64;
            if h <= 1.0 {
                return Some(sorted[0]);
            }
            if h >= n as f64 {
                return Some(sorted[n - 1]);
            }
            let k = h.floor() as usize;
            let frac = h - k as f64;
            Some(sorted[k - 1] + frac * (sorted[k] - sorted[k - 1]))
        }
    }
}

/// Sorted copy of the finite values in `values`.
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Percentile of an unsorted slice. Non-finite entries are ignored.
pub fn percentile(values: &[f64], pct: f64, method: QuantileMethod) -> Option<f64> {
    quantile_sorted(&sorted_finite(values), pct, method)
}

/// Percentile rank (0..=100] of each present value among the series' own
/// present values. Ties share their average rank.
pub fn percentile_rank(series: &TimeSeries) -> TimeSeries {
    let sorted = sorted_finite(&series.present_values());
    let n = sorted.len() as f64;

    let points = series
        .iter()
        .map(|obs| match obs.finite() {
            Some(v) => {
                let below = sorted.partition_point(|x| *x < v);
                let through = sorted.partition_point(|x| *x <= v);
                let avg_rank = (below + 1 + through) as f64 / 2.0;
                Observation::present(obs.date, avg_rank / n * 100.0)
            }
            None => Observation::missing(obs.date),
        })
        .collect();
    Series::from_ordered(format!("{}_percentile", series.name()), points)
}
