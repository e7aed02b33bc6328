//! Percent change, growth rates, and two-series ratio/spread formulas.

use crate::error::{MetricError, Result};
use crate::series::{align, Observation, Series, TimeSeries};

/// `(v[t] - v[t-periods]) / v[t-periods]`, positionally. A missing or zero
/// base gives a missing value; the first `periods` points are missing.
pub fn pct_change(series: &TimeSeries, periods: usize) -> Result<TimeSeries> {
    if periods == 0 {
        return Err(MetricError::InvalidPeriod { periods });
    }
    let values = series.values();
    let points = series
        .iter()
        .enumerate()
        .map(|(i, obs)| {
            let base = i.checked_sub(periods).and_then(|j| values[j]);
            let value = match (obs.finite(), base) {
                (Some(v), Some(b)) if b != 0.0 => Some((v - b) / b),
                _ => None,
            };
            Observation {
                date: obs.date,
                value,
            }
        })
        .collect();
    Ok(Series::from_ordered(
        format!("{}_pct_change_{periods}", series.name()),
        points,
    ))
}

/// Percent change expressed in percent. Monthly series use `periods = 12`
/// for year-over-year growth.
pub fn growth_rate(series: &TimeSeries, periods: usize) -> Result<TimeSeries> {
    let change = pct_change(series, periods)?;
    Ok(change.map(format!("{}_growth", series.name()), |v| Some(v * 100.0)))
}

/// `num / den` on the union of both date axes.
pub fn ratio(num: &TimeSeries, den: &TimeSeries, name: impl Into<String>) -> TimeSeries {
    combine(num, den, name, |n, d| (d != 0.0).then(|| n / d))
}

/// `a - b` on the union of both date axes.
pub fn spread(a: &TimeSeries, b: &TimeSeries, name: impl Into<String>) -> TimeSeries {
    combine(a, b, name, |a, b| Some(a - b))
}

fn combine(
    a: &TimeSeries,
    b: &TimeSeries,
    name: impl Into<String>,
    f: impl Fn(f64, f64) -> Option<f64>,
) -> TimeSeries {
    let frame = align(vec![a.clone(), b.clone()]);
    let (left, right) = (&frame.columns[0], &frame.columns[1]);
    let points = left
        .iter()
        .zip(right.iter())
        .map(|(l, r)| Observation {
            date: l.date,
            value: match (l.finite(), r.finite()) {
                (Some(x), Some(y)) => f(x, y).filter(|v| v.is_finite()),
                _ => None,
            },
        })
        .collect();
    Series::from_ordered(name, points)
}
