//! Week-ending resampling.
//!
//! Observations are grouped into buckets keyed by the first `anchor` weekday
//! on or after their date (Sunday by default), then reduced per bucket.
//! Every week between the first and last observation gets a bucket; a week
//! with nothing present in it produces a missing value.

use crate::error::{MetricError, Result};
use crate::provider::Bar;
use crate::series::{align, Observation, Series, SeriesFrame, TimeSeries};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::trace;

pub const DEFAULT_WEEK_END: Weekday = Weekday::Sun;

/// Per-bucket reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    First,
    /// Chronologically final present value.
    Last,
    Mean,
    Sum,
    Min,
    Max,
}

impl Aggregation {
    /// Reduce the present values of one bucket, in date order.
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let reduced = match self {
            Self::First => values[0],
            Self::Last => values[values.len() - 1],
            Self::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Self::Sum => values.iter().sum(),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        };
        Some(reduced)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Last => "last",
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            "mean" | "avg" => Ok(Self::Mean),
            "sum" => Ok(Self::Sum),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            other => Err(format!(
                "unknown aggregation '{other}' (expected first, last, mean, sum, min or max)"
            )),
        }
    }
}

/// The week-ending date for `date`: the next-or-same `anchor` weekday.
pub fn week_ending(date: NaiveDate, anchor: Weekday) -> NaiveDate {
    let ahead = (anchor.num_days_from_monday() as i64
        - date.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    date + Duration::days(ahead)
}

/// A series resampled to one point per week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyAggregate {
    pub anchor: Weekday,
    pub aggregation: Aggregation,
    pub series: TimeSeries,
}

impl WeeklyAggregate {
    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    pub fn into_series(self) -> TimeSeries {
        self.series
    }
}

/// Resample to Sunday-ending weeks.
pub fn to_weekly(series: &TimeSeries, aggregation: Aggregation) -> WeeklyAggregate {
    to_weekly_anchored(series, aggregation, DEFAULT_WEEK_END)
}

pub fn to_weekly_anchored(
    series: &TimeSeries,
    aggregation: Aggregation,
    anchor: Weekday,
) -> WeeklyAggregate {
    let points: Vec<Observation<f64>> = week_buckets(series.points(), anchor, |o| o.finite())
        .into_iter()
        .map(|(week, values)| Observation {
            date: week,
            value: aggregation.apply(&values),
        })
        .collect();
    trace!(
        series = series.name(),
        weeks = points.len(),
        aggregation = aggregation.as_str(),
        "weekly resample"
    );
    WeeklyAggregate {
        anchor,
        aggregation,
        series: Series::from_ordered(series.name(), points),
    }
}

/// Contiguous weekly buckets from the earliest to the latest item's week.
fn week_buckets<I, V>(
    items: &[I],
    anchor: Weekday,
    date_value: impl Fn(&I) -> Option<V>,
) -> Vec<(NaiveDate, Vec<V>)>
where
    I: Dated,
{
    let keys = items.iter().map(|item| week_ending(item.date(), anchor));
    let (first, last) = match (keys.clone().min(), keys.max()) {
        (Some(f), Some(l)) => (f, l),
        _ => return Vec::new(),
    };

    let mut buckets = Vec::new();
    let mut week = first;
    while week <= last {
        buckets.push((week, Vec::new()));
        week += Duration::days(7);
    }

    for item in items {
        let key = week_ending(item.date(), anchor);
        let index = ((key - first).num_days() / 7) as usize;
        if let (Some(v), Some(bucket)) = (date_value(item), buckets.get_mut(index)) {
            bucket.1.push(v);
        }
    }
    buckets
}

trait Dated {
    fn date(&self) -> NaiveDate;
}

impl<T> Dated for Observation<T> {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for Bar {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Per-field aggregation rules for resampling several series together.
///
/// Different fields need different reductions (a level takes `Last`, a score
/// takes `Mean`), so every field must be named explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyPlan {
    anchor: Weekday,
    rules: Vec<(String, Aggregation)>,
}

impl Default for WeeklyPlan {
    fn default() -> Self {
        Self::new(DEFAULT_WEEK_END)
    }
}

impl WeeklyPlan {
    pub fn new(anchor: Weekday) -> Self {
        Self {
            anchor,
            rules: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, aggregation: Aggregation) -> Self {
        self.rules.push((name.into(), aggregation));
        self
    }

    pub fn rule(&self, name: &str) -> Option<Aggregation> {
        self.rules
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, agg)| *agg)
    }

    /// Resample each column by its rule and align them on one weekly axis.
    pub fn apply(&self, columns: &[TimeSeries]) -> Result<SeriesFrame> {
        let weekly = columns
            .iter()
            .map(|col| {
                let agg = self
                    .rule(col.name())
                    .ok_or_else(|| MetricError::MissingAggregation {
                        field: col.name().to_string(),
                    })?;
                Ok(to_weekly_anchored(col, agg, self.anchor).into_series())
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(align(weekly))
    }
}

/// One week of OHLCV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyBar {
    pub week_ending: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: u64,
    pub bar_count: usize,
}

/// Weekly OHLCV: open first, high max, low min, close last, volume sum.
/// Bars must be strictly ascending by date.
pub fn to_weekly_bars(bars: &[Bar], anchor: Weekday) -> Result<Vec<WeeklyBar>> {
    ensure_ascending(bars, "bars")?;
    let weekly = week_buckets(bars, anchor, |b| Some(b.clone()))
        .into_iter()
        .map(|(week_ending, bucket)| {
            let field = |f: fn(&Bar) -> f64| -> Vec<f64> {
                bucket.iter().map(f).filter(|v| v.is_finite()).collect()
            };
            WeeklyBar {
                week_ending,
                open: Aggregation::First.apply(&field(|b| b.open)),
                high: Aggregation::Max.apply(&field(|b| b.high)),
                low: Aggregation::Min.apply(&field(|b| b.low)),
                close: Aggregation::Last.apply(&field(|b| b.close)),
                volume: bucket.iter().map(|b| b.volume).sum(),
                bar_count: bucket.len(),
            }
        })
        .collect();
    Ok(weekly)
}

/// `UnorderedSeries` at the first bar not strictly after its predecessor.
pub(crate) fn ensure_ascending(bars: &[Bar], name: &str) -> Result<()> {
    match bars.windows(2).position(|w| w[0].date >= w[1].date) {
        Some(i) => Err(MetricError::UnorderedSeries {
            name: name.to_string(),
            index: i + 1,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::ymd;

    fn series(points: &[(NaiveDate, Option<f64>)]) -> TimeSeries {
        TimeSeries::from_options("x", points.iter().copied()).unwrap()
    }

    #[test]
    fn week_ending_is_next_or_same_sunday() {
        // 2024-01-01 is a Monday
        assert_eq!(week_ending(ymd(2024, 1, 1), Weekday::Sun), ymd(2024, 1, 7));
        assert_eq!(week_ending(ymd(2024, 1, 7), Weekday::Sun), ymd(2024, 1, 7));
        assert_eq!(week_ending(ymd(2024, 1, 8), Weekday::Sun), ymd(2024, 1, 14));
        assert_eq!(week_ending(ymd(2024, 1, 3), Weekday::Fri), ymd(2024, 1, 5));
        assert_eq!(week_ending(ymd(2024, 1, 6), Weekday::Fri), ymd(2024, 1, 12));
    }

    #[test]
    fn mean_within_one_week() {
        let s = series(&[
            (ymd(2024, 1, 1), Some(1.0)),
            (ymd(2024, 1, 2), Some(2.0)),
            (ymd(2024, 1, 3), Some(3.0)),
        ]);
        let w = to_weekly(&s, Aggregation::Mean);
        assert_eq!(w.series.len(), 1);
        assert_eq!(w.series.points()[0].date, ymd(2024, 1, 7));
        assert_eq!(w.series.values(), vec![Some(2.0)]);
    }

    #[test]
    fn empty_week_is_missing() {
        let s = series(&[(ymd(2024, 1, 2), Some(1.0)), (ymd(2024, 1, 16), Some(5.0))]);
        let w = to_weekly(&s, Aggregation::Sum).into_series();
        assert_eq!(
            w.dates().collect::<Vec<_>>(),
            vec![ymd(2024, 1, 7), ymd(2024, 1, 14), ymd(2024, 1, 21)]
        );
        assert_eq!(w.values(), vec![Some(1.0), None, Some(5.0)]);
    }

    #[test]
    fn last_skips_trailing_missing() {
        let s = series(&[
            (ymd(2024, 1, 1), Some(1.0)),
            (ymd(2024, 1, 2), Some(2.0)),
            (ymd(2024, 1, 3), None),
        ]);
        assert_eq!(to_weekly(&s, Aggregation::Last).series.values(), vec![Some(2.0)]);
    }

    #[test]
    fn mean_ignores_missing() {
        let s = series(&[
            (ymd(2024, 1, 1), Some(1.0)),
            (ymd(2024, 1, 2), None),
            (ymd(2024, 1, 3), Some(5.0)),
        ]);
        assert_eq!(to_weekly(&s, Aggregation::Mean).series.values(), vec![Some(3.0)]);
    }

    #[test]
    fn all_missing_week_is_missing() {
        let s = series(&[(ymd(2024, 1, 1), None), (ymd(2024, 1, 2), None)]);
        assert_eq!(to_weekly(&s, Aggregation::Mean).series.values(), vec![None]);
    }

    #[test]
    fn weekly_last_is_idempotent() {
        let s = series(&[
            (ymd(2024, 1, 1), Some(1.0)),
            (ymd(2024, 1, 5), Some(2.0)),
            (ymd(2024, 1, 9), Some(3.0)),
            (ymd(2024, 1, 24), Some(4.0)),
        ]);
        let once = to_weekly(&s, Aggregation::Last).into_series();
        let twice = to_weekly(&once, Aggregation::Last).into_series();
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_series_has_no_weeks() {
        let w = to_weekly(&TimeSeries::empty("x"), Aggregation::Last);
        assert!(w.series.is_empty());
    }

    #[test]
    fn aggregation_parses() {
        assert_eq!("Mean".parse::<Aggregation>(), Ok(Aggregation::Mean));
        assert!("median".parse::<Aggregation>().is_err());
    }

    #[test]
    fn plan_requires_a_rule_per_field() {
        let a = series(&[(ymd(2024, 1, 1), Some(1.0))]);
        let plan = WeeklyPlan::default();
        assert_eq!(
            plan.apply(&[a]).unwrap_err(),
            MetricError::MissingAggregation { field: "x".into() }
        );
    }

    #[test]
    fn plan_applies_rules_per_field() {
        let level = TimeSeries::from_values(
            "level",
            [(ymd(2024, 1, 1), 10.0), (ymd(2024, 1, 2), 12.0)],
        )
        .unwrap();
        let score = TimeSeries::from_values(
            "score",
            [(ymd(2024, 1, 1), 1.0), (ymd(2024, 1, 2), 2.0)],
        )
        .unwrap();
        let frame = WeeklyPlan::default()
            .field("level", Aggregation::Last)
            .field("score", Aggregation::Mean)
            .apply(&[level, score])
            .unwrap();
        assert_eq!(frame.dates, vec![ymd(2024, 1, 7)]);
        assert_eq!(frame.column("level").unwrap().values(), vec![Some(12.0)]);
        assert_eq!(frame.column("score").unwrap().values(), vec![Some(1.5)]);
    }

    #[test]
    fn weekly_bars_ohlcv() {
        let bar = |d: NaiveDate, o: f64, h: f64, l: f64, c: f64, v: u64| Bar {
            date: d,
            open: o,
            high: h,
            low: l,
            close: c,
            volume: v,
        };
        let bars = vec![
            bar(ymd(2024, 1, 2), 10.0, 12.0, 9.0, 11.0, 100),
            bar(ymd(2024, 1, 3), 11.0, 15.0, 10.0, 14.0, 200),
            bar(ymd(2024, 1, 5), 14.0, 14.5, 8.0, 13.0, 300),
            bar(ymd(2024, 1, 8), 13.0, 13.5, 12.0, 13.2, 50),
        ];
        let weekly = to_weekly_bars(&bars, Weekday::Sun).unwrap();
        assert_eq!(weekly.len(), 2);
        let w = &weekly[0];
        assert_eq!(w.week_ending, ymd(2024, 1, 7));
        assert_eq!(w.open, Some(10.0));
        assert_eq!(w.high, Some(15.0));
        assert_eq!(w.low, Some(8.0));
        assert_eq!(w.close, Some(13.0));
        assert_eq!(w.volume, 600);
        assert_eq!(w.bar_count, 3);
        assert_eq!(weekly[1].close, Some(13.2));
    }

    fn close_bar(date: NaiveDate, close: f64) -> Bar {
        Bar {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1,
        }
    }

    #[test]
    fn weekly_bars_reject_descending_input() {
        let bars = vec![close_bar(ymd(2024, 1, 15), 2.0), close_bar(ymd(2024, 1, 2), 1.0)];
        assert_eq!(
            to_weekly_bars(&bars, Weekday::Sun).unwrap_err(),
            MetricError::UnorderedSeries {
                name: "bars".to_string(),
                index: 1
            }
        );
    }

    #[test]
    fn weekly_bars_reject_duplicate_dates() {
        let bars = vec![
            close_bar(ymd(2024, 1, 2), 1.0),
            close_bar(ymd(2024, 1, 3), 2.0),
            close_bar(ymd(2024, 1, 3), 3.0),
        ];
        assert!(matches!(
            to_weekly_bars(&bars, Weekday::Sun),
            Err(MetricError::UnorderedSeries { index: 2, .. })
        ));
    }

    #[test]
    fn weekly_bars_of_nothing_is_empty() {
        assert_eq!(to_weekly_bars(&[], Weekday::Sun).unwrap(), Vec::new());
    }

    #[test]
    fn buckets_span_earliest_to_latest_week() {
        let bars = vec![close_bar(ymd(2024, 1, 15), 2.0), close_bar(ymd(2024, 1, 2), 1.0)];
        let buckets = week_buckets(&bars, Weekday::Sun, |b| Some(b.close));
        assert_eq!(
            buckets,
            vec![
                (ymd(2024, 1, 7), vec![1.0]),
                (ymd(2024, 1, 14), vec![]),
                (ymd(2024, 1, 21), vec![2.0]),
            ]
        );
    }
}
