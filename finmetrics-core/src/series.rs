//! Date-indexed series, the only shape the transform layer consumes.
//!
//! Dates are strictly increasing with no duplicates. A missing observation is
//! `None`; transforms carry it through instead of failing.

use crate::error::{MetricError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One dated observation. `value == None` marks missing data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation<T> {
    pub date: NaiveDate,
    pub value: Option<T>,
}

impl<T> Observation<T> {
    pub fn present(date: NaiveDate, value: T) -> Self {
        Self {
            date,
            value: Some(value),
        }
    }

    pub fn missing(date: NaiveDate) -> Self {
        Self { date, value: None }
    }
}

impl Observation<f64> {
    /// The value if present and finite. NaN and infinities count as missing.
    pub fn finite(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }
}

/// An ordered, named sequence of observations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series<T> {
    name: String,
    points: Vec<Observation<T>>,
}

/// Numeric series.
pub type TimeSeries = Series<f64>;

/// Categorical signal series.
pub type SignalSeries = Series<crate::signal::SignalLabel>;

impl<T> Series<T> {
    /// Build a series, rejecting non-increasing or duplicate dates.
    pub fn new(name: impl Into<String>, points: Vec<Observation<T>>) -> Result<Self> {
        let name = name.into();
        if let Some(index) = points
            .windows(2)
            .position(|pair| pair[0].date >= pair[1].date)
        {
            return Err(MetricError::UnorderedSeries {
                name,
                index: index + 1,
            });
        }
        Ok(Self { name, points })
    }

    /// Build from points already known to be ordered (output of another transform).
    pub(crate) fn from_ordered(name: impl Into<String>, points: Vec<Observation<T>>) -> Self {
        debug_assert!(points.windows(2).all(|p| p[0].date < p[1].date));
        Self {
            name: name.into(),
            points,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Observation<T>] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Observation<T>> {
        self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation<T>> {
        self.points.iter()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Value on an exact date. `None` both for missing values and absent dates.
    pub fn get(&self, date: NaiveDate) -> Option<&T> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .and_then(|i| self.points[i].value.as_ref())
    }

    /// Map every present value; missing stays missing. `f` may also return `None`.
    pub fn map<U>(&self, name: impl Into<String>, mut f: impl FnMut(&T) -> Option<U>) -> Series<U> {
        let points = self
            .points
            .iter()
            .map(|p| Observation {
                date: p.date,
                value: p.value.as_ref().and_then(&mut f),
            })
            .collect();
        Series::from_ordered(name, points)
    }
}

impl<T: Clone> Series<T> {
    /// Observations with `start <= date <= end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let points = self
            .points
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .cloned()
            .collect();
        Self::from_ordered(self.name.clone(), points)
    }

    /// Reindex onto `dates` (ascending). Dates this series lacks become missing.
    pub fn reindex(&self, dates: &[NaiveDate]) -> Self {
        let points = dates
            .iter()
            .map(|&date| Observation {
                date,
                value: self.get(date).cloned(),
            })
            .collect();
        Self::from_ordered(self.name.clone(), points)
    }
}

impl TimeSeries {
    /// Build from `(date, value)` pairs; non-finite values become missing.
    pub fn from_values(
        name: impl Into<String>,
        values: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Result<Self> {
        Self::from_options(name, values.into_iter().map(|(d, v)| (d, Some(v))))
    }

    /// Build from `(date, Option<value>)` pairs; non-finite values become missing.
    pub fn from_options(
        name: impl Into<String>,
        values: impl IntoIterator<Item = (NaiveDate, Option<f64>)>,
    ) -> Result<Self> {
        let points = values
            .into_iter()
            .map(|(date, value)| Observation {
                date,
                value: value.filter(|v| v.is_finite()),
            })
            .collect();
        Self::new(name, points)
    }

    /// Present, finite values in date order.
    pub fn present_values(&self) -> Vec<f64> {
        self.points.iter().filter_map(Observation::finite).collect()
    }

    /// Raw value slots in date order.
    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(Observation::finite).collect()
    }

    /// The most recent present observation.
    pub fn last_present(&self) -> Option<(NaiveDate, f64)> {
        self.points
            .iter()
            .rev()
            .find_map(|p| p.finite().map(|v| (p.date, v)))
    }
}

/// Several numeric series on one common, ascending date axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesFrame {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<TimeSeries>,
}

impl SeriesFrame {
    pub fn column(&self, name: &str) -> Option<&TimeSeries> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }
}

/// Align series on the union of their dates. Dates absent from a series are
/// missing in that column; nothing is forward-filled.
pub fn align(columns: Vec<TimeSeries>) -> SeriesFrame {
    let all_dates: BTreeSet<NaiveDate> = columns.iter().flat_map(|c| c.dates()).collect();
    let dates: Vec<NaiveDate> = all_dates.into_iter().collect();
    let columns = columns.iter().map(|c| c.reindex(&dates)).collect();
    SeriesFrame { dates, columns }
}

/// Consecutive calendar days starting at `start`. Handy for fixtures.
pub fn daily_dates(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    start.iter_days().take(count).collect()
}

#[cfg(test)]
pub(crate) fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_dates() {
        let d = ymd(2024, 1, 2);
        let err = TimeSeries::from_values("x", [(d, 1.0), (d, 2.0)]).unwrap_err();
        assert_eq!(
            err,
            MetricError::UnorderedSeries {
                name: "x".into(),
                index: 1
            }
        );
    }

    #[test]
    fn rejects_descending_dates() {
        let err =
            TimeSeries::from_values("x", [(ymd(2024, 1, 3), 1.0), (ymd(2024, 1, 2), 2.0)]);
        assert!(err.is_err());
    }

    #[test]
    fn non_finite_becomes_missing() {
        let s = TimeSeries::from_values(
            "x",
            [(ymd(2024, 1, 1), f64::NAN), (ymd(2024, 1, 2), f64::INFINITY), (ymd(2024, 1, 3), 3.0)],
        )
        .unwrap();
        assert_eq!(s.values(), vec![None, None, Some(3.0)]);
        assert_eq!(s.present_values(), vec![3.0]);
    }

    #[test]
    fn get_by_date() {
        let s = TimeSeries::from_values("x", [(ymd(2024, 1, 1), 1.0), (ymd(2024, 1, 5), 5.0)])
            .unwrap();
        assert_eq!(s.get(ymd(2024, 1, 5)), Some(&5.0));
        assert_eq!(s.get(ymd(2024, 1, 3)), None);
    }

    #[test]
    fn last_present_skips_trailing_missing() {
        let s = TimeSeries::from_options(
            "x",
            [(ymd(2024, 1, 1), Some(1.0)), (ymd(2024, 1, 2), Some(2.0)), (ymd(2024, 1, 3), None)],
        )
        .unwrap();
        assert_eq!(s.last_present(), Some((ymd(2024, 1, 2), 2.0)));
    }

    #[test]
    fn align_fills_missing_without_ffill() {
        let a = TimeSeries::from_values(
            "a",
            [(ymd(2024, 1, 1), 1.0), (ymd(2024, 1, 2), 2.0), (ymd(2024, 1, 3), 3.0)],
        )
        .unwrap();
        let b = TimeSeries::from_values("b", [(ymd(2024, 1, 1), 10.0), (ymd(2024, 1, 3), 30.0)])
            .unwrap();

        let frame = align(vec![a, b]);
        assert_eq!(frame.dates.len(), 3);
        let b = frame.column("b").unwrap();
        assert_eq!(b.values(), vec![Some(10.0), None, Some(30.0)]);
        assert_eq!(frame.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn between_is_inclusive() {
        let dates = daily_dates(ymd(2024, 1, 1), 10);
        let s = TimeSeries::from_values("x", dates.iter().map(|&d| (d, 1.0))).unwrap();
        let sub = s.between(ymd(2024, 1, 3), ymd(2024, 1, 5));
        assert_eq!(sub.len(), 3);
        assert_eq!(sub.first_date(), Some(ymd(2024, 1, 3)));
    }
}
