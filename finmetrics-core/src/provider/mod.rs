//! Data provider traits and structured error types.
//!
//! The market-data vendor (OHLCV per ticker) and the economic-data vendor
//! (one named series per code) are external collaborators. The metric
//! pipelines only see these traits, so any source can be plugged in and
//! tests run without network access.

pub mod csv_file;
pub mod memory;

pub use csv_file::CsvProvider;
pub use memory::MemoryProvider;

use crate::error::MetricError;
use crate::resample::{to_weekly_bars, DEFAULT_WEEK_END};
use crate::series::TimeSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One OHLCV row. Missing prices are NaN, as delivered by the vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Sampling interval requested from a market-data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Daily => "1d",
            Self::Weekly => "1wk",
            Self::Monthly => "1mo",
        })
    }
}

/// Inclusive date range; an open end is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    /// Same end, different start (used to pull calibration history).
    pub fn starting(&self, start: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: self.end,
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |d: Option<NaiveDate>, open: &str| {
            d.map_or_else(|| open.to_string(), |d| d.to_string())
        };
        write!(f, "{} to {}", show(self.start, "earliest"), show(self.end, "latest"))
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown {kind} '{name}' (available: {})", .available.join(", "))]
    UnknownName {
        kind: String,
        name: String,
        available: Vec<String>,
    },

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no data for '{symbol}' in {range}")]
    NoData { symbol: String, range: DateRange },

    #[error("provider {provider} does not serve {interval} data")]
    UnsupportedInterval {
        provider: String,
        interval: Interval,
    },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("parse error in {path} at row {row}: {message}")]
    Parse {
        path: String,
        row: usize,
        message: String,
    },

    #[error(transparent)]
    Metric(#[from] MetricError),
}

/// Market-data vendor: OHLCV rows for a ticker.
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Bars for `symbol` within `range`, ascending by date.
    fn fetch_bars(
        &self,
        symbol: &str,
        range: DateRange,
        interval: Interval,
    ) -> Result<Vec<Bar>, ProviderError>;
}

/// Economic-data vendor: one numeric series per series code, at its native
/// reporting frequency.
pub trait EconomicDataProvider: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_series(&self, series_id: &str, range: DateRange) -> Result<TimeSeries, ProviderError>;
}

impl<T: MarketDataProvider + ?Sized> MarketDataProvider for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        range: DateRange,
        interval: Interval,
    ) -> Result<Vec<Bar>, ProviderError> {
        (**self).fetch_bars(symbol, range, interval)
    }
}

impl<T: MarketDataProvider + ?Sized> MarketDataProvider for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        range: DateRange,
        interval: Interval,
    ) -> Result<Vec<Bar>, ProviderError> {
        (**self).fetch_bars(symbol, range, interval)
    }
}

impl<T: EconomicDataProvider + ?Sized> EconomicDataProvider for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_series(&self, series_id: &str, range: DateRange) -> Result<TimeSeries, ProviderError> {
        (**self).fetch_series(series_id, range)
    }
}

impl<T: EconomicDataProvider + ?Sized> EconomicDataProvider for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_series(&self, series_id: &str, range: DateRange) -> Result<TimeSeries, ProviderError> {
        (**self).fetch_series(series_id, range)
    }
}

/// Daily bars rolled up into one bar per week ending on `DEFAULT_WEEK_END`,
/// dated at the week's end. Weeks without bars are skipped.
pub(crate) fn weekly_bars(bars: &[Bar]) -> Result<Vec<Bar>, MetricError> {
    Ok(to_weekly_bars(bars, DEFAULT_WEEK_END)?
        .into_iter()
        .filter(|w| w.bar_count > 0)
        .map(|w| Bar {
            date: w.week_ending,
            open: w.open.unwrap_or(f64::NAN),
            high: w.high.unwrap_or(f64::NAN),
            low: w.low.unwrap_or(f64::NAN),
            close: w.close.unwrap_or(f64::NAN),
            volume: w.volume,
        })
        .collect())
}

/// Close prices of `bars` as a named series.
pub fn closes(bars: &[Bar], name: impl Into<String>) -> Result<TimeSeries, MetricError> {
    TimeSeries::from_values(name, bars.iter().map(|b| (b.date, b.close)))
}
