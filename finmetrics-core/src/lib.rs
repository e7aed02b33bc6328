//! finmetrics core: light, pure transforms over date-indexed series.
//!
//! This crate contains the metric utility layer of a weekly demand-forecasting
//! pipeline:
//! - Date-ordered series with explicit missing values
//! - Percentile normalization against a calibration window
//! - Five-zone signal classification with configurable threshold ties
//! - Deviation from a trailing moving average
//! - Week-ending resampling with per-field aggregation
//! - Growth, ratio and spread formulas, summary statistics
//! - Put/call volume ratio from a local options file
//! - Provider traits and the metric pipelines built on them
//!
//! Nothing here performs network I/O. Data arrives through
//! [`provider::MarketDataProvider`] and [`provider::EconomicDataProvider`].

pub mod catalog;
pub mod config;
pub mod deviation;
pub mod error;
pub mod growth;
pub mod io;
pub mod metrics;
pub mod normalize;
pub mod options;
pub mod percentile;
pub mod provider;
pub mod resample;
pub mod series;
pub mod signal;
pub mod stats;

pub use error::{MetricError, Result};
pub use normalize::{normalize, normalize_with, BoundsMethod, NormalizeOptions};
pub use resample::{to_weekly, to_weekly_anchored, Aggregation, WeeklyAggregate};
pub use series::{Observation, Series, SignalSeries, TimeSeries};
pub use signal::{classify, BoundaryRule, SignalBand, SignalLabel};
