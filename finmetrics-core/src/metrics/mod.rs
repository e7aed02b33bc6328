//! Metric pipelines built on the provider traits.
//!
//! Each pipeline owns its provider and an immutable configuration table
//! (ticker, bands, name catalog) and returns typed records, one struct per
//! output shape.

pub mod custom;
pub mod economic;
pub mod market;
pub mod vix;

pub use custom::{CustomMetrics, DeviationRecord, NormalizedDeviationRecord, WeeklyDeviationRecord};
pub use economic::{ConsumerMetrics, MacroIndicators};
pub use market::{CommodityPrices, MarketIndices, SpreadRecord};
pub use vix::{
    CombinedSentimentRecord, CurrentVix, FearLevel, MarketComparisonRecord, NormalizedVixRecord,
    VixRecord, VixSentiment, WeeklyVixRecord,
};

use crate::provider::{closes, DateRange, Interval, MarketDataProvider, ProviderError};
use crate::series::{align, SeriesFrame, TimeSeries};
use tracing::{debug, warn};

/// Daily close series for `symbol`, named `name`.
pub(crate) fn fetch_closes<P: MarketDataProvider>(
    provider: &P,
    symbol: &str,
    name: &str,
    range: DateRange,
) -> Result<TimeSeries, ProviderError> {
    let bars = provider.fetch_bars(symbol, range, Interval::Daily)?;
    debug!(provider = provider.name(), symbol, bars = bars.len(), "fetched closes");
    Ok(closes(&bars, name)?)
}

/// Align fetched series into one frame, warning about any that came back empty.
pub(crate) fn frame_of(series: Vec<TimeSeries>) -> SeriesFrame {
    for s in series.iter().filter(|s| s.present_values().is_empty()) {
        warn!(series = s.name(), "no observations in range");
    }
    align(series)
}
