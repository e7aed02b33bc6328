//! In-memory provider over preloaded bars and series.

use super::{
    weekly_bars, Bar, DateRange, EconomicDataProvider, Interval, MarketDataProvider,
    ProviderError,
};
use crate::resample::ensure_ascending;
use crate::series::TimeSeries;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    bars: BTreeMap<String, Vec<Bar>>,
    series: BTreeMap<String, TimeSeries>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.bars.insert(symbol.into(), bars);
        self
    }

    /// Bars with only a close price, for fixtures.
    pub fn with_closes(self, symbol: impl Into<String>, closes: &TimeSeries) -> Self {
        let bars = closes
            .iter()
            .map(|o| {
                let close = o.finite().unwrap_or(f64::NAN);
                Bar {
                    date: o.date,
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: 0,
                }
            })
            .collect();
        self.with_bars(symbol, bars)
    }

    pub fn with_series(mut self, series_id: impl Into<String>, series: TimeSeries) -> Self {
        self.series.insert(series_id.into(), series);
        self
    }
}

impl MarketDataProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        range: DateRange,
        interval: Interval,
    ) -> Result<Vec<Bar>, ProviderError> {
        if interval == Interval::Monthly {
            return Err(ProviderError::UnsupportedInterval {
                provider: "memory".to_string(),
                interval,
            });
        }
        let bars = self
            .bars
            .get(symbol)
            .ok_or_else(|| ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;
        // fixtures are unchecked until served
        ensure_ascending(bars, symbol)?;
        let selected: Vec<Bar> = bars.iter().filter(|b| range.contains(b.date)).cloned().collect();
        if selected.is_empty() {
            return Err(ProviderError::NoData {
                symbol: symbol.to_string(),
                range,
            });
        }
        match interval {
            Interval::Weekly => Ok(weekly_bars(&selected)?),
            _ => Ok(selected),
        }
    }
}

impl EconomicDataProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch_series(&self, series_id: &str, range: DateRange) -> Result<TimeSeries, ProviderError> {
        let series = self
            .series
            .get(series_id)
            .ok_or_else(|| ProviderError::SymbolNotFound {
                symbol: series_id.to_string(),
            })?;
        let points = series
            .iter()
            .filter(|o| range.contains(o.date))
            .cloned()
            .collect();
        Ok(TimeSeries::new(series_id, points)?)
    }
}
