//! Equity indices and commodity futures by friendly name.

use super::{fetch_closes, frame_of};
use crate::catalog::SeriesCatalog;
use crate::growth::{pct_change, spread};
use crate::provider::{Bar, DateRange, Interval, MarketDataProvider, ProviderError};
use crate::series::{SeriesFrame, TimeSeries};
use chrono::NaiveDate;
use serde::Serialize;

pub struct MarketIndices<P> {
    provider: P,
    catalog: SeriesCatalog,
}

impl<P: MarketDataProvider> MarketIndices<P> {
    pub fn new(provider: P, catalog: SeriesCatalog) -> Self {
        Self { provider, catalog }
    }

    pub fn with_default_catalog(provider: P) -> Self {
        Self::new(provider, SeriesCatalog::market_indices())
    }

    pub fn index(
        &self,
        name: &str,
        range: DateRange,
        interval: Interval,
    ) -> Result<Vec<Bar>, ProviderError> {
        let ticker = self.catalog.resolve(name)?;
        self.provider.fetch_bars(ticker, range, interval)
    }

    /// Daily closes, named after the index.
    pub fn closes(&self, name: &str, range: DateRange) -> Result<TimeSeries, ProviderError> {
        let ticker = self.catalog.resolve(name)?;
        fetch_closes(&self.provider, ticker, name, range)
    }

    /// Simple returns over `period` trading days.
    pub fn returns(
        &self,
        name: &str,
        range: DateRange,
        period: usize,
    ) -> Result<TimeSeries, ProviderError> {
        let close = self.closes(name, range)?;
        Ok(pct_change(&close, period)?.with_name("returns"))
    }

    /// Resolve every name before fetching anything.
    pub fn multiple(&self, names: &[&str], range: DateRange) -> Result<SeriesFrame, ProviderError> {
        for name in names {
            self.catalog.resolve(name)?;
        }
        let series = names
            .iter()
            .map(|name| self.closes(name, range))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(frame_of(series))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadRecord {
    pub date: NaiveDate,
    pub wti: Option<f64>,
    pub brent: Option<f64>,
    /// Brent minus WTI.
    pub spread: Option<f64>,
}

pub struct CommodityPrices<P> {
    provider: P,
    catalog: SeriesCatalog,
}

impl<P: MarketDataProvider> CommodityPrices<P> {
    pub fn new(provider: P, catalog: SeriesCatalog) -> Self {
        Self { provider, catalog }
    }

    pub fn with_default_catalog(provider: P) -> Self {
        Self::new(provider, SeriesCatalog::commodities())
    }

    pub fn commodity(
        &self,
        name: &str,
        range: DateRange,
        interval: Interval,
    ) -> Result<Vec<Bar>, ProviderError> {
        let ticker = self.catalog.resolve(name)?;
        self.provider.fetch_bars(ticker, range, interval)
    }

    pub fn closes(&self, name: &str, range: DateRange) -> Result<TimeSeries, ProviderError> {
        let ticker = self.catalog.resolve(name)?;
        fetch_closes(&self.provider, ticker, name, range)
    }

    /// Brent-WTI spread on the union of both trading calendars.
    pub fn oil_spread(&self, range: DateRange) -> Result<Vec<SpreadRecord>, ProviderError> {
        let wti = self.closes("crude_oil_wti", range)?;
        let brent = self.closes("crude_oil_brent", range)?;
        let diff = spread(&brent, &wti, "spread");

        Ok(diff
            .iter()
            .map(|o| SpreadRecord {
                date: o.date,
                wti: wti.get(o.date).copied(),
                brent: brent.get(o.date).copied(),
                spread: o.finite(),
            })
            .collect())
    }

    /// Resolve every name before fetching anything.
    pub fn multiple(&self, names: &[&str], range: DateRange) -> Result<SeriesFrame, ProviderError> {
        for name in names {
            self.catalog.resolve(name)?;
        }
        let series = names
            .iter()
            .map(|name| self.closes(name, range))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(frame_of(series))
    }
}
