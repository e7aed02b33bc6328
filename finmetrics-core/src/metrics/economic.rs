//! Economic-data series by friendly name.

use super::frame_of;
use crate::catalog::SeriesCatalog;
use crate::growth::growth_rate;
use crate::provider::{DateRange, EconomicDataProvider, ProviderError};
use crate::series::{SeriesFrame, TimeSeries};
use tracing::debug;

/// Year-over-year on monthly data.
const YOY_PERIODS: usize = 12;

struct CatalogSource<P> {
    provider: P,
    catalog: SeriesCatalog,
}

impl<P: EconomicDataProvider> CatalogSource<P> {
    fn series(&self, name: &str, range: DateRange) -> Result<TimeSeries, ProviderError> {
        let code = self.catalog.resolve(name)?;
        let series = self.provider.fetch_series(code, range)?;
        debug!(provider = self.provider.name(), name, code, rows = series.len(), "fetched series");
        Ok(series.with_name(name))
    }

    /// Resolve every name before fetching anything.
    fn multiple(&self, names: &[&str], range: DateRange) -> Result<SeriesFrame, ProviderError> {
        for name in names {
            self.catalog.resolve(name)?;
        }
        let series = names
            .iter()
            .map(|name| self.series(name, range))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(frame_of(series))
    }
}

pub struct MacroIndicators<P> {
    source: CatalogSource<P>,
}

impl<P: EconomicDataProvider> MacroIndicators<P> {
    pub fn new(provider: P, catalog: SeriesCatalog) -> Self {
        Self {
            source: CatalogSource { provider, catalog },
        }
    }

    pub fn with_default_catalog(provider: P) -> Self {
        Self::new(provider, SeriesCatalog::macro_indicators())
    }

    pub fn catalog(&self) -> &SeriesCatalog {
        &self.source.catalog
    }

    pub fn series(&self, name: &str, range: DateRange) -> Result<TimeSeries, ProviderError> {
        self.source.series(name, range)
    }

    /// Headline CPI, or core CPI (ex food and energy).
    pub fn cpi(&self, range: DateRange, core: bool) -> Result<TimeSeries, ProviderError> {
        self.series(if core { "core_cpi" } else { "cpi" }, range)
    }

    /// Year-over-year CPI change in percent.
    pub fn inflation_rate(&self, range: DateRange, core: bool) -> Result<TimeSeries, ProviderError> {
        let cpi = self.cpi(range, core)?;
        Ok(growth_rate(&cpi, YOY_PERIODS)?.with_name("inflation_rate"))
    }

    pub fn multiple(&self, names: &[&str], range: DateRange) -> Result<SeriesFrame, ProviderError> {
        self.source.multiple(names, range)
    }
}

pub struct ConsumerMetrics<P> {
    source: CatalogSource<P>,
}

impl<P: EconomicDataProvider> ConsumerMetrics<P> {
    pub fn new(provider: P, catalog: SeriesCatalog) -> Self {
        Self {
            source: CatalogSource { provider, catalog },
        }
    }

    pub fn with_default_catalog(provider: P) -> Self {
        Self::new(provider, SeriesCatalog::consumer_metrics())
    }

    pub fn catalog(&self) -> &SeriesCatalog {
        &self.source.catalog
    }

    pub fn series(&self, name: &str, range: DateRange) -> Result<TimeSeries, ProviderError> {
        self.source.series(name, range)
    }

    /// Retail sales, optionally including food services.
    pub fn retail_sales(&self, range: DateRange, include_food: bool) -> Result<TimeSeries, ProviderError> {
        self.series(
            if include_food { "retail_sales_total" } else { "retail_sales" },
            range,
        )
    }

    /// Year-over-year retail sales growth in percent.
    pub fn retail_sales_growth(
        &self,
        range: DateRange,
        include_food: bool,
    ) -> Result<TimeSeries, ProviderError> {
        let sales = self.retail_sales(range, include_food)?;
        Ok(growth_rate(&sales, YOY_PERIODS)?.with_name("retail_sales_growth"))
    }

    pub fn multiple(&self, names: &[&str], range: DateRange) -> Result<SeriesFrame, ProviderError> {
        self.source.multiple(names, range)
    }
}
