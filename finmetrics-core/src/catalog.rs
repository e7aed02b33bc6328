//! Friendly-name to vendor-code tables.
//!
//! Each metric pipeline is handed its own catalog at construction. The
//! built-in tables can be replaced or extended from configuration.

use crate::provider::ProviderError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesCatalog {
    kind: String,
    entries: BTreeMap<String, String>,
}

impl SeriesCatalog {
    pub fn new<'a>(kind: impl Into<String>, entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            kind: kind.into(),
            entries: entries
                .into_iter()
                .map(|(name, code)| (name.to_string(), code.to_string()))
                .collect(),
        }
    }

    /// Economic indicators (economic-data vendor codes).
    pub fn macro_indicators() -> Self {
        Self::new(
            "indicator",
            [
                ("gdp", "GDP"),
                ("gdp_growth", "A191RL1Q225SBEA"),
                ("cpi", "CPIAUCSL"),
                ("core_cpi", "CPILFESL"),
                ("ppi", "PPIACO"),
                ("unemployment", "UNRATE"),
                ("fed_funds", "FEDFUNDS"),
                ("treasury_10y", "DGS10"),
                ("housing_starts", "HOUST"),
                ("retail_sales", "RSXFS"),
            ],
        )
    }

    /// Consumer-side series (economic-data vendor codes).
    pub fn consumer_metrics() -> Self {
        Self::new(
            "consumer metric",
            [
                ("consumer_sentiment", "UMCSENT"),
                ("consumer_confidence", "CSCICP03USM665S"),
                ("retail_sales", "RSXFS"),
                ("retail_sales_total", "RSAFS"),
                ("pce", "PCE"),
                ("pce_real", "PCEC96"),
                ("disposable_income", "DPI"),
                ("real_disposable_income", "DSPIC96"),
                ("personal_saving_rate", "PSAVERT"),
                ("consumer_credit", "TOTALSL"),
            ],
        )
    }

    /// Equity indices (market-data vendor tickers).
    pub fn market_indices() -> Self {
        Self::new(
            "index",
            [
                ("sp500", "^GSPC"),
                ("dow", "^DJI"),
                ("nasdaq", "^IXIC"),
                ("russell2000", "^RUT"),
                ("vix", "^VIX"),
            ],
        )
    }

    /// Futures contracts (market-data vendor tickers).
    pub fn commodities() -> Self {
        Self::new(
            "commodity",
            [
                ("crude_oil_wti", "CL=F"),
                ("crude_oil_brent", "BZ=F"),
                ("natural_gas", "NG=F"),
                ("gold", "GC=F"),
                ("silver", "SI=F"),
                ("corn", "ZC=F"),
                ("wheat", "ZW=F"),
                ("soybeans", "ZS=F"),
            ],
        )
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Vendor code for `name`.
    pub fn resolve(&self, name: &str) -> Result<&str, ProviderError> {
        self.entries
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ProviderError::UnknownName {
                kind: self.kind.clone(),
                name: name.to_string(),
                available: self.names().map(str::to_string).collect(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy of this catalog with `overrides` added or replacing entries.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, String>) -> Self {
        let mut merged = self.clone();
        merged
            .entries
            .extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}
