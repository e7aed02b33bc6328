//! TOML configuration for the metric pipelines.
//!
//! Every section is optional. Missing fields take the defaults: 200-day
//! window, 2015-01-01 calibration start, 1st/99th percentile bounds and
//! Sunday week-ending. Call
//! [`MetricsConfig::validate`] once at startup and treat failure as fatal.

use crate::catalog::SeriesCatalog;
use crate::error::MetricError;
use crate::normalize::NormalizeOptions;
use crate::resample::DEFAULT_WEEK_END;
use crate::signal::SignalBand;
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_WINDOW: usize = 200;

pub fn default_calibration_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] MetricError),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub custom: CustomMetricsConfig,
    pub vix: VixConfig,
    pub resample: ResampleConfig,
    pub catalogs: CatalogOverrides,
}

/// 200-day deviation oscillator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomMetricsConfig {
    pub ticker: String,
    pub window: usize,
    pub calibration_start: NaiveDate,
    pub signal_band: SignalBand,
    pub normalized_band: SignalBand,
    pub normalize: NormalizeOptions,
}

impl Default for CustomMetricsConfig {
    fn default() -> Self {
        Self {
            ticker: "QQQ".to_string(),
            window: DEFAULT_WINDOW,
            calibration_start: default_calibration_start(),
            signal_band: SignalBand::deviation(),
            normalized_band: SignalBand::normalized(),
            normalize: NormalizeOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VixConfig {
    pub ticker: String,
    pub calibration_start: NaiveDate,
    pub level_band: SignalBand,
    pub normalized_band: SignalBand,
    pub normalize: NormalizeOptions,
}

impl Default for VixConfig {
    fn default() -> Self {
        Self {
            ticker: "^VIX".to_string(),
            calibration_start: default_calibration_start(),
            level_band: SignalBand::vix_level(),
            normalized_band: SignalBand::vix_normalized(),
            normalize: NormalizeOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    pub week_end: Weekday,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            week_end: DEFAULT_WEEK_END,
        }
    }
}

/// Per-environment additions to the built-in name tables.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogOverrides {
    pub macro_indicators: BTreeMap<String, String>,
    pub consumer_metrics: BTreeMap<String, String>,
    pub market_indices: BTreeMap<String, String>,
    pub commodities: BTreeMap<String, String>,
}

impl MetricsConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Checks that deserialization alone can't enforce. Bands are already
    /// validated when parsed.
    pub fn validate(&self) -> Result<(), MetricError> {
        if self.custom.window == 0 {
            return Err(MetricError::InvalidWindow { window: 0 });
        }
        self.custom.normalize.bounds.validate()?;
        self.vix.normalize.bounds.validate()?;
        Ok(())
    }

    pub fn macro_catalog(&self) -> SeriesCatalog {
        SeriesCatalog::macro_indicators().with_overrides(&self.catalogs.macro_indicators)
    }

    pub fn consumer_catalog(&self) -> SeriesCatalog {
        SeriesCatalog::consumer_metrics().with_overrides(&self.catalogs.consumer_metrics)
    }

    pub fn index_catalog(&self) -> SeriesCatalog {
        SeriesCatalog::market_indices().with_overrides(&self.catalogs.market_indices)
    }

    pub fn commodity_catalog(&self) -> SeriesCatalog {
        SeriesCatalog::commodities().with_overrides(&self.catalogs.commodities)
    }
}
