//! Volatility-index sentiment.
//!
//! The VIX level is laddered into five fear levels (12 / 15 / 20 / 30,
//! strictly-above comparisons). A higher VIX means more fear and a lower
//! sentiment score. The signal reads the same ladder contrarian-style: the
//! highest fear zone is `Strong Bullish`.

use super::fetch_closes;
use crate::config::VixConfig;
use crate::normalize::normalize_with;
use crate::growth::growth_rate;
use crate::percentile::percentile_rank;
use crate::provider::{DateRange, MarketDataProvider, ProviderError};
use crate::resample::{Aggregation, WeeklyPlan, DEFAULT_WEEK_END};
use crate::series::TimeSeries;
use crate::signal::{classify, label_or_missing, SignalBand, SignalLabel};
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FearLevel {
    #[serde(rename = "Extreme Complacency")]
    ExtremeComplacency,
    #[serde(rename = "Complacent")]
    Complacent,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Fear")]
    Fear,
    #[serde(rename = "Extreme Fear")]
    ExtremeFear,
}

impl FearLevel {
    const ALL: [FearLevel; 5] = [
        Self::ExtremeComplacency,
        Self::Complacent,
        Self::Neutral,
        Self::Fear,
        Self::ExtremeFear,
    ];

    /// Fear level of a VIX reading on `ladder`.
    pub fn from_vix(vix: f64, ladder: &SignalBand) -> Option<Self> {
        ladder.label(vix).map(|label| Self::ALL[label.zone()])
    }

    /// +2 for extreme complacency down to -2 for extreme fear.
    pub fn score(self) -> f64 {
        2.0 - self as usize as f64
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExtremeComplacency => "Extreme Complacency",
            Self::Complacent => "Complacent",
            Self::Neutral => "Neutral",
            Self::Fear => "Fear",
            Self::ExtremeFear => "Extreme Fear",
        }
    }

    pub fn interpretation(self) -> &'static str {
        match self {
            Self::ExtremeFear => {
                "Extreme fear: the market expects high volatility. Similar to a put/call ratio above 1.5."
            }
            Self::Fear => "Elevated fear: the market is concerned. Similar to a put/call ratio of 1.0-1.5.",
            Self::Neutral => "Normal volatility. Similar to a put/call ratio of 0.7-1.0.",
            Self::Complacent => "Low fear: the market is calm. Similar to a put/call ratio of 0.5-0.7.",
            Self::ExtremeComplacency => {
                "Extreme complacency: very low volatility expected. Similar to a put/call ratio below 0.5; often a contrarian warning."
            }
        }
    }
}

impl fmt::Display for FearLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VixRecord {
    pub date: NaiveDate,
    pub vix: Option<f64>,
    #[serde(serialize_with = "label_or_missing")]
    pub fear: Option<FearLevel>,
    pub score: Option<f64>,
    /// Rank of this reading among the requested range, 0–100, one decimal.
    pub percentile: Option<f64>,
    #[serde(serialize_with = "label_or_missing")]
    pub signal: Option<SignalLabel>,
}

/// VIX rescaled onto 0–100 against a calibration history. `signal` is
/// derived from `normalized`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedVixRecord {
    pub date: NaiveDate,
    pub vix: Option<f64>,
    pub normalized: Option<f64>,
    #[serde(serialize_with = "label_or_missing")]
    pub fear: Option<FearLevel>,
    #[serde(serialize_with = "label_or_missing")]
    pub signal: Option<SignalLabel>,
}

/// Weekly view: mean VIX, mean score, last percentile. Fear level and signal
/// are recomputed from the weekly mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyVixRecord {
    pub week_ending: NaiveDate,
    pub vix: Option<f64>,
    pub score: Option<f64>,
    pub percentile: Option<f64>,
    #[serde(serialize_with = "label_or_missing")]
    pub fear: Option<FearLevel>,
    #[serde(serialize_with = "label_or_missing")]
    pub signal: Option<SignalLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentVix {
    pub date: NaiveDate,
    pub vix: f64,
    pub fear: FearLevel,
    pub score: f64,
    pub interpretation: &'static str,
}

/// Daily VIX sentiment next to a market ticker on the VIX dates.
/// `market_return_pct` is the change from the previous VIX date, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketComparisonRecord {
    pub date: NaiveDate,
    pub vix: Option<f64>,
    #[serde(serialize_with = "label_or_missing")]
    pub fear: Option<FearLevel>,
    pub score: Option<f64>,
    #[serde(serialize_with = "label_or_missing")]
    pub signal: Option<SignalLabel>,
    pub market_close: Option<f64>,
    pub market_return_pct: Option<f64>,
}

/// VIX columns of the composite sentiment view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedSentimentRecord {
    pub date: NaiveDate,
    pub vix: Option<f64>,
    pub vix_score: Option<f64>,
    #[serde(serialize_with = "label_or_missing")]
    pub vix_signal: Option<SignalLabel>,
}

pub struct VixSentiment<P> {
    provider: P,
    config: VixConfig,
    week_end: Weekday,
}

impl<P: MarketDataProvider> VixSentiment<P> {
    pub fn new(provider: P, config: VixConfig) -> Self {
        Self {
            provider,
            config,
            week_end: DEFAULT_WEEK_END,
        }
    }

    pub fn with_week_end(mut self, week_end: Weekday) -> Self {
        self.week_end = week_end;
        self
    }

    fn levels(&self, range: DateRange) -> Result<TimeSeries, ProviderError> {
        fetch_closes(&self.provider, &self.config.ticker, "vix", range)
    }

    fn fear(&self, vix: f64) -> Option<FearLevel> {
        FearLevel::from_vix(vix, &self.config.level_band)
    }

    pub fn sentiment(&self, range: DateRange) -> Result<Vec<VixRecord>, ProviderError> {
        let vix = self.levels(range)?;
        let percentile = percentile_rank(&vix);
        let signal = classify(&vix, &self.config.level_band);

        Ok(vix
            .iter()
            .zip(percentile.iter())
            .zip(signal.iter())
            .map(|((v, p), sig)| {
                let fear = v.finite().and_then(|v| self.fear(v));
                VixRecord {
                    date: v.date,
                    vix: v.finite(),
                    fear,
                    score: fear.map(FearLevel::score),
                    percentile: p.finite().map(round_tenth),
                    signal: sig.value,
                }
            })
            .collect())
    }

    /// VIX normalized against the history from the configured calibration
    /// start to the end of `range`.
    pub fn sentiment_normalized(
        &self,
        range: DateRange,
    ) -> Result<Vec<NormalizedVixRecord>, ProviderError> {
        let calibration = self.levels(range.starting(self.config.calibration_start))?;
        let vix = self.levels(range)?;
        let normalized = normalize_with(&vix, &calibration, &self.config.normalize)?;
        let signal = classify(&normalized, &self.config.normalized_band);

        Ok(vix
            .iter()
            .zip(normalized.iter())
            .zip(signal.iter())
            .map(|((v, n), sig)| NormalizedVixRecord {
                date: v.date,
                vix: v.finite(),
                normalized: n.finite(),
                fear: v.finite().and_then(|v| self.fear(v)),
                signal: sig.value,
            })
            .collect())
    }

    pub fn sentiment_weekly(&self, range: DateRange) -> Result<Vec<WeeklyVixRecord>, ProviderError> {
        let daily = self.sentiment(range)?;
        let column = |name: &str, f: fn(&VixRecord) -> Option<f64>| {
            TimeSeries::from_options(name, daily.iter().map(|r| (r.date, f(r))))
        };
        let columns = [
            column("vix", |r| r.vix)?,
            column("score", |r| r.score)?,
            column("percentile", |r| r.percentile)?,
        ];
        let frame = WeeklyPlan::new(self.week_end)
            .field("vix", Aggregation::Mean)
            .field("score", Aggregation::Mean)
            .field("percentile", Aggregation::Last)
            .apply(&columns)?;

        // one column per plan field, in field order
        let (vix, score, percentile) = (&frame.columns[0], &frame.columns[1], &frame.columns[2]);
        let signal = classify(vix, &self.config.level_band);

        Ok(frame
            .dates
            .iter()
            .enumerate()
            .map(|(i, &week_ending)| {
                let mean_vix = vix.points()[i].finite();
                WeeklyVixRecord {
                    week_ending,
                    vix: mean_vix,
                    score: score.points()[i].finite(),
                    percentile: percentile.points()[i].finite(),
                    fear: mean_vix.and_then(|v| self.fear(v)),
                    signal: signal.points()[i].value,
                }
            })
            .collect())
    }

    /// Join daily sentiment with `symbol`'s close. Market dates without a VIX
    /// reading are dropped; VIX dates without a market close have no close
    /// and no return.
    pub fn compare_with_market(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<MarketComparisonRecord>, ProviderError> {
        let daily = self.sentiment(range)?;
        let dates: Vec<NaiveDate> = daily.iter().map(|r| r.date).collect();
        let market = fetch_closes(&self.provider, symbol, "market_close", range)?.reindex(&dates);
        let returns = growth_rate(&market, 1)?;
        debug!(symbol, rows = daily.len(), "compared vix with market");

        Ok(daily
            .into_iter()
            .zip(market.iter().zip(returns.iter()))
            .map(|(r, (close, ret))| MarketComparisonRecord {
                date: r.date,
                vix: r.vix,
                fear: r.fear,
                score: r.score,
                signal: r.signal,
                market_close: close.finite(),
                market_return_pct: ret.finite(),
            })
            .collect())
    }

    /// VIX level, score and signal in the composite sentiment layout.
    pub fn combined_sentiment(
        &self,
        range: DateRange,
    ) -> Result<Vec<CombinedSentimentRecord>, ProviderError> {
        Ok(self
            .sentiment(range)?
            .into_iter()
            .map(|r| CombinedSentimentRecord {
                date: r.date,
                vix: r.vix,
                vix_score: r.score,
                vix_signal: r.signal,
            })
            .collect())
    }

    /// Latest available reading.
    pub fn current(&self) -> Result<Option<CurrentVix>, ProviderError> {
        let vix = self.levels(DateRange::all())?;
        Ok(vix.last_present().and_then(|(date, v)| {
            self.fear(v).map(|fear| CurrentVix {
                date,
                vix: (v * 100.0).round() / 100.0,
                fear,
                score: fear.score(),
                interpretation: fear.interpretation(),
            })
        }))
    }
}

fn round_tenth(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
