//! Deviation oscillator: distance of the tracked ticker's close from its
//! trailing average, raw, normalized against a long calibration history, and
//! resampled to weeks.

use super::fetch_closes;
use crate::config::CustomMetricsConfig;
use crate::deviation::{deviation_with_sma, DeviationColumns};
use crate::normalize::normalize_with;
use crate::provider::{DateRange, MarketDataProvider, ProviderError};
use crate::resample::{Aggregation, WeeklyPlan, DEFAULT_WEEK_END};
use crate::series::TimeSeries;
use crate::signal::{classify, label_or_missing, SignalLabel};
use crate::stats::DeviationStats;
use chrono::{NaiveDate, Weekday};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviationRecord {
    pub date: NaiveDate,
    pub close: Option<f64>,
    pub sma: Option<f64>,
    pub deviation: Option<f64>,
    #[serde(serialize_with = "label_or_missing")]
    pub signal: Option<SignalLabel>,
}

/// Deviation plus its 0–100 score. `signal` is derived from `normalized`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedDeviationRecord {
    pub date: NaiveDate,
    pub close: Option<f64>,
    pub sma: Option<f64>,
    pub deviation: Option<f64>,
    pub normalized: Option<f64>,
    #[serde(serialize_with = "label_or_missing")]
    pub signal: Option<SignalLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyDeviationRecord {
    pub week_ending: NaiveDate,
    pub close: Option<f64>,
    pub sma: Option<f64>,
    pub deviation: Option<f64>,
    #[serde(serialize_with = "label_or_missing")]
    pub signal: Option<SignalLabel>,
}

pub struct CustomMetrics<P> {
    provider: P,
    config: CustomMetricsConfig,
    week_end: Weekday,
}

impl<P: MarketDataProvider> CustomMetrics<P> {
    pub fn new(provider: P, config: CustomMetricsConfig) -> Self {
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

    pub fn config(&self) -> &CustomMetricsConfig {
        &self.config
    }

    fn columns(
        &self,
        range: DateRange,
        window: usize,
    ) -> Result<(TimeSeries, DeviationColumns), ProviderError> {
        let close = fetch_closes(&self.provider, &self.config.ticker, "close", range)?;
        let cols = deviation_with_sma(&close, window)?;
        Ok((close, cols))
    }

    /// Daily close, SMA, deviation and signal. The first `window - 1` rows
    /// have no SMA.
    pub fn qqq_deviation(
        &self,
        range: DateRange,
        window: usize,
    ) -> Result<Vec<DeviationRecord>, ProviderError> {
        let (close, cols) = self.columns(range, window)?;
        let signal = classify(&cols.deviation, &self.config.signal_band);

        Ok(close
            .iter()
            .zip(cols.sma.iter())
            .zip(cols.deviation.iter())
            .zip(signal.iter())
            .map(|(((c, s), d), sig)| DeviationRecord {
                date: c.date,
                close: c.finite(),
                sma: s.finite(),
                deviation: d.finite(),
                signal: sig.value,
            })
            .collect())
    }

    /// Deviation rescaled onto 0–100 using bounds from the history between
    /// the configured calibration start and the end of `range`.
    pub fn qqq_deviation_normalized(
        &self,
        range: DateRange,
        window: usize,
    ) -> Result<Vec<NormalizedDeviationRecord>, ProviderError> {
        let calibration_range = range.starting(self.config.calibration_start);
        let (_, calibration) = self.columns(calibration_range, window)?;
        let (close, cols) = self.columns(range, window)?;

        let normalized = normalize_with(&cols.deviation, &calibration.deviation, &self.config.normalize)?;
        let signal = classify(&normalized, &self.config.normalized_band);
        info!(
            ticker = %self.config.ticker,
            %range,
            calibration = %calibration_range,
            rows = close.len(),
            "normalized deviation"
        );

        Ok(close
            .iter()
            .zip(cols.sma.iter())
            .zip(cols.deviation.iter())
            .zip(normalized.iter().zip(signal.iter()))
            .map(|(((c, s), d), (n, sig))| NormalizedDeviationRecord {
                date: c.date,
                close: c.finite(),
                sma: s.finite(),
                deviation: d.finite(),
                normalized: n.finite(),
                signal: sig.value,
            })
            .collect())
    }

    /// Week-ending close, SMA and deviation (each the week's last value),
    /// with the signal taken from the weekly deviation.
    pub fn qqq_deviation_weekly(
        &self,
        range: DateRange,
        window: usize,
    ) -> Result<Vec<WeeklyDeviationRecord>, ProviderError> {
        let (close, cols) = self.columns(range, window)?;
        let plan = WeeklyPlan::new(self.week_end)
            .field(close.name(), Aggregation::Last)
            .field(cols.sma.name(), Aggregation::Last)
            .field(cols.deviation.name(), Aggregation::Last);
        let frame = plan.apply(&[close, cols.sma, cols.deviation])?;

        // one column per plan field, in field order
        let (close, sma, deviation) = (&frame.columns[0], &frame.columns[1], &frame.columns[2]);
        let signal = classify(deviation, &self.config.signal_band);

        Ok(frame
            .dates
            .iter()
            .enumerate()
            .map(|(i, &week_ending)| WeeklyDeviationRecord {
                week_ending,
                close: close.points()[i].finite(),
                sma: sma.points()[i].finite(),
                deviation: deviation.points()[i].finite(),
                signal: signal.points()[i].value,
            })
            .collect())
    }

    pub fn deviation_stats(
        &self,
        range: DateRange,
        window: usize,
    ) -> Result<DeviationStats, ProviderError> {
        let (_, cols) = self.columns(range, window)?;
        Ok(DeviationStats::from_series(&cols.deviation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricError;
    use crate::provider::MemoryProvider;
    use crate::series::{daily_dates, ymd};
    use crate::signal::INSUFFICIENT_DATA;

    fn provider(values: &[f64]) -> MemoryProvider {
        let dates = daily_dates(ymd(2024, 1, 1), values.len());
        let closes = TimeSeries::from_values("close", dates.into_iter().zip(values.iter().copied()))
            .unwrap();
        MemoryProvider::new().with_closes("QQQ", &closes)
    }

    fn metrics(values: &[f64]) -> CustomMetrics<MemoryProvider> {
        CustomMetrics::new(provider(values), CustomMetricsConfig::default())
    }

    #[test]
    fn daily_records() {
        let m = metrics(&[10.0, 10.0, 10.0, 10.0, 13.0]);
        let rows = m.qqq_deviation(DateRange::all(), 3).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].sma, None);
        assert_eq!(rows[0].signal, None);
        assert_eq!(rows[2].deviation, Some(0.0));
        // a deviation of exactly zero sits on the collapsed middle threshold
        assert_eq!(rows[2].signal, Some(SignalLabel::Bullish));
        assert!((rows[4].deviation.unwrap() - 2.0 / 11.0).abs() < 1e-12);
        assert_eq!(rows[4].signal, Some(SignalLabel::StrongBullish));
    }

    #[test]
    fn warm_up_rows_print_insufficient_data() {
        let m = metrics(&[10.0, 11.0]);
        let rows = m.qqq_deviation(DateRange::all(), 2).unwrap();
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["signal"], INSUFFICIENT_DATA);
        assert!(json["sma"].is_null());
    }

    #[test]
    fn normalized_records_are_bounded() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 10.0).collect();
        let m = metrics(&prices);
        let range = DateRange::new(Some(ymd(2024, 2, 1)), None);
        let rows = m.qqq_deviation_normalized(range, 5).unwrap();
        assert_eq!(rows.first().map(|r| r.date), Some(ymd(2024, 2, 1)));
        for r in &rows {
            if let Some(n) = r.normalized {
                assert!((0.0..=100.0).contains(&n));
                assert!(r.signal.is_some());
            }
        }
    }

    #[test]
    fn flat_calibration_is_degenerate() {
        let m = metrics(&[50.0; 10]);
        let err = m.qqq_deviation_normalized(DateRange::all(), 3).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Metric(MetricError::DegenerateCalibration { .. })
        ));
    }

    #[test]
    fn weekly_takes_last_of_week() {
        // 2024-01-01 is a Monday; 10 days span two Sunday-ending weeks
        let prices: Vec<f64> = (1..=10).map(f64::from).collect();
        let m = metrics(&prices);
        let rows = m.qqq_deviation_weekly(DateRange::all(), 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].week_ending, ymd(2024, 1, 7));
        assert_eq!(rows[0].close, Some(7.0));
        assert_eq!(rows[0].sma, Some(6.5));
        assert_eq!(rows[1].week_ending, ymd(2024, 1, 14));
        assert_eq!(rows[1].close, Some(10.0));
    }

    #[test]
    fn stats_over_deviation() {
        let m = metrics(&[10.0, 12.0, 9.0, 9.0]);
        let stats = m.deviation_stats(DateRange::all(), 2).unwrap();
        // deviations: 1/11, -3/21, 0
        assert_eq!(stats.count, 3);
        assert!((stats.pct_bullish - 100.0 / 3.0).abs() < 1e-9);
        assert!((stats.pct_bearish - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn zero_window_is_a_metric_error() {
        let m = metrics(&[1.0, 2.0]);
        assert!(matches!(
            m.qqq_deviation(DateRange::all(), 0),
            Err(ProviderError::Metric(MetricError::InvalidWindow { window: 0 }))
        ));
    }
}
