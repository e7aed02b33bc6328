//! CSV import provider.
//!
//! Serves both provider traits from a directory of local files:
//! `<dir>/<symbol>.csv` holds OHLCV bars, `<dir>/<series_id>.csv` holds a
//! `date,value` series. Nothing is fetched over the network.

use super::{
    weekly_bars, Bar, DateRange, EconomicDataProvider, Interval, MarketDataProvider,
    ProviderError,
};
use crate::io::{read_bars_file, read_series_file};
use crate::series::TimeSeries;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `code`. Characters that can't appear in a file name
    /// (path separators and the like) are replaced with `_`.
    pub fn path_for(&self, code: &str) -> PathBuf {
        let stem: String = code
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '=' | '^' => c,
                _ => '_',
            })
            .collect();
        self.dir.join(format!("{stem}.csv"))
    }
}

impl MarketDataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch_bars(
        &self,
        symbol: &str,
        range: DateRange,
        interval: Interval,
    ) -> Result<Vec<Bar>, ProviderError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        let bars: Vec<Bar> = read_bars_file(&path)?
            .into_iter()
            .filter(|b| range.contains(b.date))
            .collect();
        if bars.is_empty() {
            return Err(ProviderError::NoData {
                symbol: symbol.to_string(),
                range,
            });
        }
        debug!(symbol, rows = bars.len(), %range, %interval, "loaded bars");

        match interval {
            Interval::Daily => Ok(bars),
            Interval::Weekly => Ok(weekly_bars(&bars)?),
            Interval::Monthly => Err(ProviderError::UnsupportedInterval {
                provider: MarketDataProvider::name(self).to_string(),
                interval,
            }),
        }
    }
}

impl EconomicDataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch_series(&self, series_id: &str, range: DateRange) -> Result<TimeSeries, ProviderError> {
        let path = self.path_for(series_id);
        if !path.exists() {
            return Err(ProviderError::SymbolNotFound {
                symbol: series_id.to_string(),
            });
        }
        let series = read_series_file(&path, None)?;
        let series = match (range.start, range.end) {
            (None, None) => series,
            (start, end) => series.between(
                start.unwrap_or(chrono::NaiveDate::MIN),
                end.unwrap_or(chrono::NaiveDate::MAX),
            ),
        };
        debug!(series_id, rows = series.len(), %range, "loaded series");
        Ok(series.with_name(series_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::ymd;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("QQQ.csv"),
            "date,open,high,low,close,volume\n\
             2024-01-02,10,11,9,10.5,100\n\
             2024-01-03,10.5,12,10,11.5,200\n\
             2024-01-08,11.5,12,11,11.8,300\n",
        )
        .unwrap();
        fs::write(dir.path().join("CPIAUCSL.csv"), "date,value\n2024-01-01,300.1\n2024-02-01,301.0\n")
            .unwrap();
        dir
    }

    #[test]
    fn serves_daily_bars_in_range() {
        let dir = fixture();
        let p = CsvProvider::new(dir.path());
        let bars = p
            .fetch_bars(
                "QQQ",
                DateRange::new(Some(ymd(2024, 1, 3)), None),
                Interval::Daily,
            )
            .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, ymd(2024, 1, 3));
    }

    #[test]
    fn serves_weekly_bars() {
        let dir = fixture();
        let p = CsvProvider::new(dir.path());
        let bars = p.fetch_bars("QQQ", DateRange::all(), Interval::Weekly).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, ymd(2024, 1, 7));
        assert_eq!(bars[0].close, 11.5);
        assert_eq!(bars[0].volume, 300);
    }

    #[test]
    fn unknown_symbol() {
        let dir = fixture();
        let p = CsvProvider::new(dir.path());
        let err = p.fetch_bars("SPY", DateRange::all(), Interval::Daily).unwrap_err();
        assert!(matches!(err, ProviderError::SymbolNotFound { .. }));
    }

    #[test]
    fn empty_range_is_no_data() {
        let dir = fixture();
        let p = CsvProvider::new(dir.path());
        let err = p
            .fetch_bars("QQQ", DateRange::new(Some(ymd(2030, 1, 1)), None), Interval::Daily)
            .unwrap_err();
        assert!(matches!(err, ProviderError::NoData { .. }));
    }

    #[test]
    fn economic_series_named_by_code() {
        let dir = fixture();
        let p = CsvProvider::new(dir.path());
        let s = p.fetch_series("CPIAUCSL", DateRange::all()).unwrap();
        assert_eq!(s.name(), "CPIAUCSL");
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn path_for_sanitizes() {
        let p = CsvProvider::new("/data");
        assert_eq!(p.path_for("^VIX"), PathBuf::from("/data/^VIX.csv"));
        assert_eq!(p.path_for("a/b"), PathBuf::from("/data/a_b.csv"));
    }
}
