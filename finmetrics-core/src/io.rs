//! CSV reading and writing for series, bars, options volume and metric records.
//!
//! Series files have a `date` column followed by one or more value columns.
//! Empty cells, `NA`, `NaN` and `.` (the economic vendor's gap marker) read
//! as missing. Missing values are written as empty cells.

use crate::error::MetricError;
use crate::options::{
    ContractType, OptionVolume, VolumeSource, CONTRACT_TYPE_COLUMNS, UNDERLYING_COLUMN,
};
use crate::provider::{Bar, ProviderError};
use crate::series::{Observation, Series, SeriesFrame, TimeSeries};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const MISSING_MARKERS: [&str; 5] = ["", ".", "na", "nan", "null"];

/// Read one value column from a series CSV. `column = None` takes the first
/// column after `date`. The series is named after the column header.
pub fn read_series<R: Read>(
    reader: R,
    source: &str,
    column: Option<&str>,
) -> Result<TimeSeries, ProviderError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let csv_err = |source_err| ProviderError::Csv {
        path: source.to_string(),
        source: source_err,
    };

    let headers = rdr.headers().map_err(csv_err)?.clone();
    let date_idx = header_index(&headers, "date").ok_or_else(|| missing_column(source, "date"))?;
    let value_idx = match column {
        Some(name) => header_index(&headers, name).ok_or_else(|| missing_column(source, name))?,
        None => (0..headers.len())
            .find(|&i| i != date_idx)
            .ok_or_else(|| missing_column(source, "value"))?,
    };
    let name = headers.get(value_idx).unwrap_or("value").to_string();

    let mut points = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let date = parse_date(record.get(date_idx).unwrap_or(""), source, row + 1)?;
        let value = parse_value(record.get(value_idx).unwrap_or(""), source, row + 1)?;
        points.push(Observation { date, value });
    }
    Ok(Series::new(name, points)?)
}

pub fn read_series_file(path: &Path, column: Option<&str>) -> Result<TimeSeries, ProviderError> {
    read_series(open(path)?, &path.display().to_string(), column)
}

/// Read OHLCV rows. Column names are matched case-insensitively; empty price
/// cells become NaN and an empty volume becomes zero.
pub fn read_bars<R: Read>(reader: R, source: &str) -> Result<Vec<Bar>, ProviderError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let csv_err = |source_err| ProviderError::Csv {
        path: source.to_string(),
        source: source_err,
    };

    let headers = rdr.headers().map_err(csv_err)?.clone();
    let idx = |name: &str| header_index(&headers, name).ok_or_else(|| missing_column(source, name));
    let (date_i, open_i, high_i, low_i, close_i) =
        (idx("date")?, idx("open")?, idx("high")?, idx("low")?, idx("close")?);
    let volume_i = header_index(&headers, "volume");

    let mut bars: Vec<Bar> = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let row = row + 1;
        let price = |i: usize| -> Result<f64, ProviderError> {
            Ok(parse_value(record.get(i).unwrap_or(""), source, row)?.unwrap_or(f64::NAN))
        };
        let volume = match volume_i.and_then(|i| record.get(i)) {
            Some(v) if !is_missing(v) => v.parse::<f64>().map_err(|e| ProviderError::Parse {
                path: source.to_string(),
                row,
                message: format!("volume '{v}': {e}"),
            })? as u64,
            _ => 0,
        };
        let date = parse_date(record.get(date_i).unwrap_or(""), source, row)?;

        if let Some(prev) = bars.last() {
            if prev.date >= date {
                return Err(MetricError::UnorderedSeries {
                    name: source.to_string(),
                    index: bars.len(),
                }
                .into());
            }
        }
        bars.push(Bar {
            date,
            open: price(open_i)?,
            high: price(high_i)?,
            low: price(low_i)?,
            close: price(close_i)?,
            volume,
        });
    }
    Ok(bars)
}

pub fn read_bars_file(path: &Path) -> Result<Vec<Bar>, ProviderError> {
    read_bars(open(path)?, &path.display().to_string())
}

/// Read put and call rows from one day of options data. The contract type
/// comes from the first of [`CONTRACT_TYPE_COLUMNS`] present; rows of any
/// other type are skipped. An empty volume counts as zero.
pub fn read_option_volumes<R: Read>(
    reader: R,
    source: &str,
    layout: VolumeSource,
) -> Result<Vec<OptionVolume>, ProviderError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let csv_err = |source_err| ProviderError::Csv {
        path: source.to_string(),
        source: source_err,
    };

    let headers = rdr.headers().map_err(csv_err)?.clone();
    let contract_i = CONTRACT_TYPE_COLUMNS
        .iter()
        .find_map(|name| header_index(&headers, name))
        .ok_or_else(|| ProviderError::Parse {
            path: source.to_string(),
            row: 0,
            message: format!(
                "no contract type column (tried {}; found {})",
                CONTRACT_TYPE_COLUMNS.join(", "),
                headers.iter().collect::<Vec<_>>().join(", ")
            ),
        })?;
    let volume_i = header_index(&headers, layout.column())
        .ok_or_else(|| missing_column(source, layout.column()))?;
    let underlying_i = header_index(&headers, UNDERLYING_COLUMN);

    let mut rows = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let Some(contract) = ContractType::parse(record.get(contract_i).unwrap_or("")) else {
            continue;
        };
        let volume = match parse_value(record.get(volume_i).unwrap_or(""), source, row + 1)? {
            Some(v) if v >= 0.0 => v as u64,
            Some(v) => {
                return Err(ProviderError::Parse {
                    path: source.to_string(),
                    row: row + 1,
                    message: format!("negative volume {v}"),
                })
            }
            None => 0,
        };
        let underlying = underlying_i
            .and_then(|i| record.get(i))
            .filter(|cell| !is_missing(cell))
            .map(str::to_string);
        rows.push(OptionVolume {
            underlying,
            contract,
            volume,
        });
    }
    Ok(rows)
}

pub fn read_option_volumes_file(
    path: &Path,
    layout: VolumeSource,
) -> Result<Vec<OptionVolume>, ProviderError> {
    read_option_volumes(open(path)?, &path.display().to_string(), layout)
}

/// Write a frame as `date,<col>,<col>...`.
pub fn write_frame<W: Write>(writer: W, frame: &SeriesFrame) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut header = vec!["date".to_string()];
    header.extend(frame.columns.iter().map(|c| c.name().to_string()));
    wtr.write_record(&header)?;

    for (i, date) in frame.dates.iter().enumerate() {
        let mut row = vec![date.to_string()];
        row.extend(frame.columns.iter().map(|c| {
            c.points()
                .get(i)
                .and_then(Observation::finite)
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write one series as `date,<name>`.
pub fn write_series<W: Write>(writer: W, series: &TimeSeries) -> Result<(), csv::Error> {
    let frame = SeriesFrame {
        dates: series.dates().collect(),
        columns: vec![series.clone()],
    };
    write_frame(writer, &frame)
}

/// Write typed records, one row each, headers from field names.
pub fn write_records<W: Write, T: Serialize>(writer: W, records: &[T]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

fn open(path: &Path) -> Result<File, ProviderError> {
    File::open(path).map_err(|source| ProviderError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn header_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

fn missing_column(source: &str, name: &str) -> ProviderError {
    ProviderError::Parse {
        path: source.to_string(),
        row: 0,
        message: format!("missing '{name}' column"),
    }
}

fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS
        .iter()
        .any(|m| cell.eq_ignore_ascii_case(m))
}

fn parse_value(cell: &str, source: &str, row: usize) -> Result<Option<f64>, ProviderError> {
    if is_missing(cell) {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(|v| v.is_finite().then_some(v))
        .map_err(|e| ProviderError::Parse {
            path: source.to_string(),
            row,
            message: format!("value '{cell}': {e}"),
        })
}

/// ISO date, optionally followed by a time part which is dropped.
fn parse_date(cell: &str, source: &str, row: usize) -> Result<NaiveDate, ProviderError> {
    let day = cell.get(..10).unwrap_or(cell);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| ProviderError::Parse {
        path: source.to_string(),
        row,
        message: format!("date '{cell}': {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{align, ymd};

    #[test]
    fn reads_series_with_gaps() {
        let csv = "date,UMCSENT\n2024-01-01,69.7\n2024-02-01,.\n2024-03-01,\n2024-04-01,77.2\n";
        let s = read_series(csv.as_bytes(), "test", None).unwrap();
        assert_eq!(s.name(), "UMCSENT");
        assert_eq!(s.values(), vec![Some(69.7), None, None, Some(77.2)]);
        assert_eq!(s.first_date(), Some(ymd(2024, 1, 1)));
    }

    #[test]
    fn reads_named_column_and_datetime() {
        let csv = "Date,Open,Close\n2024-01-02 00:00:00,1,2\n2024-01-03 00:00:00,3,4\n";
        let s = read_series(csv.as_bytes(), "test", Some("close")).unwrap();
        assert_eq!(s.name(), "Close");
        assert_eq!(s.values(), vec![Some(2.0), Some(4.0)]);
    }

    #[test]
    fn rejects_garbage_value() {
        let csv = "date,x\n2024-01-01,abc\n";
        let err = read_series(csv.as_bytes(), "test", None).unwrap_err();
        assert!(matches!(err, ProviderError::Parse { row: 1, .. }), "{err}");
    }

    #[test]
    fn rejects_unordered_rows() {
        let csv = "date,x\n2024-01-02,1\n2024-01-01,2\n";
        let err = read_series(csv.as_bytes(), "test", None).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Metric(MetricError::UnorderedSeries { .. })
        ));
    }

    #[test]
    fn reads_bars() {
        let csv = "date,open,high,low,close,volume\n\
                   2024-01-02,10,12,9,11,1000\n\
                   2024-01-03,11,13,10,,\n";
        let bars = read_bars(csv.as_bytes(), "QQQ.csv").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 11.0);
        assert_eq!(bars[0].volume, 1000);
        assert!(bars[1].close.is_nan());
        assert_eq!(bars[1].volume, 0);
    }

    #[test]
    fn bars_need_price_columns() {
        let csv = "date,close\n2024-01-02,1\n";
        assert!(read_bars(csv.as_bytes(), "x").is_err());
    }

    #[test]
    fn reads_option_rows_and_skips_other_types() {
        let csv = "ticker,underlying_symbol,contract_type,volume\n\
                   O:SPY241105P00550000,SPY,PUT,120\n\
                   O:SPY241105C00560000,SPY,call,80.0\n\
                   O:XYZ,XYZ,warrant,999\n\
                   O:QQQ241105C00480000,,call,\n";
        let rows = read_option_volumes(csv.as_bytes(), "day.csv", VolumeSource::DailyAggregate)
            .unwrap();
        assert_eq!(
            rows,
            vec![
                OptionVolume {
                    underlying: Some("SPY".to_string()),
                    contract: ContractType::Put,
                    volume: 120
                },
                OptionVolume {
                    underlying: Some("SPY".to_string()),
                    contract: ContractType::Call,
                    volume: 80
                },
                OptionVolume {
                    underlying: None,
                    contract: ContractType::Call,
                    volume: 0
                },
            ]
        );
    }

    #[test]
    fn option_contract_column_falls_back_in_order() {
        let csv = "put_call,size\nput,3\ncall,4\n";
        let rows = read_option_volumes(csv.as_bytes(), "t.csv", VolumeSource::Trades).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].volume, 4);
        assert!(rows.iter().all(|r| r.underlying.is_none()));
    }

    #[test]
    fn option_file_needs_contract_and_volume_columns() {
        let csv = "ticker,volume\nX,1\n";
        let err = read_option_volumes(csv.as_bytes(), "t.csv", VolumeSource::DailyAggregate)
            .unwrap_err();
        match err {
            ProviderError::Parse { row: 0, message, .. } => {
                assert!(message.contains("contract_type, option_type, put_call"), "{message}");
                assert!(message.contains("ticker, volume"), "{message}");
            }
            other => panic!("expected Parse, got {other:?}"),
        }
        // trades layout wants `size`
        let csv = "option_type,volume\nput,1\n";
        assert!(read_option_volumes(csv.as_bytes(), "t.csv", VolumeSource::Trades).is_err());
    }

    #[test]
    fn writes_frame_with_empty_missing() {
        let a = TimeSeries::from_values("a", [(ymd(2024, 1, 1), 1.5), (ymd(2024, 1, 2), 2.0)])
            .unwrap();
        let b = TimeSeries::from_values("b", [(ymd(2024, 1, 2), 3.0)]).unwrap();
        let mut out = Vec::new();
        write_frame(&mut out, &align(vec![a, b])).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "date,a,b\n2024-01-01,1.5,\n2024-01-02,2,3\n"
        );
    }

    #[test]
    fn series_roundtrips_through_csv() {
        let s = TimeSeries::from_options(
            "cpi",
            [(ymd(2024, 1, 1), Some(300.5)), (ymd(2024, 2, 1), None)],
        )
        .unwrap();
        let mut out = Vec::new();
        write_series(&mut out, &s).unwrap();
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "date,cpi\n2024-01-01,300.5\n2024-02-01,\n");
        assert_eq!(read_series(out.as_slice(), "mem", None).unwrap(), s);
    }

    #[test]
    fn writes_records() {
        #[derive(Serialize)]
        struct Row {
            date: NaiveDate,
            value: Option<f64>,
        }
        let rows = vec![
            Row {
                date: ymd(2024, 1, 1),
                value: Some(1.0),
            },
            Row {
                date: ymd(2024, 1, 2),
                value: None,
            },
        ];
        let mut out = Vec::new();
        write_records(&mut out, &rows).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "date,value\n2024-01-01,1.0\n2024-01-02,\n"
        );
    }
}
