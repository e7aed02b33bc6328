//! Put/call volume ratio from a local options file.
//!
//! The file is one day of options data, either per-contract daily aggregates
//! (`volume` column) or individual trades (`size` column). Each row carries a
//! contract type and, usually, the underlying symbol.

use crate::io::read_option_volumes_file;
use crate::provider::ProviderError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Columns tried, in order, for the contract type.
pub const CONTRACT_TYPE_COLUMNS: [&str; 3] = ["contract_type", "option_type", "put_call"];

pub const UNDERLYING_COLUMN: &str = "underlying_symbol";

/// Underlying shown when no filter was applied.
pub const ALL_UNDERLYINGS: &str = "ALL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    Put,
    Call,
}

impl ContractType {
    /// `put` or `call`, any case. Other values are not contract types.
    pub fn parse(cell: &str) -> Option<Self> {
        if cell.eq_ignore_ascii_case("put") {
            Some(Self::Put)
        } else if cell.eq_ignore_ascii_case("call") {
            Some(Self::Call)
        } else {
            None
        }
    }
}

/// Which layout the options file has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeSource {
    #[default]
    DailyAggregate,
    Trades,
}

impl VolumeSource {
    pub fn column(self) -> &'static str {
        match self {
            Self::DailyAggregate => "volume",
            Self::Trades => "size",
        }
    }
}

/// One row of an options file that named a put or a call.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionVolume {
    pub underlying: Option<String>,
    pub contract: ContractType,
    pub volume: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PutCallRecord {
    pub date: NaiveDate,
    pub underlying_symbol: String,
    pub put_volume: u64,
    pub call_volume: u64,
    /// Missing when there is no call volume.
    pub put_call_ratio: Option<f64>,
}

/// Sum put and call volume, optionally for one underlying.
///
/// A filter over rows that carry no underlying at all is ignored with a
/// warning and the whole file is counted.
pub fn put_call_ratio(
    rows: &[OptionVolume],
    date: NaiveDate,
    underlying: Option<&str>,
) -> PutCallRecord {
    let has_underlying = rows.iter().any(|r| r.underlying.is_some());
    if let (Some(symbol), false) = (underlying, has_underlying) {
        warn!(%date, symbol, "no underlying column, counting every row");
    }
    let filter = underlying.filter(|_| has_underlying);

    let (mut put_volume, mut call_volume) = (0u64, 0u64);
    for row in rows {
        if filter.is_some_and(|symbol| row.underlying.as_deref() != Some(symbol)) {
            continue;
        }
        match row.contract {
            ContractType::Put => put_volume += row.volume,
            ContractType::Call => call_volume += row.volume,
        }
    }

    PutCallRecord {
        date,
        underlying_symbol: underlying.unwrap_or(ALL_UNDERLYINGS).to_string(),
        put_volume,
        call_volume,
        put_call_ratio: (call_volume > 0).then(|| put_volume as f64 / call_volume as f64),
    }
}

/// Read one day's options file and compute its put/call ratio.
pub fn put_call_ratio_from_file(
    path: &Path,
    date: NaiveDate,
    underlying: Option<&str>,
    source: VolumeSource,
) -> Result<PutCallRecord, ProviderError> {
    let rows = read_option_volumes_file(path, source)?;
    let record = put_call_ratio(&rows, date, underlying);
    debug!(
        path = %path.display(),
        rows = rows.len(),
        puts = record.put_volume,
        calls = record.call_volume,
        "put/call volume"
    );
    Ok(record)
}
