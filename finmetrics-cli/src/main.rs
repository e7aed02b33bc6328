//! finmetrics CLI: run metric transforms over local CSV files.
//!
//! Commands:
//! - `deviation`: distance from a trailing moving average, with signal
//! - `normalize`: 0–100 rescaling against a calibration file
//! - `classify`: five-zone labels from four thresholds
//! - `weekly`: week-ending resample
//! - `growth`: percent change over N periods
//! - `stats`: summary statistics
//! - `report`: deviation and VIX pipelines over a directory of bar files
//! - `put-call`: put/call volume ratio from one day of options data

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Weekday};
use clap::{Parser, Subcommand, ValueEnum};
use finmetrics_core::config::MetricsConfig;
use finmetrics_core::deviation::deviation_with_sma;
use finmetrics_core::growth::growth_rate;
use finmetrics_core::io::{read_series_file, write_records};
use finmetrics_core::metrics::{CustomMetrics, VixSentiment};
use finmetrics_core::normalize::{BoundsMethod, NormalizeOptions};
use finmetrics_core::options::{put_call_ratio_from_file, VolumeSource};
use finmetrics_core::percentile::QuantileMethod;
use finmetrics_core::provider::{CsvProvider, DateRange};
use finmetrics_core::signal::{label_or_missing, BoundaryRule, SignalBand, SignalLabel};
use finmetrics_core::stats::SeriesStats;
use finmetrics_core::{classify, normalize_with, to_weekly_anchored, Aggregation, TimeSeries};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "finmetrics",
    about = "finmetrics CLI: series transforms and metric reports over CSV data"
)]
struct Cli {
    /// Print JSON instead of CSV.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// A `date,value` series file.
#[derive(clap::Args)]
struct SeriesArgs {
    /// Input CSV with a `date` column.
    input: PathBuf,

    /// Value column. Defaults to the first non-date column.
    #[arg(long)]
    column: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Deviation of each value from its trailing simple moving average.
    Deviation {
        #[command(flatten)]
        series: SeriesArgs,

        /// Moving-average window.
        #[arg(long, default_value_t = 200)]
        window: usize,

        /// Signal thresholds t1,t2,t3,t4. Defaults to -0.05,0,0,0.05.
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        thresholds: Option<Vec<f64>>,
    },
    /// Rescale onto 0–100 using percentile bounds of a calibration series.
    Normalize {
        #[command(flatten)]
        series: SeriesArgs,

        /// Calibration CSV. Defaults to the input itself.
        #[arg(long)]
        calibration: Option<PathBuf>,

        #[arg(long, default_value_t = 1.0)]
        lower: f64,

        #[arg(long, default_value_t = 99.0)]
        upper: f64,

        /// Use raw min/max instead of percentiles.
        #[arg(long, default_value_t = false)]
        min_max: bool,

        #[arg(long, value_enum, default_value_t = QuantileArg::Exclusive)]
        quantile: QuantileArg,
    },
    /// Label each value with one of five signal zones.
    Classify {
        #[command(flatten)]
        series: SeriesArgs,

        /// Thresholds t1,t2,t3,t4 (non-decreasing).
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        thresholds: Vec<f64>,

        /// Which zone a value equal to a threshold falls into.
        #[arg(long, value_enum, default_value_t = RuleArg::UpperInclusive)]
        rule: RuleArg,
    },
    /// Resample to one value per week.
    Weekly {
        #[command(flatten)]
        series: SeriesArgs,

        /// first, last, mean, sum, min or max.
        #[arg(long, default_value = "last")]
        agg: Aggregation,

        /// Week-ending weekday.
        #[arg(long, default_value = "Sun")]
        week_end: Weekday,
    },
    /// Percent growth over N periods (12 for year-over-year on monthly data).
    Growth {
        #[command(flatten)]
        series: SeriesArgs,

        #[arg(long, default_value_t = 12)]
        periods: usize,
    },
    /// Mean, median, standard deviation, min, max and latest value.
    Stats {
        #[command(flatten)]
        series: SeriesArgs,
    },
    /// Run a metric pipeline over `<data-dir>/<ticker>.csv` bar files.
    Report {
        /// Directory of OHLCV CSV files.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// TOML config. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = ReportKind::Deviation)]
        kind: ReportKind,

        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD).
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Moving-average window. Defaults to the configured window.
        #[arg(long)]
        window: Option<usize>,

        /// Market ticker for `--kind vix-market`.
        #[arg(long, default_value = "SPY")]
        market: String,
    },
    /// Put/call volume ratio from one day of options data.
    PutCall {
        /// Options CSV for a single trading day.
        input: PathBuf,

        /// Trading day the file covers (YYYY-MM-DD).
        #[arg(long)]
        date: NaiveDate,

        /// Only count contracts on this underlying.
        #[arg(long)]
        underlying: Option<String>,

        /// The file holds trades (`size` column) rather than daily aggregates.
        #[arg(long, default_value_t = false)]
        trades: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RuleArg {
    UpperInclusive,
    LowerInclusive,
    Outward,
}

impl From<RuleArg> for BoundaryRule {
    fn from(rule: RuleArg) -> Self {
        match rule {
            RuleArg::UpperInclusive => BoundaryRule::UpperInclusive,
            RuleArg::LowerInclusive => BoundaryRule::LowerInclusive,
            RuleArg::Outward => BoundaryRule::Outward,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum QuantileArg {
    Exclusive,
    Linear,
}

impl From<QuantileArg> for QuantileMethod {
    fn from(q: QuantileArg) -> Self {
        match q {
            QuantileArg::Exclusive => QuantileMethod::Exclusive,
            QuantileArg::Linear => QuantileMethod::Linear,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportKind {
    Deviation,
    Normalized,
    Weekly,
    Stats,
    Vix,
    VixNormalized,
    VixWeekly,
    VixCurrent,
    VixMarket,
    Combined,
}

#[derive(Serialize)]
struct ValueRecord {
    date: NaiveDate,
    value: Option<f64>,
}

#[derive(Serialize)]
struct LabelRecord {
    date: NaiveDate,
    value: Option<f64>,
    #[serde(serialize_with = "label_or_missing")]
    signal: Option<SignalLabel>,
}

#[derive(Serialize)]
struct SeriesDeviationRecord {
    date: NaiveDate,
    value: Option<f64>,
    sma: Option<f64>,
    deviation: Option<f64>,
    #[serde(serialize_with = "label_or_missing")]
    signal: Option<SignalLabel>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let json = cli.json;

    match cli.command {
        Commands::Deviation {
            series,
            window,
            thresholds,
        } => run_deviation(&series, window, thresholds, json),
        Commands::Normalize {
            series,
            calibration,
            lower,
            upper,
            min_max,
            quantile,
        } => {
            let bounds = if min_max {
                BoundsMethod::MinMax
            } else {
                BoundsMethod::Percentile { lower, upper }
            };
            let opts = NormalizeOptions {
                bounds,
                quantile: quantile.into(),
            };
            run_normalize(&series, calibration.as_deref(), &opts, json)
        }
        Commands::Classify {
            series,
            thresholds,
            rule,
        } => {
            let band = band_from(&thresholds)?.with_rule(rule.into());
            let values = load(&series)?;
            let labels = classify(&values, &band);
            let records: Vec<LabelRecord> = values
                .iter()
                .zip(labels.iter())
                .map(|(v, l)| LabelRecord {
                    date: v.date,
                    value: v.finite(),
                    signal: l.value,
                })
                .collect();
            emit(&records, json)
        }
        Commands::Weekly {
            series,
            agg,
            week_end,
        } => {
            let weekly = to_weekly_anchored(&load(&series)?, agg, week_end);
            info!(weeks = weekly.series.len(), aggregation = agg.as_str(), "resampled");
            emit(&value_records(&weekly.series), json)
        }
        Commands::Growth { series, periods } => {
            let growth = growth_rate(&load(&series)?, periods)?;
            emit(&value_records(&growth), json)
        }
        Commands::Stats { series } => {
            let stats = SeriesStats::from_series(&load(&series)?);
            emit(&[stats], json)
        }
        Commands::Report {
            data_dir,
            config,
            kind,
            start,
            end,
            window,
            market,
        } => run_report(
            &data_dir,
            config.as_deref(),
            kind,
            DateRange::new(start, end),
            window,
            &market,
            json,
        ),
        Commands::PutCall {
            input,
            date,
            underlying,
            trades,
        } => {
            let layout = if trades {
                VolumeSource::Trades
            } else {
                VolumeSource::DailyAggregate
            };
            let record = put_call_ratio_from_file(&input, date, underlying.as_deref(), layout)
                .with_context(|| format!("failed to read options from {}", input.display()))?;
            emit(&[record], json)
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("finmetrics=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load(args: &SeriesArgs) -> Result<TimeSeries> {
    read_series_file(&args.input, args.column.as_deref())
        .with_context(|| format!("failed to read series from {}", args.input.display()))
}

fn band_from(thresholds: &[f64]) -> Result<SignalBand> {
    let Ok(array) = <[f64; 4]>::try_from(thresholds) else {
        bail!("expected exactly 4 thresholds, got {}", thresholds.len());
    };
    Ok(SignalBand::from_array(array)?)
}

fn value_records(series: &TimeSeries) -> Vec<ValueRecord> {
    series
        .iter()
        .map(|o| ValueRecord {
            date: o.date,
            value: o.finite(),
        })
        .collect()
}

fn run_deviation(
    args: &SeriesArgs,
    window: usize,
    thresholds: Option<Vec<f64>>,
    json: bool,
) -> Result<()> {
    let band = match thresholds {
        Some(t) => band_from(&t)?.with_rule(SignalBand::deviation().rule()),
        None => SignalBand::deviation(),
    };
    let values = load(args)?;
    let cols = deviation_with_sma(&values, window)?;
    let labels = classify(&cols.deviation, &band);

    let records: Vec<SeriesDeviationRecord> = values
        .iter()
        .zip(cols.sma.iter())
        .zip(cols.deviation.iter().zip(labels.iter()))
        .map(|((v, s), (d, l))| SeriesDeviationRecord {
            date: v.date,
            value: v.finite(),
            sma: s.finite(),
            deviation: d.finite(),
            signal: l.value,
        })
        .collect();
    emit(&records, json)
}

fn run_normalize(
    args: &SeriesArgs,
    calibration: Option<&Path>,
    opts: &NormalizeOptions,
    json: bool,
) -> Result<()> {
    let values = load(args)?;
    let calibration = match calibration {
        Some(path) => read_series_file(path, args.column.as_deref())
            .with_context(|| format!("failed to read calibration from {}", path.display()))?,
        None => values.clone(),
    };
    let normalized = normalize_with(&values, &calibration, opts)?;
    emit(&value_records(&normalized), json)
}

fn run_report(
    data_dir: &Path,
    config_path: Option<&Path>,
    kind: ReportKind,
    range: DateRange,
    window: Option<usize>,
    market: &str,
    json: bool,
) -> Result<()> {
    let config = match config_path {
        Some(path) => MetricsConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => MetricsConfig::default(),
    };
    let window = window.unwrap_or(config.custom.window);
    let provider = CsvProvider::new(data_dir);
    let week_end = config.resample.week_end;
    info!(data_dir = %data_dir.display(), %range, window, "running report");

    let custom = CustomMetrics::new(&provider, config.custom.clone()).with_week_end(week_end);
    let vix = VixSentiment::new(&provider, config.vix.clone()).with_week_end(week_end);

    match kind {
        ReportKind::Deviation => emit(&custom.qqq_deviation(range, window)?, json),
        ReportKind::Normalized => emit(&custom.qqq_deviation_normalized(range, window)?, json),
        ReportKind::Weekly => emit(&custom.qqq_deviation_weekly(range, window)?, json),
        ReportKind::Stats => emit(&[custom.deviation_stats(range, window)?], json),
        ReportKind::Vix => emit(&vix.sentiment(range)?, json),
        ReportKind::VixNormalized => emit(&vix.sentiment_normalized(range)?, json),
        ReportKind::VixWeekly => emit(&vix.sentiment_weekly(range)?, json),
        ReportKind::VixCurrent => match vix.current()? {
            Some(now) => emit(&[now], json),
            None => bail!("no VIX readings in {}", data_dir.display()),
        },
        ReportKind::VixMarket => emit(&vix.compare_with_market(market, range)?, json),
        ReportKind::Combined => emit(&vix.combined_sentiment(range)?, json),
    }
}

/// Write records to stdout as CSV, or as a JSON array.
fn emit<T: Serialize>(records: &[T], json: bool) -> Result<()> {
    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, records)?;
        writeln!(out)?;
    } else {
        write_records(&mut out, records)?;
    }
    Ok(())
}
