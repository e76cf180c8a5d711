//! CLI argument definitions for macroscan.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scan` | Rank the instrument universe by momentum |
//! | `history` | Closing series and moving average for one instrument |
//! | `positioning` | COT positioning z-score for one market |
//! | `universe` | List the configured instruments |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table, csv) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings and dropped instruments as errors |
//! | `--config` | none | JSON scan configuration file |
//! | `--timeout-ms` | `10000` | Per-request timeout in ms |
//!
//! # Examples
//!
//! ```bash
//! export MACROSCAN_API_KEYS=key1,key2,key3
//! macroscan --format table scan --asset-class fx --asset-class crypto
//! macroscan scan --export-default --pacing-ms 0
//! macroscan history EUR --ma-window 10
//! macroscan positioning --market gold --fetch --history cot.json
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use macroscan_core::positioning::{DEFAULT_LOOKBACK_WEEKS, MAX_LOOKBACK_WEEKS};
use macroscan_core::{AssetClass, ParticipantGroup, RetryMode};

/// Macro & market momentum scanner.
#[derive(Debug, Parser)]
#[command(
    name = "macroscan",
    author,
    version,
    about = "Macro & market momentum scanner",
    long_about = "Fetches daily series for a macro instrument universe with API key rotation, \
ranks instruments by momentum, and derives yield-curve, volatility and inflation indicators.\n\
\n\
API keys are read from MACROSCAN_API_KEYS (comma-separated)."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and envelope errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// JSON configuration file; built-in defaults apply when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Per-request timeout in milliseconds (overrides the config file).
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON envelope.
    Json,
    /// Aligned text table.
    Table,
    /// Comma-separated rows (scan and history only).
    Csv,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan the universe and rank instruments by momentum.
    Scan(ScanArgs),
    /// Fetch one instrument's series with a trailing moving average.
    History(HistoryArgs),
    /// Positioning statistics from Commitments of Traders reports.
    Positioning(PositioningArgs),
    /// List the configured instrument universe.
    Universe,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Long momentum lookback in observations.
    #[arg(long)]
    pub lookback: Option<usize>,

    /// Short momentum lookback in observations.
    #[arg(long)]
    pub short_lookback: Option<usize>,

    /// Delay between instrument fetches; 0 disables pacing.
    #[arg(long)]
    pub pacing_ms: Option<u64>,

    /// Which failures rotate to the next API key (rate_limited_only, all_failures).
    #[arg(long)]
    pub retry_mode: Option<RetryMode>,

    /// Only show these asset classes (repeatable).
    #[arg(long = "asset-class")]
    pub asset_classes: Vec<AssetClass>,

    /// Write the ranked rows to this CSV file.
    #[arg(long, conflicts_with = "export_default")]
    pub export: Option<PathBuf>,

    /// Write the ranked rows to Macro_Scanner_<YYYYMMDD>.csv.
    #[arg(long, default_value_t = false)]
    pub export_default: bool,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Symbol from the configured universe.
    pub symbol: String,

    /// Moving average window in observations.
    #[arg(long, default_value_t = 20)]
    pub ma_window: usize,
}

#[derive(Debug, Args)]
pub struct PositioningArgs {
    /// Case-insensitive market name substring, e.g. "gold".
    #[arg(long)]
    pub market: String,

    /// Lookback window in weeks.
    #[arg(
        long,
        default_value_t = DEFAULT_LOOKBACK_WEEKS,
        value_parser = clap::value_parser!(i64).range(1..=MAX_LOOKBACK_WEEKS)
    )]
    pub weeks: i64,

    /// Participant group (speculative, commercial, non-reportable).
    #[arg(long, default_value_t = ParticipantGroup::Speculative)]
    pub group: ParticipantGroup,

    /// JSON history file accumulated across runs.
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Fetch fresh reports from the CFTC before computing.
    #[arg(long, default_value_t = false)]
    pub fetch: bool,

    /// Maximum number of reports to fetch.
    #[arg(long, default_value_t = 260)]
    pub limit: usize,
}
