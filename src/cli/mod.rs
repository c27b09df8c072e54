//! Command-line parsing for the RFR curve monitor.
//!
//! Argument parsing and command dispatch stay separate from the store and
//! comparison code; flags here only override `MonitorConfig` fields.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::Maturity;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rfr", version, about = "Risk-free rate curve monitor: history, M/M and YTD alerts")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides applied on top of the environment configuration.
#[derive(Debug, Args, Clone, Default)]
pub struct GlobalArgs {
    /// Historical store CSV file (overrides RFR_STORE_PATH).
    #[arg(long, global = true, value_name = "CSV")]
    pub store: Option<PathBuf>,

    /// Country code to monitor (overrides RFR_COUNTRY).
    #[arg(long, global = true)]
    pub country: Option<String>,

    /// Comma-separated maturities in years, e.g. `1,5,10,20,30`.
    #[arg(long, global = true, value_name = "LIST")]
    pub maturities: Option<String>,

    /// Month-over-month alert threshold in bps.
    #[arg(long, global = true, value_name = "BPS")]
    pub mom_threshold: Option<f64>,

    /// Year-to-date alert threshold in bps.
    #[arg(long, global = true, value_name = "BPS")]
    pub ytd_threshold: Option<f64>,

    /// Debug logging (RUST_LOG still takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest one extractor observation, store it, and print the comparison report.
    Update(UpdateArgs),
    /// Print the comparison report for an observation already in the store.
    Analyze(AnalyzeArgs),
    /// Print the rate history of one maturity.
    Series(SeriesArgs),
    /// Print store statistics.
    Stats,
    /// Back up the store and rebuild it from a directory of observations.
    Rebuild(RebuildArgs),
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Observation JSON produced by the extractor.
    #[arg(long, value_name = "JSON")]
    pub input: PathBuf,

    /// Move an unreadable store aside (`.corrupt`) and continue with an empty one.
    #[arg(long)]
    pub recover: bool,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Reference date of the stored observation (YYYY-MM-DD).
    #[arg(long)]
    pub date: NaiveDate,
}

#[derive(Debug, Args)]
pub struct SeriesArgs {
    /// Maturity in years.
    #[arg(long)]
    pub maturity: Maturity,

    /// First date, inclusive.
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last date, inclusive.
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Render an ASCII chart below the table.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args)]
pub struct RebuildArgs {
    /// Directory holding `*.json` observations, ingested in file-name order.
    #[arg(long, value_name = "DIR")]
    pub input_dir: PathBuf,
}
