//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - builds the `MonitorConfig` (defaults, environment, flags)
//! - opens the historical store
//! - dispatches to the command handlers and prints reports

use std::path::Path;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{AnalyzeArgs, Cli, Command, GlobalArgs, RebuildArgs, SeriesArgs, UpdateArgs};
use crate::config::{MonitorConfig, parse_maturity_list};
use crate::error::{AppError, StoreError};
use crate::store::{self, HistoricalStore, SeriesPoint, UpsertOutcome};

pub mod pipeline;

/// Entry point for the `rfr` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let config = config_from_args(MonitorConfig::from_env()?, &cli.global)?;

    match cli.command {
        Command::Update(args) => handle_update(&config, args),
        Command::Analyze(args) => handle_analyze(&config, args),
        Command::Series(args) => handle_series(&config, args),
        Command::Stats => handle_stats(&config),
        Command::Rebuild(args) => handle_rebuild(&config, args),
    }
}

/// Logs go to stderr so stdout carries only the report.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Apply CLI overrides on top of `base`.
pub fn config_from_args(base: MonitorConfig, args: &GlobalArgs) -> Result<MonitorConfig, AppError> {
    let mut config = base;
    if let Some(path) = &args.store {
        config.store_path = path.clone();
    }
    if let Some(country) = &args.country {
        config.country = country.clone();
    }
    if let Some(raw) = &args.maturities {
        config.maturities = parse_maturity_list(raw)?;
    }
    if let Some(bps) = args.mom_threshold {
        config.thresholds.mom_bps = bps;
    }
    if let Some(bps) = args.ytd_threshold {
        config.thresholds.ytd_bps = bps;
    }
    config.validated()
}

/// Open the store; with `recover`, an unreadable file is moved aside and an
/// empty store takes its place.
fn open_store(config: &MonitorConfig, recover: bool) -> Result<HistoricalStore, AppError> {
    match HistoricalStore::open(config) {
        Ok(store) => Ok(store),
        Err(err @ StoreError::Read { .. }) if recover => {
            warn!(error = %err, "Recovering from unreadable store");
            let moved = store::quarantine(&config.store_path)?;
            info!(corrupt = %moved.display(), "Continuing with an empty store");
            Ok(HistoricalStore::empty(&config.store_path, &config.maturities))
        }
        Err(err) => Err(err.into()),
    }
}

fn handle_update(config: &MonitorConfig, args: UpdateArgs) -> Result<(), AppError> {
    let ingested = crate::io::ingest::load_observation(&args.input, config)?;
    let mut store = open_store(config, args.recover)?;

    let out = pipeline::run_update(&mut store, config, ingested);

    if let Some(source) = &out.source_file {
        println!("Source: {source}");
    }
    if out.foreign_country {
        println!(
            "Note: {} is not the monitored country ({}); stored as a separate series",
            out.analysis.current.country, config.country
        );
    }
    match out.outcome {
        Some(UpsertOutcome::Inserted) => println!("Stored new observation in {}", store.path().display()),
        Some(UpsertOutcome::Replaced) => println!("Replaced existing observation in {}", store.path().display()),
        None => {}
    }
    let rejected = crate::report::format_rejected(&out.rejected);
    if !rejected.is_empty() {
        println!("{rejected}");
    }
    println!("{}", crate::report::format_analysis(&out.analysis));

    if let Some(err) = out.persist_error {
        error!(error = %err, "Observation was analyzed but not saved");
        return Err(err.into());
    }
    Ok(())
}

fn handle_analyze(config: &MonitorConfig, args: AnalyzeArgs) -> Result<(), AppError> {
    let store = open_store(config, false)?;
    let analysis = pipeline::analyze_stored(&store, config, args.date)?;
    println!("{}", crate::report::format_analysis(&analysis));
    Ok(())
}

fn handle_series(config: &MonitorConfig, args: SeriesArgs) -> Result<(), AppError> {
    let store = open_store(config, false)?;
    let series = store.query(&config.country, args.maturity, args.from, args.to);

    println!("{}", crate::report::format_series(&series));

    if args.plot {
        let points: Vec<SeriesPoint> = series.iter().collect();
        let plot = crate::plot::render_series_plot(
            &points,
            series.country(),
            series.maturity(),
            args.width,
            args.height,
        );
        println!("{plot}");
    }
    Ok(())
}

fn handle_stats(config: &MonitorConfig) -> Result<(), AppError> {
    let store = open_store(config, false)?;
    println!("{}", crate::report::format_summary(store.path(), &store.summary()));
    Ok(())
}

fn handle_rebuild(config: &MonitorConfig, args: RebuildArgs) -> Result<(), AppError> {
    let out = pipeline::rebuild(config, &args.input_dir)?;

    if let Some(backup) = &out.backup {
        println!("Previous store saved to {}", backup.display());
    }
    println!(
        "Ingested {} file(s) into {} ({} record(s))",
        out.ingested,
        config.store_path.display(),
        out.records
    );
    match out.period {
        Some((first, last)) => println!("Period: {first} -> {last}"),
        None => println!("Period: (empty)"),
    }
    if !out.failures.is_empty() {
        println!("Skipped {} file(s):", out.failures.len());
        for (path, reason) in &out.failures {
            println!("- {}: {reason}", display_name(path));
        }
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;
    use crate::error::{EXIT_INPUT, EXIT_STORE_READ};

    #[test]
    fn flags_override_environment_config() {
        let base = MonitorConfig::from_lookup(|key| match key {
            "RFR_COUNTRY" => Some("DE".to_string()),
            "RFR_MOM_THRESHOLD_BPS" => Some("40".to_string()),
            _ => None,
        })
        .unwrap();
        let args = GlobalArgs {
            store: Some(PathBuf::from("other.csv")),
            country: Some("it".to_string()),
            maturities: Some("30,10,10".to_string()),
            ytd_threshold: Some(75.0),
            ..GlobalArgs::default()
        };

        let config = config_from_args(base, &args).unwrap();
        assert_eq!(config.store_path, PathBuf::from("other.csv"));
        assert_eq!(config.country, "IT");
        assert_eq!(config.maturities, vec![10, 30]);
        assert_eq!(config.thresholds.mom_bps, 40.0);
        assert_eq!(config.thresholds.ytd_bps, 75.0);
    }

    #[test]
    fn country_flag_label_finds_ingested_records() {
        let dir = TempDir::new().unwrap();
        let base = MonitorConfig {
            store_path: dir.path().join("historical.csv"),
            ..MonitorConfig::default()
        };
        let args = GlobalArgs {
            country: Some("France".to_string()),
            ..GlobalArgs::default()
        };
        let config = config_from_args(base, &args).unwrap();
        assert_eq!(config.country, "FR");

        let input = dir.path().join("obs.json");
        fs::write(
            &input,
            r#"{"reference_date":"2024-03-29","country":"France","rates":{"1":0.03}}"#,
        )
        .unwrap();
        let ingested = crate::io::ingest::load_observation(&input, &config).unwrap();
        let mut store = open_store(&config, false).unwrap();
        let out = pipeline::run_update(&mut store, &config, ingested);

        assert!(!out.foreign_country);
        assert_eq!(store.query(&config.country, 1, None, None).iter().count(), 1);
    }

    #[test]
    fn negative_threshold_flag_is_rejected() {
        let args = GlobalArgs {
            mom_threshold: Some(-1.0),
            ..GlobalArgs::default()
        };
        let err = config_from_args(MonitorConfig::default(), &args).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
    }

    #[test]
    fn corrupt_store_aborts_unless_recovering() {
        let dir = TempDir::new().unwrap();
        let config = MonitorConfig {
            store_path: dir.path().join("historical.csv"),
            ..MonitorConfig::default()
        };
        fs::write(&config.store_path, "reference_date,country,rate_1y\nnot-a-date,FR,0.01\n").unwrap();

        let err = open_store(&config, false).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_STORE_READ);
        assert!(config.store_path.exists());

        let store = open_store(&config, true).unwrap();
        assert!(store.is_empty());
        assert!(!config.store_path.exists());
        assert!(dir.path().join("historical.csv.corrupt").exists());
    }
}
