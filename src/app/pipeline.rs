//! Shared monitor workflow used by the CLI handlers.
//!
//! ingest -> upsert -> anchor lookup -> compare
//!
//! Functions here return data; printing and exit codes stay in `app`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::compare::Comparator;
use crate::config::MonitorConfig;
use crate::domain::{AnalysisResult, Observation};
use crate::error::{AppError, EXIT_MISSING_DATA, InvalidObservation, StoreError};
use crate::io::ingest::{IngestedObservation, list_observation_files, load_observation};
use crate::store::{self, HistoricalStore, UpsertOutcome};

/// Everything produced by storing and analyzing one observation.
#[derive(Debug)]
pub struct UpdateOutput {
    /// `None` when the record could not be persisted.
    pub outcome: Option<UpsertOutcome>,
    pub analysis: AnalysisResult,
    pub rejected: Vec<InvalidObservation>,
    pub source_file: Option<String>,
    /// The observation belongs to another country than the configured one.
    pub foreign_country: bool,
    /// Set when the record is in memory but the store file was not rewritten.
    pub persist_error: Option<StoreError>,
}

/// Result of `rfr rebuild`.
#[derive(Debug, Default)]
pub struct RebuildOutput {
    pub backup: Option<PathBuf>,
    pub ingested: usize,
    pub failures: Vec<(PathBuf, String)>,
    pub records: usize,
    /// Covered period of the rebuilt store, `None` when it is empty.
    pub period: Option<(NaiveDate, NaiveDate)>,
}

/// Compare `current` against its anchors in `store`.
pub fn analyze_current(
    store: &HistoricalStore,
    comparator: &Comparator,
    config: &MonitorConfig,
    current: &Observation,
) -> AnalysisResult {
    let anchors = store.anchors_for(current, &config.windows);
    let result = comparator.analyze(current, anchors.previous, anchors.year_start);
    for alert in &result.alerts {
        warn!(date = %current.reference_date, country = %current.country, "{alert}");
    }
    result
}

/// Upsert one validated observation, then analyze it.
///
/// A persistence failure does not stop the analysis: the record is already in
/// memory and the caller still gets the report, plus the error to act on.
pub fn run_update(
    store: &mut HistoricalStore,
    config: &MonitorConfig,
    ingested: IngestedObservation,
) -> UpdateOutput {
    let IngestedObservation {
        observation,
        rejected,
        source_file,
    } = ingested;
    let key = observation.key();

    let foreign_country = key.country != config.country;
    if foreign_country {
        warn!(
            date = %key.reference_date,
            country = %key.country,
            configured = %config.country,
            "Observation is for another country than the monitored one; storing it as a separate series"
        );
    }

    let (outcome, persist_error) = match store.upsert(observation.clone()) {
        Ok(outcome) => (Some(outcome), None),
        Err(err) => (None, Some(err)),
    };

    // The stored version may have lost maturities the store has no column for.
    let current = store
        .get(&key.country, key.reference_date)
        .cloned()
        .unwrap_or(observation);

    let comparator = Comparator::new(config.thresholds);
    let analysis = analyze_current(store, &comparator, config, &current);

    UpdateOutput {
        outcome,
        analysis,
        rejected,
        source_file,
        foreign_country,
        persist_error,
    }
}

/// Analyze the stored observation of the configured country at `date`.
pub fn analyze_stored(
    store: &HistoricalStore,
    config: &MonitorConfig,
    date: NaiveDate,
) -> Result<AnalysisResult, AppError> {
    let current = store.get(&config.country, date).ok_or_else(|| {
        AppError::new(
            EXIT_MISSING_DATA,
            format!("No {} observation stored for {date}.", config.country),
        )
    })?;
    let comparator = Comparator::new(config.thresholds);
    Ok(analyze_current(store, &comparator, config, current))
}

/// Back up the store file and rebuild it from every observation in `input_dir`.
///
/// Files that fail to load or validate are collected in `failures`; a store
/// write failure aborts the rebuild.
pub fn rebuild(config: &MonitorConfig, input_dir: &Path) -> Result<RebuildOutput, AppError> {
    let files = list_observation_files(input_dir)?;
    let backup = store::backup(&config.store_path)?;
    let mut store = HistoricalStore::empty(&config.store_path, &config.maturities);

    let mut out = RebuildOutput {
        backup,
        ..RebuildOutput::default()
    };

    for file in files {
        match load_observation(&file, config) {
            Ok(ingested) => {
                store.upsert(ingested.observation)?;
                out.ingested += 1;
            }
            Err(err) => {
                warn!(path = %file.display(), error = %err, "Skipping observation file");
                out.failures.push((file, err.to_string()));
            }
        }
    }

    // Leaves a header-only file when nothing was ingested.
    store.save()?;
    let summary = store.summary();
    out.records = summary.records;
    out.period = summary.first_date.zip(summary.last_date);
    info!(
        path = %store.path().display(),
        records = out.records,
        period = ?out.period,
        failures = out.failures.len(),
        "Rebuilt historical store"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::domain::Direction;
    use crate::error::EXIT_STORE_WRITE;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn config_in(dir: &TempDir) -> MonitorConfig {
        MonitorConfig {
            store_path: dir.path().join("historical.csv"),
            ..MonitorConfig::default()
        }
    }

    fn ingested(obs: Observation) -> IngestedObservation {
        IngestedObservation {
            observation: obs,
            rejected: Vec::new(),
            source_file: None,
        }
    }

    #[test]
    fn end_to_end_month_end_anchor() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let mut store = HistoricalStore::open(&config).unwrap();
        assert!(store.is_empty());

        for (date, rate) in [(d(2024, 1, 31), 0.0280), (d(2024, 2, 29), 0.0290)] {
            let out = run_update(&mut store, &config, ingested(Observation::new(date, "FR").with_rate(1, rate)));
            assert!(out.persist_error.is_none());
        }

        let current = Observation::new(d(2024, 3, 31), "FR").with_rate(1, 0.0350);
        let out = run_update(&mut store, &config, ingested(current));

        assert_eq!(out.outcome, Some(UpsertOutcome::Inserted));
        let analysis = &out.analysis;
        assert_eq!(analysis.previous_date(), Some(d(2024, 2, 29)));
        assert_eq!(analysis.changes_mom.rate(1), Some(60.0));
        assert_eq!(analysis.year_start_date(), None);
        assert_eq!(analysis.alerts.len(), 1);
        assert_eq!(analysis.alerts[0].maturity, 1);
        assert_eq!(analysis.alerts[0].direction, Direction::Increase);

        let reloaded = HistoricalStore::open(&config).unwrap();
        assert_eq!(reloaded.len(), 3);
    }

    #[test]
    fn rerunning_an_update_replaces_and_reports_the_same() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let mut store = HistoricalStore::open(&config).unwrap();
        let obs = Observation::new(d(2024, 3, 29), "FR").with_rate(10, 0.03);

        let first = run_update(&mut store, &config, ingested(obs.clone()));
        let second = run_update(&mut store, &config, ingested(obs));

        assert_eq!(first.outcome, Some(UpsertOutcome::Inserted));
        assert_eq!(second.outcome, Some(UpsertOutcome::Replaced));
        assert_eq!(first.analysis, second.analysis);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn observation_for_another_country_is_flagged() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let mut store = HistoricalStore::open(&config).unwrap();

        let own = run_update(
            &mut store,
            &config,
            ingested(Observation::new(d(2024, 3, 29), "FR").with_rate(1, 0.03)),
        );
        let other = run_update(
            &mut store,
            &config,
            ingested(Observation::new(d(2024, 3, 29), "DE").with_rate(1, 0.025)),
        );

        assert!(!own.foreign_country);
        assert!(other.foreign_country);
        assert_eq!(other.outcome, Some(UpsertOutcome::Inserted));
        assert_eq!(store.query("FR", 1, None, None).iter().count(), 1);
    }

    #[test]
    fn persist_failure_still_yields_analysis() {
        let dir = TempDir::new().unwrap();
        let blocked = dir.path().join("blocked");
        fs::create_dir(&blocked).unwrap();
        let config = MonitorConfig {
            store_path: blocked.clone(),
            ..MonitorConfig::default()
        };
        let mut store = HistoricalStore::empty(&blocked, &config.maturities);

        let out = run_update(
            &mut store,
            &config,
            ingested(Observation::new(d(2024, 3, 29), "FR").with_rate(1, 0.03)),
        );

        assert_eq!(out.outcome, None);
        let err: AppError = out.persist_error.unwrap().into();
        assert_eq!(err.exit_code(), EXIT_STORE_WRITE);
        assert_eq!(out.analysis.current.rate(1), Some(0.03));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn analyze_stored_requires_an_exact_record() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let mut store = HistoricalStore::open(&config).unwrap();
        store
            .upsert(Observation::new(d(2024, 2, 29), "FR").with_rate(5, 0.029))
            .unwrap();

        assert!(analyze_stored(&store, &config, d(2024, 2, 29)).is_ok());
        let err = analyze_stored(&store, &config, d(2024, 2, 28)).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_MISSING_DATA);
    }

    #[test]
    fn rebuild_backs_up_and_skips_bad_files() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::write(&config.store_path, "reference_date,country,rate_1y\n2020-01-31,FR,0.01\n").unwrap();

        let input = dir.path().join("obs");
        fs::create_dir(&input).unwrap();
        fs::write(
            input.join("a.json"),
            r#"{"reference_date":"2024-01-31","country":"France","rates":{"1":0.028}}"#,
        )
        .unwrap();
        fs::write(
            input.join("b.json"),
            r#"{"reference_date":"2024-02-29","country":"FR","rates":{"1":0.029}}"#,
        )
        .unwrap();
        fs::write(input.join("c.json"), "not json").unwrap();

        let out = rebuild(&config, &input).unwrap();
        assert_eq!(out.ingested, 2);
        assert_eq!(out.records, 2);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.period, Some((d(2024, 1, 31), d(2024, 2, 29))));
        assert!(out.backup.as_ref().is_some_and(|p| p.exists()));

        let store = HistoricalStore::open(&config).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get("FR", d(2020, 1, 31)).is_none());
    }
}
