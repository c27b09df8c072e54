//! Extractor hand-off: JSON observation documents.
//!
//! The extractor (download, archive and spreadsheet handling) lives outside this
//! crate. What it hands over is one JSON document per publication:
//!
//! ```json
//! { "reference_date": "2024-03-31", "country": "France",
//!   "rates": { "1": 0.035, "10": 0.031, "20": null }, "va": 0.0021,
//!   "metadata": { "llp": 20, "ufr": 3.45 }, "source_file": "EIOPA_RFR_20240331.zip" }
//! ```
//!
//! Ingest turns that into a validated `Observation`:
//! - the country is resolved through the country table
//! - `null` rates are "not published" and simply absent
//! - out-of-range values are dropped individually (`InvalidObservation`), the
//!   rest of the record proceeds

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::MonitorConfig;
use crate::domain::country::normalize_country;
use crate::domain::{CurveMetadata, Maturity, Observation};
use crate::error::{AppError, EXIT_INPUT, EXIT_MISSING_DATA, InvalidObservation};

/// Raw extractor document, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedObservation {
    pub reference_date: NaiveDate,
    pub country: String,
    #[serde(default)]
    pub rates: BTreeMap<Maturity, Option<f64>>,
    #[serde(default)]
    pub va: Option<f64>,
    #[serde(default)]
    pub metadata: CurveMetadata,
    #[serde(default)]
    pub source_file: Option<String>,
}

/// A validated observation plus what was dropped on the way.
#[derive(Debug, Clone)]
pub struct IngestedObservation {
    pub observation: Observation,
    pub rejected: Vec<InvalidObservation>,
    pub source_file: Option<String>,
}

/// Read and validate one extractor document.
pub fn load_observation(path: &Path, config: &MonitorConfig) -> Result<IngestedObservation, AppError> {
    let extracted = read_observation_json(path)?;
    let ingested = validate(extracted, config)?;
    debug!(
        path = %path.display(),
        date = %ingested.observation.reference_date,
        rates = ingested.observation.rates.len(),
        rejected = ingested.rejected.len(),
        "Ingested observation"
    );
    Ok(ingested)
}

pub fn read_observation_json(path: &Path) -> Result<ExtractedObservation, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to open observation '{}': {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Invalid observation JSON '{}': {e}", path.display())))
}

/// Apply field-level validation against the configured ranges and maturities.
///
/// Fails only when no rate survives, since such a record has nothing to compare.
pub fn validate(extracted: ExtractedObservation, config: &MonitorConfig) -> Result<IngestedObservation, AppError> {
    let mut observation = Observation::new(extracted.reference_date, normalize_country(&extracted.country));
    observation.metadata = extracted.metadata;
    let mut rejected = Vec::new();

    for (maturity, rate) in extracted.rates {
        let Some(rate) = rate else {
            continue;
        };
        if config.maturities.binary_search(&maturity).is_err() {
            rejected.push(InvalidObservation::UnknownMaturity { maturity });
            continue;
        }
        if !config.rate_range.contains(rate) {
            rejected.push(InvalidObservation::RateOutOfRange {
                maturity,
                rate,
                min: config.rate_range.min,
                max: config.rate_range.max,
            });
            continue;
        }
        observation.rates.insert(maturity, rate);
    }

    if let Some(va) = extracted.va {
        if config.va_range.contains(va) {
            observation.va = Some(va);
        } else {
            rejected.push(InvalidObservation::VaOutOfRange {
                va,
                min: config.va_range.min,
                max: config.va_range.max,
            });
        }
    }

    for problem in &rejected {
        warn!(
            date = %observation.reference_date,
            country = %observation.country,
            "Rejected value: {problem}"
        );
    }

    if observation.rates.is_empty() {
        return Err(AppError::new(
            EXIT_MISSING_DATA,
            format!(
                "No valid rate in observation for {} {}.",
                observation.country, observation.reference_date
            ),
        ));
    }

    Ok(IngestedObservation {
        observation,
        rejected,
        source_file: extracted.source_file,
    })
}

/// `*.json` files of `dir`, sorted by file name.
pub fn list_observation_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to read directory '{}': {e}", dir.display())))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to list '{}': {e}", dir.display())))?;
        let path = entry.path();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
