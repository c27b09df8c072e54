//! Historical store: one observation per `(reference_date, country)`.
//!
//! In memory the store is a key-ordered map, so iteration is always in ascending
//! date order and upserts are plain key replacements. The CSV table (`table`)
//! is only touched at load time and after each mutation, when the whole file
//! is rewritten.
//!
//! Persistence is not transactional: if a rewrite fails the in-memory mutation
//! stays applied and the caller gets `StoreError::Write`. Re-running the upsert
//! is the way to retry.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::ops::Bound;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::anchor::{self, AnchorWindow, closest_match};
use crate::config::{AnchorWindows, MonitorConfig};
use crate::domain::{Maturity, Observation, ObservationKey};
use crate::error::StoreError;

pub mod series;
pub mod table;

pub use series::{SeriesIter, SeriesPoint, TimeSeries};
pub use table::TableSchema;

/// Whether an upsert created a new key or replaced an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// Comparison anchors resolved for one observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anchors<'a> {
    pub previous: Option<&'a Observation>,
    pub year_start: Option<&'a Observation>,
}

/// Overview of the store contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    pub records: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub countries: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HistoricalStore {
    path: PathBuf,
    schema: TableSchema,
    records: BTreeMap<ObservationKey, Observation>,
}

impl HistoricalStore {
    /// Empty store that will create `path` on the first upsert.
    pub fn empty(path: impl Into<PathBuf>, maturities: &[Maturity]) -> Self {
        Self {
            path: path.into(),
            schema: TableSchema::new(maturities),
            records: BTreeMap::new(),
        }
    }

    /// Load the store at `path`.
    ///
    /// A missing file is not an error: it yields an empty store whose columns
    /// come from `maturities`. An existing file keeps the columns it was created
    /// with.
    pub fn load(path: impl Into<PathBuf>, maturities: &[Maturity]) -> Result<Self, StoreError> {
        let path = path.into();
        if !path.exists() {
            info!(path = %path.display(), "No historical store found, starting empty");
            return Ok(Self::empty(path, maturities));
        }

        let (schema, rows) = table::read_table(&path).inspect_err(|err| {
            error!(error = %err, "Historical store is unreadable");
        })?;
        if schema.maturities() != maturities {
            warn!(
                path = %path.display(),
                stored = ?schema.maturities(),
                configured = ?maturities,
                "Store columns differ from configured maturities; keeping stored columns"
            );
        }

        let mut records = BTreeMap::new();
        for row in rows {
            let key = row.key();
            if records.insert(key.clone(), row).is_some() {
                warn!(
                    date = %key.reference_date,
                    country = %key.country,
                    "Duplicate row in historical store, keeping the last one"
                );
            }
        }

        info!(path = %path.display(), records = records.len(), "Loaded historical store");
        Ok(Self {
            path,
            schema,
            records,
        })
    }

    /// Load using the configured path and maturities.
    pub fn open(config: &MonitorConfig) -> Result<Self, StoreError> {
        Self::load(&config.store_path, &config.maturities)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn maturities(&self) -> &[Maturity] {
        self.schema.maturities()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in ascending date order.
    pub fn records(&self) -> impl Iterator<Item = &Observation> {
        self.records.values()
    }

    /// Insert or fully replace the record for `record.key()`, then rewrite the file.
    ///
    /// Replacement is total: fields absent from `record` end up absent in the
    /// store. Rates for maturities outside the store columns are dropped.
    pub fn upsert(&mut self, record: Observation) -> Result<UpsertOutcome, StoreError> {
        let key = record.key();
        let outcome = self.apply(record);
        info!(
            date = %key.reference_date,
            country = %key.country,
            outcome = ?outcome,
            "Upserted observation"
        );

        if let Err(err) = self.save() {
            warn!(error = %err, "Observation kept in memory but not persisted");
            return Err(err);
        }
        Ok(outcome)
    }

    fn apply(&mut self, mut record: Observation) -> UpsertOutcome {
        let schema = &self.schema;
        record.rates.retain(|&maturity, _| {
            let keep = schema.contains(maturity);
            if !keep {
                warn!(maturity, "Maturity has no column in the store, value dropped");
            }
            keep
        });

        match self.records.insert(record.key(), record) {
            Some(_) => UpsertOutcome::Replaced,
            None => UpsertOutcome::Inserted,
        }
    }

    /// Rewrite the backing file from memory.
    pub fn save(&self) -> Result<(), StoreError> {
        table::write_table(&self.path, &self.schema, self.records.values())?;
        debug!(path = %self.path.display(), records = self.records.len(), "Saved historical store");
        Ok(())
    }

    /// Exact lookup; no date tolerance.
    pub fn get(&self, country: &str, date: NaiveDate) -> Option<&Observation> {
        self.records.get(&ObservationKey::new(date, country))
    }

    /// Rates of one maturity over an optional inclusive date range.
    pub fn query(
        &self,
        country: &str,
        maturity: Maturity,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> TimeSeries<'_> {
        TimeSeries::new(&self.records, country, maturity, start, end)
    }

    /// Closest record of `country` within `window` of `anchor`.
    ///
    /// `None` means no comparison is available for that period.
    pub fn resolve_anchor(&self, country: &str, anchor: NaiveDate, window: AnchorWindow) -> Option<&Observation> {
        self.closest(country, anchor, window, None)
    }

    /// Previous month-end and year-start anchors for `current`.
    ///
    /// `current`'s own date never resolves as its own anchor.
    pub fn anchors_for(&self, current: &Observation, windows: &AnchorWindows) -> Anchors<'_> {
        let date = current.reference_date;
        let country = current.country.as_str();

        let mom_target = anchor::previous_month_end(date);
        let previous = self.closest(country, mom_target, windows.mom, Some(date));
        if previous.is_none() {
            warn!(
                %date,
                country,
                anchor = %mom_target,
                tolerance_days = windows.mom.tolerance_days,
                "No observation near previous month-end"
            );
        }

        let ytd_target = anchor::year_start(date);
        let year_start = self.closest(country, ytd_target, windows.ytd, Some(date));
        if year_start.is_none() {
            warn!(
                %date,
                country,
                anchor = %ytd_target,
                tolerance_days = windows.ytd.tolerance_days,
                "No observation near year start"
            );
        }

        Anchors { previous, year_start }
    }

    fn closest(
        &self,
        country: &str,
        anchor: NaiveDate,
        window: AnchorWindow,
        skip: Option<NaiveDate>,
    ) -> Option<&Observation> {
        let (lo, hi) = window.bounds(anchor);
        let lower = Bound::Included(ObservationKey::new(lo, String::new()));
        let candidates = self
            .records
            .range((lower, Bound::Unbounded))
            .take_while(|(key, _)| key.reference_date <= hi)
            .filter(|(key, _)| key.country == country && Some(key.reference_date) != skip)
            .map(|(key, obs)| (key.reference_date, obs));

        closest_match(anchor, window, candidates).map(|(_, obs)| obs)
    }

    pub fn summary(&self) -> StoreSummary {
        let countries: BTreeSet<&str> = self.records.keys().map(|k| k.country.as_str()).collect();
        StoreSummary {
            records: self.records.len(),
            first_date: self.records.keys().next().map(|k| k.reference_date),
            last_date: self.records.keys().next_back().map(|k| k.reference_date),
            countries: countries.into_iter().map(str::to_string).collect(),
        }
    }
}

/// Move an unreadable store file aside to `<file>.corrupt` so a fresh store
/// can be written without destroying it.
pub fn quarantine(path: &Path) -> Result<PathBuf, StoreError> {
    let target = sibling_with_suffix(path, "corrupt");
    fs::rename(path, &target)
        .map_err(|e| StoreError::write(path, format!("cannot move aside to '{}': {e}", target.display())))?;
    warn!(from = %path.display(), to = %target.display(), "Moved unreadable store aside");
    Ok(target)
}

/// Move the store file to `<file>.backup`, replacing an older backup.
///
/// Returns `None` when there is no store file yet.
pub fn backup(path: &Path) -> Result<Option<PathBuf>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let target = sibling_with_suffix(path, "backup");
    fs::rename(path, &target)
        .map_err(|e| StoreError::write(path, format!("cannot back up to '{}': {e}", target.display())))?;
    info!(from = %path.display(), to = %target.display(), "Backed up historical store");
    Ok(Some(target))
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
