//! CSV table backing the historical store.
//!
//! One row per observation:
//!
//! `reference_date,country,rate_1y,...,rate_30y,va,llp,alpha,ufr,cra,convergence,coupon_freq`
//!
//! The rate columns are fixed when the file is first created. Absent values are
//! empty cells. Numbers are written with Rust's shortest round-trip formatting
//! so a reload yields bit-identical `f64`s.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::domain::{CurveMetadata, Maturity, Observation};
use crate::error::StoreError;

const COL_DATE: &str = "reference_date";
const COL_COUNTRY: &str = "country";
const COL_VA: &str = "va";

/// Column layout of a store file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    maturities: Vec<Maturity>,
}

impl TableSchema {
    pub fn new(maturities: &[Maturity]) -> Self {
        let mut maturities = maturities.to_vec();
        maturities.sort_unstable();
        maturities.dedup();
        Self { maturities }
    }

    pub fn maturities(&self) -> &[Maturity] {
        &self.maturities
    }

    pub fn contains(&self, maturity: Maturity) -> bool {
        self.maturities.binary_search(&maturity).is_ok()
    }

    pub fn header(&self) -> Vec<String> {
        let mut cols = vec![COL_DATE.to_string(), COL_COUNTRY.to_string()];
        cols.extend(self.maturities.iter().map(|&m| rate_column(m)));
        cols.push(COL_VA.to_string());
        cols.extend(CurveMetadata::COLUMNS.iter().map(|c| c.to_string()));
        cols
    }
}

/// Column name for a maturity, e.g. `rate_10y`.
pub fn rate_column(maturity: Maturity) -> String {
    format!("rate_{maturity}y")
}

fn parse_rate_column(name: &str) -> Option<Maturity> {
    name.strip_prefix("rate_")?.strip_suffix('y')?.parse().ok()
}

/// Read every row of a store file.
///
/// Any unreadable row fails the whole load: a half-loaded history would make
/// the next rewrite silently drop data.
pub fn read_table(path: &Path) -> Result<(TableSchema, Vec<Observation>), StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| StoreError::read(path, format!("cannot open: {e}")))?;

    let headers = reader
        .headers()
        .map_err(|e| StoreError::read(path, format!("cannot read header: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for required in [COL_DATE, COL_COUNTRY] {
        if !header_map.contains_key(required) {
            return Err(StoreError::read(path, format!("missing required column `{required}`")));
        }
    }

    let mut rate_columns: Vec<(Maturity, usize)> = header_map
        .iter()
        .filter_map(|(name, &idx)| parse_rate_column(name).map(|m| (m, idx)))
        .collect();
    rate_columns.sort_unstable();
    let schema = TableSchema::new(&rate_columns.iter().map(|(m, _)| *m).collect::<Vec<_>>());

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record = result.map_err(|e| StoreError::read(path, format!("line {line}: {e}")))?;
        let row = parse_row(&record, &header_map, &rate_columns)
            .map_err(|msg| StoreError::read(path, format!("line {line}: {msg}")))?;
        rows.push(row);
    }

    Ok((schema, rows))
}

/// Rewrite the whole store file.
///
/// Rows go to a sibling `.tmp` file which is then renamed over `path`, so an
/// interrupted write leaves the previous file untouched.
pub fn write_table<'a, I>(path: &Path, schema: &TableSchema, rows: I) -> Result<(), StoreError>
where
    I: IntoIterator<Item = &'a Observation>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| StoreError::write(path, format!("cannot create directory '{}': {e}", parent.display())))?;
    }

    let tmp = temp_path(path);
    let result = write_rows(&tmp, schema, rows).and_then(|()| {
        fs::rename(&tmp, path).map_err(|e| format!("cannot replace file: {e}"))
    });

    if let Err(message) = result {
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::write(path, message));
    }
    Ok(())
}

fn write_rows<'a, I>(tmp: &Path, schema: &TableSchema, rows: I) -> Result<(), String>
where
    I: IntoIterator<Item = &'a Observation>,
{
    let file = File::create(tmp).map_err(|e| format!("cannot create '{}': {e}", tmp.display()))?;
    let mut writer = csv::Writer::from_writer(file);

    writer
        .write_record(schema.header())
        .map_err(|e| format!("cannot write header: {e}"))?;

    for obs in rows {
        let mut fields = Vec::with_capacity(schema.maturities.len() + 9);
        fields.push(obs.reference_date.format("%Y-%m-%d").to_string());
        fields.push(obs.country.clone());
        for &m in &schema.maturities {
            fields.push(fmt_cell(obs.rate(m)));
        }
        fields.push(fmt_cell(obs.va));
        fields.extend(obs.metadata.values().into_iter().map(fmt_cell));
        writer
            .write_record(&fields)
            .map_err(|e| format!("cannot write row for {}: {e}", obs.reference_date))?;
    }

    let file = writer
        .into_inner()
        .map_err(|e| format!("cannot flush rows: {e}"))?;
    file.sync_all().map_err(|e| format!("cannot sync file: {e}"))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet tools re-saving the file may add a UTF-8 BOM to the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    rate_columns: &[(Maturity, usize)],
) -> Result<Observation, String> {
    let date_raw = get_optional(record, header_map.get(COL_DATE).copied())
        .ok_or_else(|| format!("missing `{COL_DATE}` value"))?;
    let reference_date = parse_date(date_raw)?;

    let country = get_optional(record, header_map.get(COL_COUNTRY).copied())
        .ok_or_else(|| format!("missing `{COL_COUNTRY}` value"))?
        .to_string();

    let mut obs = Observation::new(reference_date, country);
    for &(maturity, idx) in rate_columns {
        if let Some(rate) = parse_cell(get_optional(record, Some(idx)), &rate_column(maturity))? {
            obs.rates.insert(maturity, rate);
        }
    }

    obs.va = parse_cell(get_optional(record, header_map.get(COL_VA).copied()), COL_VA)?;

    let mut meta = [None; 6];
    for (slot, name) in meta.iter_mut().zip(CurveMetadata::COLUMNS) {
        *slot = parse_cell(get_optional(record, header_map.get(name).copied()), name)?;
    }
    obs.metadata = CurveMetadata::from_values(meta);

    Ok(obs)
}

fn get_optional(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    record.get(idx?).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    // Timestamps written by older tooling ("2024-01-31 00:00:00").
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date())
        .map_err(|_| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

/// Empty and `NaN` cells are absent values; anything else must be a number.
fn parse_cell(s: Option<&str>, column: &str) -> Result<Option<f64>, String> {
    let Some(s) = s else {
        return Ok(None);
    };
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("invalid number '{s}' in `{column}`"))?;
    Ok(v.is_finite().then_some(v))
}

fn fmt_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
