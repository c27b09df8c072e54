//! Run configuration.
//!
//! A single `MonitorConfig` is built once at process start and passed by
//! reference to the store, the anchor lookup and the comparator. Sources, later
//! overriding earlier:
//!
//! 1. built-in defaults
//! 2. environment variables prefixed with `RFR_` (a `.env` file is honored)
//! 3. CLI flags (applied by `app`)

use std::path::PathBuf;

use crate::anchor::AnchorWindow;
use crate::domain::Maturity;
use crate::domain::country::normalize_country;
use crate::error::{AppError, EXIT_INPUT};

pub const DEFAULT_STORE_PATH: &str = "data/historical.csv";
pub const DEFAULT_COUNTRY: &str = "FR";
pub const DEFAULT_MATURITIES: [Maturity; 5] = [1, 5, 10, 20, 30];

/// Inclusive `[min, max]` bounds for a plausible decimal value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidRange {
    pub min: f64,
    pub max: f64,
}

impl ValidRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && self.min <= value && value <= self.max
    }
}

/// Alert thresholds in basis points. A move alerts when `|Δ| >= threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    pub mom_bps: f64,
    pub ytd_bps: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            mom_bps: 50.0,
            ytd_bps: 100.0,
        }
    }
}

/// Tolerance windows for the two anchor searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorWindows {
    pub mom: AnchorWindow,
    pub ytd: AnchorWindow,
}

impl Default for AnchorWindows {
    fn default() -> Self {
        Self {
            mom: AnchorWindow::days(5),
            ytd: AnchorWindow::days(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub store_path: PathBuf,
    pub country: String,
    /// Sorted, unique, positive.
    pub maturities: Vec<Maturity>,
    pub thresholds: AlertThresholds,
    pub rate_range: ValidRange,
    pub va_range: ValidRange,
    pub windows: AnchorWindows,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            country: DEFAULT_COUNTRY.to_string(),
            maturities: DEFAULT_MATURITIES.to_vec(),
            thresholds: AlertThresholds::default(),
            rate_range: ValidRange::new(-0.05, 0.15),
            va_range: ValidRange::new(0.0, 0.02),
            windows: AnchorWindows::default(),
        }
    }
}

impl MonitorConfig {
    /// Defaults overridden by `RFR_*` variables from the process environment
    /// and an optional `.env` file.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `RFR_*` key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("RFR_STORE_PATH") {
            config.store_path = PathBuf::from(v);
        }
        if let Some(v) = get("RFR_COUNTRY") {
            config.country = v;
        }
        if let Some(v) = get("RFR_MATURITIES") {
            config.maturities = parse_maturity_list(&v)?;
        }
        if let Some(v) = get("RFR_MOM_THRESHOLD_BPS") {
            config.thresholds.mom_bps = parse_f64("RFR_MOM_THRESHOLD_BPS", &v)?;
        }
        if let Some(v) = get("RFR_YTD_THRESHOLD_BPS") {
            config.thresholds.ytd_bps = parse_f64("RFR_YTD_THRESHOLD_BPS", &v)?;
        }
        if let Some(v) = get("RFR_RATE_MIN") {
            config.rate_range.min = parse_f64("RFR_RATE_MIN", &v)?;
        }
        if let Some(v) = get("RFR_RATE_MAX") {
            config.rate_range.max = parse_f64("RFR_RATE_MAX", &v)?;
        }
        if let Some(v) = get("RFR_VA_MIN") {
            config.va_range.min = parse_f64("RFR_VA_MIN", &v)?;
        }
        if let Some(v) = get("RFR_VA_MAX") {
            config.va_range.max = parse_f64("RFR_VA_MAX", &v)?;
        }
        if let Some(v) = get("RFR_MOM_WINDOW_DAYS") {
            config.windows.mom = AnchorWindow::days(parse_u32("RFR_MOM_WINDOW_DAYS", &v)?);
        }
        if let Some(v) = get("RFR_YTD_WINDOW_DAYS") {
            config.windows.ytd = AnchorWindow::days(parse_u32("RFR_YTD_WINDOW_DAYS", &v)?);
        }

        config.validated()
    }

    /// Normalize and check invariants. Call again after applying overrides.
    pub fn validated(mut self) -> Result<Self, AppError> {
        // Same resolution as incoming observations, so lookups hit the stored keys.
        self.country = normalize_country(&self.country);
        if self.country.is_empty() {
            return Err(AppError::new(EXIT_INPUT, "Country code must not be empty."));
        }

        self.maturities.sort_unstable();
        self.maturities.dedup();
        if self.maturities.is_empty() {
            return Err(AppError::new(EXIT_INPUT, "At least one maturity must be configured."));
        }
        if self.maturities.first() == Some(&0) {
            return Err(AppError::new(EXIT_INPUT, "Maturities must be positive years."));
        }

        for (name, v) in [
            ("M/M threshold", self.thresholds.mom_bps),
            ("YTD threshold", self.thresholds.ytd_bps),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(AppError::new(
                    EXIT_INPUT,
                    format!("{name} must be a non-negative number of bps (got {v})."),
                ));
            }
        }

        for (name, r) in [("rate range", self.rate_range), ("VA range", self.va_range)] {
            if !(r.min.is_finite() && r.max.is_finite() && r.min <= r.max) {
                return Err(AppError::new(
                    EXIT_INPUT,
                    format!("Invalid {name}: [{}, {}].", r.min, r.max),
                ));
            }
        }

        Ok(self)
    }
}

/// Parse `"1, 5,10"` into maturities.
pub fn parse_maturity_list(raw: &str) -> Result<Vec<Maturity>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches(['y', 'Y']).parse::<Maturity>().map_err(|e| {
                AppError::new(EXIT_INPUT, format!("Invalid maturity '{s}' in RFR_MATURITIES: {e}"))
            })
        })
        .collect()
}

fn parse_f64(key: &str, raw: &str) -> Result<f64, AppError> {
    raw.parse::<f64>()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Invalid value for {key} ('{raw}'): {e}")))
}

fn parse_u32(key: &str, raw: &str) -> Result<u32, AppError> {
    raw.parse::<u32>()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Invalid value for {key} ('{raw}'): {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_published_monitoring_setup() {
        let config = MonitorConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.country, "FR");
        assert_eq!(config.maturities, vec![1, 5, 10, 20, 30]);
        assert_eq!(config.thresholds.mom_bps, 50.0);
        assert_eq!(config.thresholds.ytd_bps, 100.0);
        assert_eq!(config.windows.mom, AnchorWindow::days(5));
        assert_eq!(config.windows.ytd, AnchorWindow::days(10));
        assert!(config.rate_range.contains(-0.05));
        assert!(!config.rate_range.contains(0.1501));
        assert!(config.va_range.contains(0.0));
    }

    #[test]
    fn environment_overrides_are_applied_and_normalized() {
        let config = MonitorConfig::from_lookup(lookup_from(&[
            ("RFR_COUNTRY", " de "),
            ("RFR_MATURITIES", "30, 10y,1,10"),
            ("RFR_MOM_THRESHOLD_BPS", "25"),
            ("RFR_YTD_WINDOW_DAYS", "7"),
            ("RFR_STORE_PATH", "/tmp/h.csv"),
        ]))
        .unwrap();
        assert_eq!(config.country, "DE");
        assert_eq!(config.maturities, vec![1, 10, 30]);
        assert_eq!(config.thresholds.mom_bps, 25.0);
        assert_eq!(config.windows.ytd, AnchorWindow::days(7));
        assert_eq!(config.store_path, PathBuf::from("/tmp/h.csv"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = MonitorConfig::from_lookup(lookup_from(&[("RFR_MATURITIES", "1,x")])).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);

        let err = MonitorConfig::from_lookup(lookup_from(&[("RFR_MATURITIES", "0,5")])).unwrap_err();
        assert!(err.to_string().contains("positive"));

        let err = MonitorConfig::from_lookup(lookup_from(&[("RFR_RATE_MIN", "0.2")])).unwrap_err();
        assert!(err.to_string().contains("rate range"));

        let err = MonitorConfig::from_lookup(lookup_from(&[("RFR_YTD_THRESHOLD_BPS", "-1")])).unwrap_err();
        assert!(err.to_string().contains("YTD threshold"));
    }

    #[test]
    fn country_label_resolves_to_stored_code() {
        let config = MonitorConfig::from_lookup(lookup_from(&[("RFR_COUNTRY", "France")])).unwrap();
        assert_eq!(config.country, "FR");

        let config = MonitorConfig::from_lookup(lookup_from(&[("RFR_COUNTRY", " pt ")])).unwrap();
        assert_eq!(config.country, "PT");
    }
}
