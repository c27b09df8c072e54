//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - handed over by the extractor as JSON
//! - stored as rows of the historical CSV table
//! - compared and rendered without any further conversion

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Tenor in whole years at which a spot rate is quoted (e.g. `10` for 10Y).
pub type Maturity = u32;

/// Basis points per unit of decimal rate (`0.0001` = 1bp).
pub const BPS_PER_UNIT: f64 = 10_000.0;

/// Identity of a stored observation.
///
/// Field order matters: the derived `Ord` sorts by date first, which is what
/// keeps the store iterating in ascending date order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservationKey {
    pub reference_date: NaiveDate,
    pub country: String,
}

impl ObservationKey {
    pub fn new(reference_date: NaiveDate, country: impl Into<String>) -> Self {
        Self {
            reference_date,
            country: country.into(),
        }
    }
}

/// Descriptive curve parameters published next to the rates.
///
/// Carried through to storage but never interpreted by the comparison logic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveMetadata {
    /// Last liquid point (years).
    #[serde(default)]
    pub llp: Option<f64>,
    /// Smith-Wilson convergence speed.
    #[serde(default)]
    pub alpha: Option<f64>,
    /// Ultimate forward rate (percent, as published).
    #[serde(default)]
    pub ufr: Option<f64>,
    /// Credit risk adjustment (bps, as published).
    #[serde(default)]
    pub cra: Option<f64>,
    /// Convergence period (years).
    #[serde(default)]
    pub convergence: Option<f64>,
    #[serde(default)]
    pub coupon_freq: Option<f64>,
}

impl CurveMetadata {
    /// Column names in storage order.
    pub const COLUMNS: [&'static str; 6] = ["llp", "alpha", "ufr", "cra", "convergence", "coupon_freq"];

    /// Values in the same order as [`CurveMetadata::COLUMNS`].
    pub fn values(&self) -> [Option<f64>; 6] {
        [
            self.llp,
            self.alpha,
            self.ufr,
            self.cra,
            self.convergence,
            self.coupon_freq,
        ]
    }

    pub fn from_values(values: [Option<f64>; 6]) -> Self {
        let [llp, alpha, ufr, cra, convergence, coupon_freq] = values;
        Self {
            llp,
            alpha,
            ufr,
            cra,
            convergence,
            coupon_freq,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values().iter().all(Option::is_none)
    }
}

/// One normalized publication of a country's curve.
///
/// A maturity missing from `rates` means "not published", never zero; the same
/// holds for `va`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub reference_date: NaiveDate,
    pub country: String,
    pub rates: BTreeMap<Maturity, f64>,
    #[serde(default)]
    pub va: Option<f64>,
    #[serde(default)]
    pub metadata: CurveMetadata,
}

impl Observation {
    pub fn new(reference_date: NaiveDate, country: impl Into<String>) -> Self {
        Self {
            reference_date,
            country: country.into(),
            rates: BTreeMap::new(),
            va: None,
            metadata: CurveMetadata::default(),
        }
    }

    pub fn with_rate(mut self, maturity: Maturity, rate: f64) -> Self {
        self.rates.insert(maturity, rate);
        self
    }

    pub fn with_va(mut self, va: f64) -> Self {
        self.va = Some(va);
        self
    }

    pub fn key(&self) -> ObservationKey {
        ObservationKey::new(self.reference_date, self.country.clone())
    }

    pub fn rate(&self, maturity: Maturity) -> Option<f64> {
        self.rates.get(&maturity).copied()
    }
}

/// Which comparison a delta or alert belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonPeriod {
    /// Against the observation closest to the previous month-end.
    MonthOverMonth,
    /// Against the observation closest to January 1.
    YearToDate,
}

impl ComparisonPeriod {
    pub fn label(self) -> &'static str {
        match self {
            ComparisonPeriod::MonthOverMonth => "M/M",
            ComparisonPeriod::YearToDate => "YTD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    pub fn of(change_bps: f64) -> Self {
        if change_bps > 0.0 {
            Direction::Increase
        } else {
            Direction::Decrease
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Increase => "increase",
            Direction::Decrease => "decrease",
        }
    }
}

/// Basis-point changes between the current observation and one anchor.
///
/// Only maturities present on both sides get an entry; the VA change is kept
/// apart from the rate maturities because it is not alert-eligible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveDeltas {
    pub rates: BTreeMap<Maturity, f64>,
    pub va: Option<f64>,
}

impl CurveDeltas {
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty() && self.va.is_none()
    }

    pub fn rate(&self, maturity: Maturity) -> Option<f64> {
        self.rates.get(&maturity).copied()
    }
}

/// A rate move that crossed its period's threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub period: ComparisonPeriod,
    pub maturity: Maturity,
    pub change_bps: f64,
    pub direction: Direction,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Significant {} change ({}Y): {} of {}",
            self.period.label(),
            self.maturity,
            self.direction.as_str(),
            format_bps(self.change_bps)
        )
    }
}

/// Output of one comparison run. Derived and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub current: Observation,
    /// Target date of the month-over-month search (previous month-end).
    pub mom_anchor: NaiveDate,
    /// Target date of the year-to-date search (January 1).
    pub ytd_anchor: NaiveDate,
    pub previous: Option<Observation>,
    pub year_start: Option<Observation>,
    pub changes_mom: CurveDeltas,
    pub changes_ytd: CurveDeltas,
    pub alerts: Vec<Alert>,
}

impl AnalysisResult {
    /// Date of the observation actually used for the M/M comparison.
    pub fn previous_date(&self) -> Option<NaiveDate> {
        self.previous.as_ref().map(|o| o.reference_date)
    }

    /// Date of the observation actually used for the YTD comparison.
    pub fn year_start_date(&self) -> Option<NaiveDate> {
        self.year_start.as_ref().map(|o| o.reference_date)
    }

    pub fn alert_messages(&self) -> Vec<String> {
        self.alerts.iter().map(ToString::to_string).collect()
    }
}

/// Signed basis points with one decimal, e.g. `+15.0 bps`.
pub fn format_bps(bps: f64) -> String {
    let sign = if bps >= 0.0 { "+" } else { "" };
    format!("{sign}{bps:.1} bps")
}

/// Decimal rate as a percentage with two decimals, e.g. `2.85%`.
pub fn format_rate_pct(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn keys_order_by_date_before_country() {
        let a = ObservationKey::new(d(2024, 1, 31), "FR");
        let b = ObservationKey::new(d(2024, 2, 1), "DE");
        assert!(a < b);
    }

    #[test]
    fn alert_message_mentions_direction_and_maturity() {
        let alert = Alert {
            period: ComparisonPeriod::MonthOverMonth,
            maturity: 10,
            change_bps: -62.5,
            direction: Direction::of(-62.5),
        };
        assert_eq!(alert.to_string(), "Significant M/M change (10Y): decrease of -62.5 bps");
    }

    #[test]
    fn formatting_helpers() {
        assert_eq!(format_bps(15.0), "+15.0 bps");
        assert_eq!(format_bps(-10.04), "-10.0 bps");
        assert_eq!(format_rate_pct(0.0285), "2.85%");
    }

    #[test]
    fn observation_deserializes_integer_maturity_keys() {
        let json = r#"{"reference_date":"2024-03-31","country":"FR","rates":{"1":0.035,"10":0.031}}"#;
        let obs: Observation = serde_json::from_str(json).unwrap();
        assert_eq!(obs.rate(1), Some(0.035));
        assert_eq!(obs.rate(10), Some(0.031));
        assert_eq!(obs.va, None);
        assert!(obs.metadata.is_empty());
    }
}
