//! Period comparisons and threshold alerts.
//!
//! `Comparator::analyze` is a pure function of the current observation, the two
//! optional anchor observations and the configured thresholds. It never reads
//! or mutates the store; anchor resolution happens before (`HistoricalStore::anchors_for`).

use std::collections::BTreeMap;

use crate::anchor::{previous_month_end, year_start};
use crate::config::AlertThresholds;
use crate::domain::{
    Alert, AnalysisResult, BPS_PER_UNIT, ComparisonPeriod, CurveDeltas, Direction, Maturity, Observation,
};

/// Deltas are kept to a millionth of a basis point; anything finer is
/// binary floating-point noise from the subtraction.
const BPS_PRECISION: f64 = 1e6;

/// Change from `anchor` to `current` in basis points.
pub fn bps_change(anchor: f64, current: f64) -> f64 {
    ((current - anchor) * BPS_PER_UNIT * BPS_PRECISION).round() / BPS_PRECISION
}

/// Per-maturity deltas for maturities quoted on both sides, plus the VA delta
/// when both sides carry one.
pub fn curve_deltas(current: &Observation, anchor: &Observation) -> CurveDeltas {
    let rates: BTreeMap<Maturity, f64> = current
        .rates
        .iter()
        .filter_map(|(&m, &rate)| anchor.rate(m).map(|prev| (m, bps_change(prev, rate))))
        .collect();

    let va = match (anchor.va, current.va) {
        (Some(prev), Some(cur)) => Some(bps_change(prev, cur)),
        _ => None,
    };

    CurveDeltas { rates, va }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Comparator {
    thresholds: AlertThresholds,
}

impl Comparator {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> AlertThresholds {
        self.thresholds
    }

    pub fn analyze(
        &self,
        current: &Observation,
        previous: Option<&Observation>,
        year_start_obs: Option<&Observation>,
    ) -> AnalysisResult {
        let changes_mom = previous.map(|p| curve_deltas(current, p)).unwrap_or_default();
        let changes_ytd = year_start_obs.map(|y| curve_deltas(current, y)).unwrap_or_default();

        let mut alerts = scan(ComparisonPeriod::MonthOverMonth, &changes_mom, self.thresholds.mom_bps);
        alerts.extend(scan(ComparisonPeriod::YearToDate, &changes_ytd, self.thresholds.ytd_bps));

        AnalysisResult {
            current: current.clone(),
            mom_anchor: previous_month_end(current.reference_date),
            ytd_anchor: year_start(current.reference_date),
            previous: previous.cloned(),
            year_start: year_start_obs.cloned(),
            changes_mom,
            changes_ytd,
            alerts,
        }
    }
}

/// Rate maturities whose move reaches `threshold_bps`, ascending by maturity.
/// The VA delta is not scanned.
fn scan(period: ComparisonPeriod, deltas: &CurveDeltas, threshold_bps: f64) -> Vec<Alert> {
    deltas
        .rates
        .iter()
        .filter(|(_, change)| change.abs() >= threshold_bps)
        .map(|(&maturity, &change_bps)| Alert {
            period,
            maturity,
            change_bps,
            direction: Direction::of(change_bps),
        })
        .collect()
}
