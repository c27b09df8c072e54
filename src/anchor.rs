//! Anchor dates for the period comparisons.
//!
//! Two pure date functions give the *target* of each comparison, and
//! `closest_match` turns a target into an actual observation date: publications
//! are not guaranteed on the exact anchor (holidays, irregular releases), so any
//! date within a tolerance window is accepted and the nearest one wins.

use chrono::{Datelike, Days, NaiveDate};

/// Symmetric tolerance around an anchor date, in calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorWindow {
    pub tolerance_days: u32,
}

impl AnchorWindow {
    pub const fn days(tolerance_days: u32) -> Self {
        Self { tolerance_days }
    }

    /// Inclusive `[anchor - tolerance, anchor + tolerance]`, saturating at the
    /// calendar limits.
    pub fn bounds(&self, anchor: NaiveDate) -> (NaiveDate, NaiveDate) {
        let days = Days::new(u64::from(self.tolerance_days));
        let lo = anchor.checked_sub_days(days).unwrap_or(NaiveDate::MIN);
        let hi = anchor.checked_add_days(days).unwrap_or(NaiveDate::MAX);
        (lo, hi)
    }

    pub fn contains(&self, anchor: NaiveDate, date: NaiveDate) -> bool {
        day_distance(anchor, date) <= i64::from(self.tolerance_days)
    }
}

/// Last day of the month preceding `ref_date`'s month.
pub fn previous_month_end(ref_date: NaiveDate) -> NaiveDate {
    let first_of_month = ref_date.with_day(1).unwrap_or(ref_date);
    first_of_month.pred_opt().unwrap_or(first_of_month)
}

/// January 1 of `ref_date`'s year.
pub fn year_start(ref_date: NaiveDate) -> NaiveDate {
    ref_date.with_ordinal(1).unwrap_or(ref_date)
}

/// Absolute distance in days.
pub fn day_distance(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}

/// Pick the candidate closest to `anchor` within `window`.
///
/// Candidates outside the window are ignored. Equal distances resolve to the
/// earliest date, independent of iteration order.
pub fn closest_match<T, I>(anchor: NaiveDate, window: AnchorWindow, candidates: I) -> Option<(NaiveDate, T)>
where
    I: IntoIterator<Item = (NaiveDate, T)>,
{
    candidates
        .into_iter()
        .filter(|(date, _)| window.contains(anchor, *date))
        .min_by_key(|(date, _)| (day_distance(anchor, *date), *date))
}
