//! Lazy time-series view over the store.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::iter::FusedIterator;
use std::ops::Bound;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{Maturity, Observation, ObservationKey};

/// One `(date, rate)` point of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub rate: f64,
}

/// Rate history for one country and maturity, bounds inclusive.
///
/// Nothing is computed until iteration. The view borrows the store, so every
/// call to [`TimeSeries::iter`] replays the same snapshot from the start, in
/// ascending date order.
#[derive(Debug, Clone)]
pub struct TimeSeries<'a> {
    records: &'a BTreeMap<ObservationKey, Observation>,
    country: String,
    maturity: Maturity,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl<'a> TimeSeries<'a> {
    pub(crate) fn new(
        records: &'a BTreeMap<ObservationKey, Observation>,
        country: &str,
        maturity: Maturity,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Self {
        Self {
            records,
            country: country.to_string(),
            maturity,
            start,
            end,
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn maturity(&self) -> Maturity {
        self.maturity
    }

    pub fn iter(&self) -> SeriesIter<'_> {
        let lower = match self.start {
            // The empty country sorts before every real code on the same date.
            Some(start) => Bound::Included(ObservationKey::new(start, String::new())),
            None => Bound::Unbounded,
        };
        SeriesIter {
            range: self.records.range((lower, Bound::Unbounded)),
            country: &self.country,
            maturity: self.maturity,
            end: self.end,
            done: false,
        }
    }
}

impl<'s> IntoIterator for &'s TimeSeries<'_> {
    type Item = SeriesPoint;
    type IntoIter = SeriesIter<'s>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`TimeSeries::iter`].
#[derive(Debug)]
pub struct SeriesIter<'s> {
    range: btree_map::Range<'s, ObservationKey, Observation>,
    country: &'s str,
    maturity: Maturity,
    end: Option<NaiveDate>,
    done: bool,
}

impl Iterator for SeriesIter<'_> {
    type Item = SeriesPoint;

    fn next(&mut self) -> Option<SeriesPoint> {
        if self.done {
            return None;
        }
        for (key, obs) in self.range.by_ref() {
            if self.end.is_some_and(|end| key.reference_date > end) {
                self.done = true;
                return None;
            }
            if key.country != self.country {
                continue;
            }
            if let Some(rate) = obs.rate(self.maturity) {
                return Some(SeriesPoint {
                    date: key.reference_date,
                    rate,
                });
            }
        }
        self.done = true;
        None
    }
}

impl FusedIterator for SeriesIter<'_> {}
