//! Terminal formatting of analyses, store statistics and series tables.

use std::path::Path;

use crate::domain::{AnalysisResult, CurveDeltas, CurveMetadata, Observation, format_bps, format_rate_pct};
use crate::error::InvalidObservation;
use crate::store::{StoreSummary, TimeSeries};

/// Format one analysis: the current curve, both comparisons and the alerts.
pub fn format_analysis(result: &AnalysisResult) -> String {
    let current = &result.current;
    let mut out = String::new();

    out.push_str(&format!(
        "=== rfr - {} curve as of {} ===\n",
        current.country, current.reference_date
    ));
    out.push_str(&format_curve(current));

    out.push('\n');
    out.push_str(&format_comparison(
        "M/M",
        result.mom_anchor,
        result.previous.as_ref(),
        &result.changes_mom,
    ));

    out.push('\n');
    out.push_str(&format_comparison(
        "YTD",
        result.ytd_anchor,
        result.year_start.as_ref(),
        &result.changes_ytd,
    ));

    out.push('\n');
    if result.alerts.is_empty() {
        out.push_str("Alerts: none\n");
    } else {
        out.push_str(&format!("Alerts ({}):\n", result.alerts.len()));
        for alert in &result.alerts {
            out.push_str(&format!("- {alert}\n"));
        }
    }

    out
}

fn format_curve(obs: &Observation) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<8} {:>10}\n", "maturity", "rate"));
    out.push_str(&format!("{:-<8} {:-<10}\n", "", ""));
    for (&m, &rate) in &obs.rates {
        out.push_str(&format!("{:<8} {:>10}\n", format!("{m}Y"), format_rate_pct(rate)));
    }
    if let Some(va) = obs.va {
        out.push_str(&format!("{:<8} {:>10}\n", "VA", format_rate_pct(va)));
    }
    if !obs.metadata.is_empty() {
        out.push_str(&format!("Parameters: {}\n", fmt_metadata(&obs.metadata)));
    }
    out
}

fn format_comparison(
    label: &str,
    anchor: chrono::NaiveDate,
    matched: Option<&Observation>,
    deltas: &CurveDeltas,
) -> String {
    let Some(matched) = matched else {
        return format!("{label}: no observation near {anchor}\n");
    };

    let mut out = format!("{label} vs {} (anchor {anchor}):\n", matched.reference_date);
    if deltas.is_empty() {
        out.push_str("  no common maturities\n");
        return out;
    }
    for (&m, &change) in &deltas.rates {
        out.push_str(&format!("  {:<6} {:>14}\n", format!("{m}Y"), format_bps(change)));
    }
    if let Some(change) = deltas.va {
        out.push_str(&format!("  {:<6} {:>14}\n", "VA", format_bps(change)));
    }
    out
}

fn fmt_metadata(meta: &CurveMetadata) -> String {
    CurveMetadata::COLUMNS
        .iter()
        .zip(meta.values())
        .filter_map(|(name, v)| v.map(|v| format!("{name}={v}")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Values dropped during ingest, one per line.
pub fn format_rejected(rejected: &[InvalidObservation]) -> String {
    let mut out = String::new();
    if rejected.is_empty() {
        return out;
    }
    out.push_str(&format!("Rejected values ({}):\n", rejected.len()));
    for r in rejected {
        out.push_str(&format!("- {r}\n"));
    }
    out
}

/// Store statistics for `rfr stats`.
pub fn format_summary(path: &Path, summary: &StoreSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("Store: {}\n", path.display()));
    out.push_str(&format!("Records: {}\n", summary.records));
    match (summary.first_date, summary.last_date) {
        (Some(first), Some(last)) => out.push_str(&format!("Period: {first} -> {last}\n")),
        _ => out.push_str("Period: (empty)\n"),
    }
    if summary.countries.is_empty() {
        out.push_str("Countries: (none)\n");
    } else {
        out.push_str(&format!("Countries: {}\n", summary.countries.join(", ")));
    }
    out
}

/// Date/rate table for one series, with the move against the prior point.
pub fn format_series(series: &TimeSeries<'_>) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}Y\n", series.country(), series.maturity()));
    out.push_str(&format!("{:<10} {:>10} {:>14}\n", "date", "rate", "change"));
    out.push_str(&format!("{:-<10} {:-<10} {:-<14}\n", "", "", ""));

    let mut prev: Option<f64> = None;
    let mut count = 0usize;
    for point in series {
        let change = prev
            .map(|p| format_bps(crate::compare::bps_change(p, point.rate)))
            .unwrap_or_default();
        out.push_str(
            format!(
                "{:<10} {:>10} {:>14}\n",
                point.date.to_string(),
                format_rate_pct(point.rate),
                change
            )
            .trim_end(),
        );
        out.push('\n');
        prev = Some(point.rate);
        count += 1;
    }
    out.push_str(&format!("Points: {count}\n"));
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::compare::Comparator;
    use crate::store::HistoricalStore;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn analysis_report_golden() {
        let previous = Observation::new(d(2024, 2, 29), "FR")
            .with_rate(1, 0.0290)
            .with_rate(10, 0.0300)
            .with_va(0.0020);
        let mut current = Observation::new(d(2024, 3, 31), "FR")
            .with_rate(1, 0.0350)
            .with_rate(10, 0.0310)
            .with_va(0.0025);
        current.metadata.llp = Some(20.0);
        current.metadata.ufr = Some(3.45);

        let result = Comparator::default().analyze(&current, Some(&previous), None);
        let expected = concat!(
            "=== rfr - FR curve as of 2024-03-31 ===\n",
            "maturity       rate\n",
            "-------- ----------\n",
            "1Y            3.50%\n",
            "10Y           3.10%\n",
            "VA            0.25%\n",
            "Parameters: llp=20 ufr=3.45\n",
            "\n",
            "M/M vs 2024-02-29 (anchor 2024-02-29):\n",
            "  1Y          +60.0 bps\n",
            "  10Y         +10.0 bps\n",
            "  VA           +5.0 bps\n",
            "\n",
            "YTD: no observation near 2024-01-01\n",
            "\n",
            "Alerts (1):\n",
            "- Significant M/M change (1Y): increase of +60.0 bps\n",
        );
        assert_eq!(format_analysis(&result), expected);
    }

    #[test]
    fn summary_of_empty_store() {
        let store = HistoricalStore::empty("h.csv", &[1]);
        let txt = format_summary(store.path(), &store.summary());
        assert_eq!(txt, "Store: h.csv\nRecords: 0\nPeriod: (empty)\nCountries: (none)\n");
    }

    #[test]
    fn series_table_shows_moves() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut store = HistoricalStore::empty(dir.path().join("h.csv"), &[10]);
        store
            .upsert(Observation::new(d(2024, 1, 31), "FR").with_rate(10, 0.0280))
            .unwrap();
        store
            .upsert(Observation::new(d(2024, 2, 29), "FR").with_rate(10, 0.0290))
            .unwrap();

        let txt = format_series(&store.query("FR", 10, None, None));
        let expected = concat!(
            "FR 10Y\n",
            "date             rate         change\n",
            "---------- ---------- --------------\n",
            "2024-01-31      2.80%\n",
            "2024-02-29      2.90%      +10.0 bps\n",
            "Points: 2\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn rejected_values_are_listed() {
        let txt = format_rejected(&[InvalidObservation::UnknownMaturity { maturity: 7 }]);
        assert_eq!(
            txt,
            "Rejected values (1):\n- maturity 7Y is not one of the configured maturities\n"
        );
        assert!(format_rejected(&[]).is_empty());
    }
}
