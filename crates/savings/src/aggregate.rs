//! Pure derivation of the savings dashboard from a monthly series.
//!
//! Every function here is synchronous, deterministic, and fail-soft: malformed
//! input degrades to `0`, `None`, or a cleared flag, never an error. Callers
//! render the results directly without guard clauses, so nothing in this
//! module may panic or propagate a `Result`. Anything time-dependent takes
//! `today` as an explicit argument; no function reads the clock.

use crate::models::{
    Consistency, EdgeStates, Forecast, MonthRecord, RawMonthRecord, SavingsSummary, Tone,
};
use chrono::{Months, NaiveDate};
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_HORIZON: usize = 3;

/// Fixed fraction of the average used for the forecast band. Deliberately not
/// a real statistical variance; it only conveys "this is an estimate".
const FORECAST_BAND: f64 = 0.07;

/// Canonical first-of-month key for a date: 'YYYY-MM-01'.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m-01").to_string()
}

/// Canonicalizes a month identifier. Accepts a full ISO date ('2025-07-19')
/// or a bare month ('2025-07') and truncates to the first-of-month key.
/// Anything unparseable yields `None`.
pub fn canonical_month_key(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d"))
        .ok()?;
    Some(month_key(date))
}

/// The month key one calendar month before `key`, rolling the year at
/// January. Calendar arithmetic, not "minus 30 days".
pub fn previous_month_key(key: &str) -> Option<String> {
    let canonical = canonical_month_key(key)?;
    let date = NaiveDate::parse_from_str(&canonical, "%Y-%m-%d").ok()?;
    date.checked_sub_months(Months::new(1)).map(month_key)
}

fn coerce_amount(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Converts raw month-keyed records into a canonical series: records without
/// a usable month are silently discarded, non-numeric amounts coerce to 0,
/// the first occurrence wins on duplicate months, and the result is sorted
/// descending by month key (lexicographic, which is chronological for the
/// zero-padded key format). Idempotent.
pub fn normalize_series(raw: &[RawMonthRecord]) -> Vec<MonthRecord> {
    let mut by_month: BTreeMap<String, MonthRecord> = BTreeMap::new();

    for record in raw {
        let Some(key) = record.month.as_deref().and_then(canonical_month_key) else {
            continue;
        };
        by_month.entry(key.clone()).or_insert_with(|| MonthRecord {
            month: key,
            income: coerce_amount(&record.income),
            expenses: coerce_amount(&record.expenses),
        });
    }

    by_month.into_values().rev().collect()
}

/// Exact-match lookup of the selected month's record.
pub fn current_month_record(series: &[MonthRecord], key: &str) -> Option<MonthRecord> {
    let key = canonical_month_key(key)?;
    series.iter().find(|r| r.month == key).cloned()
}

/// Record for the calendar month immediately before `key`, if present.
pub fn last_month_record(series: &[MonthRecord], key: &str) -> Option<MonthRecord> {
    let prev = previous_month_key(key)?;
    series.iter().find(|r| r.month == prev).cloned()
}

/// Savings divided by income. Zero when income is zero or the record is
/// absent, so no NaN ever reaches a caller.
pub fn savings_rate(record: Option<&MonthRecord>) -> f64 {
    match record {
        Some(r) if r.income > 0.0 => r.savings() / r.income,
        _ => 0.0,
    }
}

/// Percent of the month's target covered by its savings, clamped to [0, 100].
/// Zero when the record is absent or the target is absent or non-positive.
pub fn progress_percent(record: Option<&MonthRecord>, target: Option<f64>) -> u32 {
    let (Some(record), Some(target)) = (record, target) else {
        return 0;
    };
    if target <= 0.0 {
        return 0;
    }
    let percent = (record.savings().max(0.0) / target * 100.0).round();
    percent.min(100.0) as u32
}

/// Projects savings over `horizon` future months from the mean of the most
/// recent `horizon` records (fewer if fewer exist), with a fixed ±7%-of-mean
/// band per month. `has_data` false means insufficient history, not zero.
pub fn forecast(series: &[MonthRecord], horizon: usize) -> Forecast {
    let horizon = if horizon == 0 { DEFAULT_HORIZON } else { horizon };

    let mut sorted: Vec<&MonthRecord> = series.iter().collect();
    sorted.sort_by(|a, b| b.month.cmp(&a.month));
    let window: Vec<f64> = sorted.iter().take(horizon).map(|r| r.savings()).collect();

    if window.is_empty() {
        return Forecast {
            horizon,
            average: 0.0,
            projected: 0.0,
            best: 0.0,
            likely: 0.0,
            has_data: false,
        };
    }

    let average = window.iter().sum::<f64>() / window.len() as f64;
    let projected = average * horizon as f64;
    let band = average.abs() * FORECAST_BAND * horizon as f64;

    Forecast {
        horizon,
        average,
        projected,
        best: projected + band,
        likely: projected - band,
        has_data: true,
    }
}

fn is_eligible(record: &MonthRecord, current_key: &str) -> bool {
    record.month != current_key && (record.income != 0.0 || record.expenses != 0.0)
}

/// Strongest and weakest eligible months by savings rate. Eligible excludes
/// the in-progress calendar month (per `today`) and months with no activity.
/// Strict comparisons over the descending-sorted series, so on a tied rate
/// the most recent month wins. Fewer than two eligible months reports both
/// as unavailable rather than guessing from a single point.
pub fn best_and_low_months(
    series: &[MonthRecord],
    today: NaiveDate,
) -> (Option<MonthRecord>, Option<MonthRecord>) {
    let current_key = month_key(today);

    let mut eligible: Vec<&MonthRecord> =
        series.iter().filter(|r| is_eligible(r, &current_key)).collect();
    eligible.sort_by(|a, b| b.month.cmp(&a.month));

    if eligible.len() < 2 {
        return (None, None);
    }

    let mut best = eligible[0];
    let mut low = eligible[0];
    for &record in &eligible[1..] {
        if savings_rate(Some(record)) > savings_rate(Some(best)) {
            best = record;
        }
        if savings_rate(Some(record)) < savings_rate(Some(low)) {
            low = record;
        }
    }

    (Some(best.clone()), Some(low.clone()))
}

/// Fraction of the available months in which savings were positive.
pub fn consistency(series: &[MonthRecord]) -> Consistency {
    let window = series.len();
    let saved_months = series.iter().filter(|r| r.savings() > 0.0).count();
    let ratio = if window == 0 {
        0.0
    } else {
        saved_months as f64 / window as f64
    };

    Consistency {
        saved_months,
        window,
        ratio,
    }
}

/// Banner-selection flags derived from the series and the resolved current
/// record.
pub fn edge_states(series: &[MonthRecord], current: Option<&MonthRecord>) -> EdgeStates {
    EdgeStates {
        empty_series: series.is_empty(),
        single_month_history: series.len() == 1,
        income_without_expense: current.is_some_and(|r| r.income > 0.0 && r.expenses == 0.0),
        expense_without_income: current.is_some_and(|r| r.expenses > 0.0 && r.income == 0.0),
    }
}

/// Assembles the whole dashboard summary. Pure function of its arguments.
pub fn summarize(
    raw: &[RawMonthRecord],
    targets: &BTreeMap<String, f64>,
    selected_month: &str,
    today: NaiveDate,
    horizon: usize,
) -> SavingsSummary {
    let series = normalize_series(raw);

    let current = current_month_record(&series, selected_month);
    let last_month = last_month_record(&series, selected_month);

    let savings = current.as_ref().map(|r| r.savings()).unwrap_or(0.0);
    let tone = match &current {
        Some(_) if savings > 0.0 => Tone::Positive,
        Some(_) if savings < 0.0 => Tone::Negative,
        _ => Tone::Neutral,
    };

    let target =
        canonical_month_key(selected_month).and_then(|key| targets.get(&key).copied());
    let (best_month, low_month) = best_and_low_months(&series, today);

    SavingsSummary {
        savings,
        tone,
        rate: savings_rate(current.as_ref()),
        progress: progress_percent(current.as_ref(), target),
        target,
        forecast: forecast(&series, horizon),
        best_month,
        low_month,
        consistency: consistency(&series),
        edge_states: edge_states(&series, current.as_ref()),
        current,
        last_month,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(month: &str, income: f64, expenses: f64) -> MonthRecord {
        MonthRecord {
            month: month.to_string(),
            income,
            expenses,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_month_key_canonicalization() {
        assert_eq!(canonical_month_key("2025-07-19").as_deref(), Some("2025-07-01"));
        assert_eq!(canonical_month_key("2025-07").as_deref(), Some("2025-07-01"));
        assert_eq!(canonical_month_key(" 2025-07-01 ").as_deref(), Some("2025-07-01"));
        assert_eq!(canonical_month_key("garbage"), None);
        assert_eq!(canonical_month_key(""), None);
    }

    #[test]
    fn test_normalize_discards_and_coerces() {
        let raw = vec![
            RawMonthRecord {
                month: None,
                income: json!(500),
                expenses: json!(100),
            },
            RawMonthRecord {
                month: Some("not-a-month".into()),
                income: json!(500),
                expenses: json!(100),
            },
            RawMonthRecord {
                month: Some("2025-04-01".into()),
                income: json!("1200.50"),
                expenses: json!(null),
            },
            RawMonthRecord {
                month: Some("2025-05-14".into()),
                income: json!(true),
                expenses: json!("NaN"),
            },
        ];

        let series = normalize_series(&raw);
        assert_eq!(
            series,
            vec![rec("2025-05-01", 0.0, 0.0), rec("2025-04-01", 1200.50, 0.0)]
        );
    }

    #[test]
    fn test_normalize_sorts_descending_and_dedups_first_wins() {
        let raw = vec![
            RawMonthRecord::new("2025-02-01", 100.0, 50.0),
            RawMonthRecord::new("2025-04-01", 400.0, 50.0),
            RawMonthRecord::new("2025-02-01", 999.0, 999.0), // duplicate, ignored
            RawMonthRecord::new("2025-03-01", 300.0, 50.0),
        ];

        let series = normalize_series(&raw);
        let months: Vec<&str> = series.iter().map(|r| r.month.as_str()).collect();
        assert_eq!(months, vec!["2025-04-01", "2025-03-01", "2025-02-01"]);
        assert_close(series[2].income, 100.0);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = vec![
            RawMonthRecord::new("2025-03-15", 1000.0, 400.0),
            RawMonthRecord {
                month: Some("2025-01".into()),
                income: json!("250"),
                expenses: json!(100),
            },
            RawMonthRecord::new("2025-02-01", 0.0, 80.0),
        ];

        let once = normalize_series(&raw);
        let again_input: Vec<RawMonthRecord> =
            once.iter().cloned().map(RawMonthRecord::from).collect();
        let twice = normalize_series(&again_input);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_savings_rate_zero_income_guard() {
        let r = rec("2025-05-01", 0.0, 700.0);
        assert_close(savings_rate(Some(&r)), 0.0);
        assert_close(savings_rate(None), 0.0);

        let r = rec("2025-05-01", 2000.0, 500.0);
        assert_close(savings_rate(Some(&r)), 0.75);
    }

    #[test]
    fn test_progress_percent_clamped() {
        let r = rec("2025-05-01", 1000.0, 600.0); // savings 400

        assert_eq!(progress_percent(Some(&r), Some(800.0)), 50);
        assert_eq!(progress_percent(Some(&r), Some(300.0)), 100); // over target clamps
        assert_eq!(progress_percent(Some(&r), Some(0.0)), 0);
        assert_eq!(progress_percent(Some(&r), Some(-10.0)), 0);
        assert_eq!(progress_percent(Some(&r), None), 0);
        assert_eq!(progress_percent(None, Some(800.0)), 0);

        let overspent = rec("2025-05-01", 1000.0, 1600.0); // savings -600
        assert_eq!(progress_percent(Some(&overspent), Some(800.0)), 0);
    }

    #[test]
    fn test_forecast_single_month() {
        let series = vec![rec("2025-05-01", 1000.0, 600.0)]; // savings 400

        let f = forecast(&series, 3);
        assert!(f.has_data);
        assert_close(f.average, 400.0);
        assert_close(f.projected, 1200.0);
        assert_close(f.best, 1200.0 + 0.07 * 400.0 * 3.0); // 1284
        assert_close(f.likely, 1200.0 - 0.07 * 400.0 * 3.0); // 1116
    }

    #[test]
    fn test_forecast_uses_most_recent_window() {
        // Deliberately unsorted input; forecast must sort before windowing
        let series = vec![
            rec("2025-01-01", 1000.0, 900.0),  // savings 100, outside window
            rec("2025-04-01", 1000.0, 700.0),  // 300
            rec("2025-02-01", 1000.0, 800.0),  // 200
            rec("2025-03-01", 1000.0, 600.0),  // 400
        ];

        let f = forecast(&series, 3);
        assert_close(f.average, 300.0);
        assert_close(f.projected, 900.0);
    }

    #[test]
    fn test_forecast_empty_series_has_no_data() {
        let f = forecast(&[], 3);
        assert!(!f.has_data);
        assert_close(f.projected, 0.0);
    }

    #[test]
    fn test_last_month_january_rollover() {
        assert_eq!(previous_month_key("2025-01-01").as_deref(), Some("2024-12-01"));

        let series = vec![
            rec("2025-01-01", 3000.0, 2000.0),
            rec("2024-12-01", 2800.0, 2500.0),
        ];
        let last = last_month_record(&series, "2025-01-01").unwrap();
        assert_eq!(last.month, "2024-12-01");
        assert_close(last.savings(), 300.0);
    }

    #[test]
    fn test_consistency_empty_series() {
        let c = consistency(&[]);
        assert_eq!(c.saved_months, 0);
        assert_eq!(c.window, 0);
        assert_close(c.ratio, 0.0);
    }

    #[test]
    fn test_best_low_requires_two_eligible_months() {
        // In-progress month has no activity; only one other month exists
        let series = vec![
            rec("2025-05-01", 0.0, 0.0),
            rec("2025-04-01", 1000.0, 500.0),
        ];
        let today = date("2025-05-20");

        let (best, low) = best_and_low_months(&series, today);
        assert!(best.is_none());
        assert!(low.is_none());
    }

    #[test]
    fn test_best_low_excludes_current_and_inactive_months() {
        let series = vec![
            rec("2025-05-01", 0.0, 0.0),       // current, no activity: excluded twice over
            rec("2025-04-01", 1000.0, 500.0),  // rate 0.5
            rec("2025-03-01", 1000.0, 800.0),  // rate 0.2
        ];
        let today = date("2025-05-20");

        let (best, low) = best_and_low_months(&series, today);
        assert_eq!(best.unwrap().month, "2025-04-01");
        assert_eq!(low.unwrap().month, "2025-03-01");
    }

    #[test]
    fn test_best_low_tie_prefers_most_recent() {
        let series = vec![
            rec("2025-01-01", 2000.0, 1000.0), // rate 0.5
            rec("2025-03-01", 1000.0, 500.0),  // rate 0.5, more recent
            rec("2025-02-01", 1000.0, 900.0),  // rate 0.1
        ];
        let today = date("2025-06-15");

        let (best, low) = best_and_low_months(&series, today);
        assert_eq!(best.unwrap().month, "2025-03-01");
        assert_eq!(low.unwrap().month, "2025-02-01");
    }

    #[test]
    fn test_edge_states() {
        assert!(edge_states(&[], None).empty_series);

        let one = vec![rec("2025-05-01", 1000.0, 0.0)];
        let states = edge_states(&one, Some(&one[0]));
        assert!(states.single_month_history);
        assert!(states.income_without_expense);
        assert!(!states.expense_without_income);

        let spender = rec("2025-05-01", 0.0, 300.0);
        assert!(edge_states(&one, Some(&spender)).expense_without_income);
    }

    #[test]
    fn test_summarize_typical_year() {
        // 12 months: 4 negative (Jan-Apr), 8 positive (May-Dec)
        let mut raw = Vec::new();
        for m in 1..=4 {
            raw.push(RawMonthRecord::new(format!("2025-{:02}-01", m), 1000.0, 1200.0));
        }
        for m in 5..=11 {
            raw.push(RawMonthRecord::new(format!("2025-{:02}-01", m), 2000.0, 1000.0));
        }
        raw.push(RawMonthRecord::new("2025-12-01", 5000.0, 3500.0));

        let targets = BTreeMap::from([("2025-12-01".to_string(), 2000.0)]);
        let summary = summarize(&raw, &targets, "2025-12-01", date("2026-01-15"), DEFAULT_HORIZON);

        assert_close(summary.savings, 1500.0);
        assert_eq!(summary.tone, Tone::Positive);
        assert_close(summary.rate, 1500.0 / 5000.0);
        assert_eq!(summary.progress, 75);
        assert_eq!(summary.last_month.as_ref().unwrap().month, "2025-11-01");
        assert_eq!(summary.consistency.saved_months, 8);
        assert_eq!(summary.consistency.window, 12);
        assert_close(summary.consistency.ratio, 8.0 / 12.0);
        assert!(summary.forecast.has_data);
        assert!(!summary.edge_states.empty_series);
        // May-Nov tie at rate 0.5 (most recent wins); Jan-Apr tie at -0.2
        assert_eq!(summary.best_month.unwrap().month, "2025-11-01");
        assert_eq!(summary.low_month.unwrap().month, "2025-04-01");
    }

    #[test]
    fn test_summarize_no_data_is_all_defaults() {
        let summary = summarize(&[], &BTreeMap::new(), "2025-06-01", date("2025-06-10"), 3);

        assert!(summary.current.is_none());
        assert!(summary.last_month.is_none());
        assert_close(summary.savings, 0.0);
        assert_eq!(summary.tone, Tone::Neutral);
        assert_close(summary.rate, 0.0);
        assert_eq!(summary.progress, 0);
        assert!(!summary.forecast.has_data);
        assert!(summary.best_month.is_none());
        assert!(summary.low_month.is_none());
        assert!(summary.edge_states.empty_series);
    }

    #[test]
    fn test_summarize_negative_month_tone() {
        let raw = vec![
            RawMonthRecord::new("2025-06-01", 1000.0, 1400.0),
            RawMonthRecord::new("2025-05-01", 1000.0, 400.0),
        ];
        let summary = summarize(&raw, &BTreeMap::new(), "2025-06", date("2025-06-20"), 3);

        assert_close(summary.savings, -400.0);
        assert_eq!(summary.tone, Tone::Negative);
        assert_eq!(summary.progress, 0);
    }
}
