//! Typing-rhythm aggregation
//!
//! Turns buffered hold and latency events into an immutable [`Metrics`]
//! snapshot. Everything here is a pure function of its inputs, so it can be
//! called on every UI refresh and again for the final export.

pub mod stats;

pub use stats::{compute_bursts, median, percentile, DEFAULT_BURST_THRESHOLD_MS};

use crate::keyboard::KeyCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Time between a press and the matching release of the same key
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoldEvent {
    pub code: KeyCode,
    pub hold_ms: f64,
}

/// Time between an accepted event and the one before it, regardless of key
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyEvent {
    pub latency_ms: f64,
}

/// Per-key hold statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyStats {
    pub code: KeyCode,
    pub count: u64,
    pub median_hold: f64,
    pub p95_hold: f64,
}

/// Summary of one recording session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub events: u64,
    pub holds_count: u64,
    pub latency_count: u64,
    pub median_hold_ms: f64,
    pub median_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub bursts: u32,
    pub avg_burst_len: f64,
    /// Sorted ascending by code, one entry per code
    pub per_key: Vec<KeyStats>,
}

impl Metrics {
    /// One-line summary used for outbound notifications
    pub fn summary_line(&self) -> String {
        format!(
            "KDyn {}: events={}, med_hold={:.1}ms, med_lat={:.1}ms",
            self.session_id, self.events, self.median_hold_ms, self.median_latency_ms
        )
    }

    pub fn key_stats(&self, code: KeyCode) -> Option<&KeyStats> {
        self.per_key
            .binary_search_by_key(&code, |k| k.code)
            .ok()
            .map(|i| &self.per_key[i])
    }
}

/// Group holds by key and compute count, median and p95 for each.
pub fn per_key_stats(holds: &[HoldEvent]) -> Vec<KeyStats> {
    let mut by_code: BTreeMap<KeyCode, Vec<f64>> = BTreeMap::new();
    for hold in holds {
        by_code.entry(hold.code).or_default().push(hold.hold_ms);
    }

    by_code
        .into_iter()
        .map(|(code, values)| KeyStats {
            code,
            count: values.len() as u64,
            median_hold: median(&values),
            p95_hold: percentile(&values, 0.95),
        })
        .collect()
}

/// Aggregate a session using the default 700 ms burst threshold.
pub fn aggregate(
    session_id: &str,
    started_at: DateTime<Utc>,
    duration_secs: u64,
    total_events: u64,
    holds: &[HoldEvent],
    latencies: &[LatencyEvent],
    press_timestamps_ms: &[f64],
) -> Metrics {
    aggregate_with_threshold(
        session_id,
        started_at,
        duration_secs,
        total_events,
        holds,
        latencies,
        press_timestamps_ms,
        DEFAULT_BURST_THRESHOLD_MS,
    )
}

#[allow(clippy::too_many_arguments)]
pub fn aggregate_with_threshold(
    session_id: &str,
    started_at: DateTime<Utc>,
    duration_secs: u64,
    total_events: u64,
    holds: &[HoldEvent],
    latencies: &[LatencyEvent],
    press_timestamps_ms: &[f64],
    burst_threshold_ms: f64,
) -> Metrics {
    let hold_values: Vec<f64> = holds.iter().map(|h| h.hold_ms).collect();
    let latency_values: Vec<f64> = latencies.iter().map(|l| l.latency_ms).collect();
    let (bursts, avg_burst_len) = compute_bursts(press_timestamps_ms, burst_threshold_ms);

    Metrics {
        session_id: session_id.to_string(),
        started_at,
        duration_secs,
        events: total_events,
        holds_count: holds.len() as u64,
        latency_count: latencies.len() as u64,
        median_hold_ms: median(&hold_values),
        median_latency_ms: median(&latency_values),
        p95_latency_ms: percentile(&latency_values, 0.95),
        bursts,
        avg_burst_len,
        per_key: per_key_stats(holds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn started() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn holds(code: u32, values: &[f64]) -> Vec<HoldEvent> {
        values
            .iter()
            .map(|&hold_ms| HoldEvent {
                code: KeyCode(code),
                hold_ms,
            })
            .collect()
    }

    fn latencies(values: &[f64]) -> Vec<LatencyEvent> {
        values
            .iter()
            .map(|&latency_ms| LatencyEvent { latency_ms })
            .collect()
    }

    #[test]
    fn aggregate_reference_session() {
        let holds = holds(65, &[100.0, 90.0, 110.0, 95.0, 105.0]);
        let lats = latencies(&[50.0, 60.0, 70.0, 80.0, 90.0, 100.0]);
        let presses = [0.0, 100.0, 200.0, 900.0, 1000.0, 1100.0];

        let m = aggregate("sess", started(), 10, 100, &holds, &lats, &presses);

        assert_eq!(m.median_hold_ms, 100.0);
        assert_eq!(m.median_latency_ms, 75.0);
        assert!(m.p95_latency_ms > 0.0 && m.p95_latency_ms <= 100.0);
        assert_eq!(m.bursts, 2);
        assert!((m.avg_burst_len - 3.0).abs() < 1e-9);
        assert_eq!(m.holds_count, 5);
        assert_eq!(m.latency_count, 6);
        assert_eq!(m.events, 100);

        let key = m.key_stats(KeyCode(65)).expect("per-key entry for 65");
        assert_eq!(key.count, 5);
        assert_eq!(key.median_hold, 100.0);
    }

    #[test]
    fn aggregate_empty_session_is_zeroed() {
        let m = aggregate("empty", started(), 0, 0, &[], &[], &[]);
        assert_eq!(m.median_hold_ms, 0.0);
        assert_eq!(m.median_latency_ms, 0.0);
        assert_eq!(m.p95_latency_ms, 0.0);
        assert_eq!(m.bursts, 0);
        assert_eq!(m.avg_burst_len, 0.0);
        assert!(m.per_key.is_empty());
    }

    #[test]
    fn aggregate_is_idempotent() {
        let holds = holds(65, &[80.0, 120.0]);
        let lats = latencies(&[33.3, 44.4, 55.5]);
        let presses = [0.0, 150.0, 1200.0];

        let a = aggregate("s", started(), 3, 5, &holds, &lats, &presses);
        let b = aggregate("s", started(), 3, 5, &holds, &lats, &presses);
        assert_eq!(a, b);
        assert_eq!(a.p95_latency_ms.to_bits(), b.p95_latency_ms.to_bits());
    }

    #[test]
    fn per_key_is_unique_and_sorted() {
        let mut all = holds(90, &[100.0, 120.0]);
        all.extend(holds(32, &[60.0]));
        all.extend(holds(65, &[80.0, 85.0, 90.0]));
        all.extend(holds(32, &[70.0]));

        let per_key = per_key_stats(&all);
        let codes: Vec<u32> = per_key.iter().map(|k| k.code.as_u32()).collect();
        assert_eq!(codes, vec![32, 65, 90]);
        assert_eq!(per_key[0].count, 2);
        assert_eq!(per_key[0].median_hold, 65.0);
        assert_eq!(per_key[1].median_hold, 85.0);
    }

    #[test]
    fn custom_burst_threshold() {
        let presses = [0.0, 300.0, 600.0];
        let tight = aggregate_with_threshold("s", started(), 1, 3, &[], &[], &presses, 200.0);
        assert_eq!(tight.bursts, 3);
        let loose = aggregate("s", started(), 1, 3, &[], &[], &presses);
        assert_eq!(loose.bursts, 1);
    }

    #[test]
    fn summary_line_format() {
        let holds = holds(65, &[100.0]);
        let lats = latencies(&[50.0]);
        let m = aggregate("sess123", started(), 12, 2, &holds, &lats, &[0.0, 500.0]);
        assert_eq!(
            m.summary_line(),
            "KDyn sess123: events=2, med_hold=100.0ms, med_lat=50.0ms"
        );
    }

    #[test]
    fn metrics_json_uses_report_field_names() {
        let m = aggregate("sess", started(), 1, 2, &holds(65, &[100.0]), &[], &[0.0]);
        let value = serde_json::to_value(&m).unwrap();
        for key in [
            "session_id",
            "started_at",
            "duration_secs",
            "events",
            "holds_count",
            "latency_count",
            "median_hold_ms",
            "median_latency_ms",
            "p95_latency_ms",
            "bursts",
            "avg_burst_len",
            "per_key",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        let entry = &value["per_key"][0];
        assert_eq!(entry["code"], 65);
        assert_eq!(entry["count"], 1);
        assert!(entry.get("median_hold").is_some());
        assert!(entry.get("p95_hold").is_some());
        assert_eq!(value["started_at"], "2025-01-01T00:00:00Z");
    }
}
