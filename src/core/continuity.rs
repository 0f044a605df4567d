//! Sampling continuity checks.
//!
//! Verifies that consecutive records are spaced at the expected sampling
//! period within a tolerance. Failures are reported, never raised.

use crate::core::record::Record;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Number of offending deltas included in a diagnostic message.
const REPORTED_DELTAS: usize = 5;

/// One inter-sample delta outside the tolerated range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutOfRangeDelta {
    /// Index of the later record of the pair
    pub index: usize,
    pub delta_ms: f64,
}

/// Result of a continuity check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuityReport {
    pub expected_period_ms: f64,
    pub tolerance_ms: f64,
    /// Number of records examined
    pub records: usize,
    /// Number of deltas between two valid times
    pub deltas_checked: usize,
    /// Mean of the checked deltas (NaN when none)
    pub mean_delta_ms: f64,
    pub out_of_range: Vec<OutOfRangeDelta>,
}

impl ContinuityReport {
    /// True when at least two records were present and every delta is in range.
    pub fn is_continuous(&self) -> bool {
        self.records >= 2 && self.out_of_range.is_empty()
    }

    /// One-line description for logs and the CLI.
    pub fn describe(&self) -> String {
        if self.records < 2 {
            return format!(
                "too few records to check continuity ({} record(s))",
                self.records
            );
        }
        if self.out_of_range.is_empty() {
            return format!(
                "continuous: {} deltas within {:.2} ± {:.2} ms",
                self.deltas_checked, self.expected_period_ms, self.tolerance_ms
            );
        }
        let sample: Vec<String> = self
            .out_of_range
            .iter()
            .take(REPORTED_DELTAS)
            .map(|d| format!("#{}: {:.1} ms", d.index, d.delta_ms))
            .collect();
        format!(
            "{} discontinuities (expected ~{:.2} ms): {}",
            self.out_of_range.len(),
            self.expected_period_ms,
            sample.join(", ")
        )
    }
}

/// Check raw times (epoch ms) against an expected rate.
///
/// Pairs involving a missing time are skipped.
pub fn continuity_report_for_times(
    times: &[Option<i64>],
    expected_rate_hz: f64,
    tolerance_ms: f64,
) -> ContinuityReport {
    let expected_period_ms = 1000.0 / expected_rate_hz;
    let lower = expected_period_ms - tolerance_ms;
    let upper = expected_period_ms + tolerance_ms;

    let mut deltas = Vec::with_capacity(times.len().saturating_sub(1));
    let mut out_of_range = Vec::new();
    for (index, pair) in times.windows(2).enumerate() {
        if let (Some(prev), Some(next)) = (pair[0], pair[1]) {
            let delta_ms = next.saturating_sub(prev) as f64;
            deltas.push(delta_ms);
            if !(lower..=upper).contains(&delta_ms) {
                out_of_range.push(OutOfRangeDelta {
                    index: index + 1,
                    delta_ms,
                });
            }
        }
    }

    ContinuityReport {
        expected_period_ms,
        tolerance_ms,
        records: times.len(),
        deltas_checked: deltas.len(),
        mean_delta_ms: deltas.iter().mean(),
        out_of_range,
    }
}

/// Check a record sequence against an expected rate.
pub fn continuity_report(
    records: &[Record],
    expected_rate_hz: f64,
    tolerance_ms: f64,
) -> ContinuityReport {
    let times: Vec<Option<i64>> = records.iter().map(|r| r.time).collect();
    continuity_report_for_times(&times, expected_rate_hz, tolerance_ms)
}

/// Return whether `records` are evenly spaced at `expected_rate_hz`.
///
/// Unless `silent`, a failed check logs the number of offending deltas and a
/// few examples.
pub fn check_time_continuity(
    records: &[Record],
    expected_rate_hz: f64,
    tolerance_ms: f64,
    silent: bool,
) -> bool {
    let report = continuity_report(records, expected_rate_hz, tolerance_ms);
    if !silent && !report.is_continuous() {
        tracing::warn!("{}", report.describe());
    }
    report.is_continuous()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::GroupKey;

    fn records_at(times: &[i64]) -> Vec<Record> {
        let key = GroupKey::new(1, "walk");
        times
            .iter()
            .map(|&t| Record::new(Some(t), &key, [0.0; 3], [0.0; 3]))
            .collect()
    }

    #[test]
    fn test_even_spacing_is_continuous() {
        let times: Vec<i64> = (0..20).map(|i| i * 50).collect();
        assert!(check_time_continuity(&records_at(&times), 20.0, 5.0, true));
    }

    #[test]
    fn test_single_gap_is_reported() {
        let mut times: Vec<i64> = (0..10).map(|i| i * 50).collect();
        for t in times.iter_mut().skip(5) {
            *t += 30;
        }
        let records = records_at(&times);

        assert!(!check_time_continuity(&records, 20.0, 5.0, true));
        let report = continuity_report(&records, 20.0, 5.0);
        assert_eq!(report.out_of_range.len(), 1);
        assert_eq!(report.out_of_range[0].index, 5);
        assert_eq!(report.out_of_range[0].delta_ms, 80.0);
        assert!(report.describe().contains("1 discontinuities"));
    }

    #[test]
    fn test_tolerance_is_inclusive() {
        let records = records_at(&[0, 55, 100]);
        assert!(check_time_continuity(&records, 20.0, 5.0, true));
    }

    #[test]
    fn test_too_short_is_not_continuous() {
        assert!(!check_time_continuity(&[], 20.0, 5.0, true));
        assert!(!check_time_continuity(&records_at(&[0]), 20.0, 5.0, true));
    }

    #[test]
    fn test_missing_times_are_skipped() {
        let report = continuity_report_for_times(&[Some(0), None, Some(100), Some(150)], 20.0, 5.0);
        assert_eq!(report.deltas_checked, 1);
        assert!(report.is_continuous());
        assert_eq!(report.mean_delta_ms, 50.0);
    }

    #[test]
    fn test_fractional_period() {
        // 30 Hz has a period of 33.33 ms
        let records = records_at(&[0, 33, 67, 100]);
        assert!(check_time_continuity(&records, 30.0, 1.0, true));
    }
}
