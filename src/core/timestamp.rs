//! Timestamp normalization.
//!
//! Raw timestamps arrive as integers, floats or text that may carry stray
//! characters. They are reduced to epoch milliseconds; values that cannot be
//! read become `None` instead of failing the whole dataset.

use crate::core::record::Record;
use serde_json::Value;

/// Maximum number of digits kept from a cleaned timestamp (millisecond epoch).
pub const EPOCH_MS_DIGITS: usize = 13;

/// Largest magnitude accepted as an epoch-millisecond time (13 digits).
pub const MAX_EPOCH_MS: i64 = 9_999_999_999_999;

/// Check that `time` fits in 13 digits.
pub fn is_valid_epoch_ms(time: i64) -> bool {
    (-MAX_EPOCH_MS..=MAX_EPOCH_MS).contains(&time)
}

/// Normalize a raw timestamp cell to epoch milliseconds.
///
/// Every non-digit character is removed and the remaining digits are cut to
/// the first 13, so microsecond or nanosecond epochs collapse to milliseconds.
pub fn normalize_timestamp(value: &Value) -> Option<i64> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    };
    parse_epoch_digits(&text)
}

/// Strip non-digits from `text` and parse the first 13 digits.
pub fn parse_epoch_digits(text: &str) -> Option<i64> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(EPOCH_MS_DIGITS)
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok()
}

/// Read a timestamp that is expected to already be epoch milliseconds.
///
/// Used when normalization is switched off: integers, floats and plain digit
/// strings are accepted as-is, everything else is missing. Values beyond 13
/// digits are missing too.
pub fn read_epoch_ms(value: &Value) -> Option<i64> {
    let time = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.round() as i64)
        }),
        Value::String(s) => {
            let trimmed = s.trim();
            let unsigned = trimmed.strip_prefix('-').unwrap_or(trimmed);
            if !unsigned.is_empty() && unsigned.chars().all(|c| c.is_ascii_digit()) {
                trimmed.parse::<i64>().ok()
            } else {
                None
            }
        }
        _ => None,
    };
    time.filter(|&t| is_valid_epoch_ms(t))
}

/// Stable sort by (subject, activity, time), missing times last within a group.
pub fn sort_records(records: &mut [Record]) {
    records.sort_by(|a, b| {
        a.subject
            .cmp(&b.subject)
            .then_with(|| a.activity.cmp(&b.activity))
            .then_with(|| a.time_order().cmp(&b.time_order()))
    });
}
