//! Normalized sensor records and the identity keys used to group them.
//!
//! A record holds one accelerometer + gyroscope sample. Missing numeric
//! values are `f64::NAN`; a timestamp that failed to parse is `None`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Identity value for a subject or an activity.
///
/// Integers order before text, integers numerically, text lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Int(i64),
    Text(String),
}

impl Label {
    /// Build a label from a raw cell. Null and blank cells have no label.
    ///
    /// Only JSON numbers become [`Label::Int`]. Text is kept verbatim, so
    /// `"007"` and `"7"` stay distinct identities.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Label::Int(i))
                } else {
                    let f = n.as_f64()?;
                    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                        Some(Label::Int(f as i64))
                    } else {
                        Some(Label::Text(n.to_string()))
                    }
                }
            }
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(Label::Text(s.clone())),
            Value::Bool(b) => Some(Label::Text(b.to_string())),
            other => Some(Label::Text(other.to_string())),
        }
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Label::Int(a), Label::Int(b)) => a.cmp(b),
            (Label::Int(_), Label::Text(_)) => Ordering::Less,
            (Label::Text(_), Label::Int(_)) => Ordering::Greater,
            (Label::Text(a), Label::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(i) => write!(f, "{i}"),
            Label::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Label {
    fn from(value: i64) -> Self {
        Label::Int(value)
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label::Text(value.to_string())
    }
}

/// The (subject, activity) pair identifying a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub subject: Label,
    pub activity: Label,
}

impl GroupKey {
    pub fn new(subject: impl Into<Label>, activity: impl Into<Label>) -> Self {
        Self {
            subject: subject.into(),
            activity: activity.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subject, self.activity)
    }
}

/// One sensor sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Epoch milliseconds, `None` when the raw value could not be parsed
    pub time: Option<i64>,
    pub subject: Label,
    pub activity: Label,
    /// Accelerometer x, y, z
    pub acc: [f64; 3],
    /// Gyroscope x, y, z
    pub gyr: [f64; 3],
    /// Numeric passthrough columns
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, f64>,
    /// Text passthrough columns (not carried through resampling)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub text: BTreeMap<String, String>,
}

impl Record {
    /// Create a record with no passthrough columns.
    pub fn new(time: Option<i64>, key: &GroupKey, acc: [f64; 3], gyr: [f64; 3]) -> Self {
        Self {
            time,
            subject: key.subject.clone(),
            activity: key.activity.clone(),
            acc,
            gyr,
            extra: BTreeMap::new(),
            text: BTreeMap::new(),
        }
    }

    /// The group this record belongs to.
    pub fn key(&self) -> GroupKey {
        GroupKey {
            subject: self.subject.clone(),
            activity: self.activity.clone(),
        }
    }

    /// Sort key placing missing times after every valid time.
    pub(crate) fn time_order(&self) -> (bool, i64) {
        match self.time {
            Some(t) => (false, t),
            None => (true, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_label_from_value() {
        assert_eq!(Label::from_value(&json!(7)), Some(Label::Int(7)));
        assert_eq!(Label::from_value(&json!(7.0)), Some(Label::Int(7)));
        assert_eq!(Label::from_value(&json!("007")), Some(Label::from("007")));
        assert_eq!(Label::from_value(&json!(" walk")), Some(Label::from(" walk")));
        assert_eq!(
            Label::from_value(&json!("walking")),
            Some(Label::Text("walking".to_string()))
        );
        assert_eq!(Label::from_value(&json!(null)), None);
        assert_eq!(Label::from_value(&json!("  ")), None);
    }

    #[test]
    fn test_label_ordering() {
        let mut labels = vec![
            Label::from("b"),
            Label::Int(10),
            Label::from("a"),
            Label::Int(2),
        ];
        labels.sort();
        assert_eq!(
            labels,
            vec![Label::Int(2), Label::Int(10), Label::from("a"), Label::from("b")]
        );
    }

    #[test]
    fn test_group_key_ordering() {
        let a = GroupKey::new(1, "walk");
        let b = GroupKey::new(1, "run");
        let c = GroupKey::new(2, "jump");
        assert!(b < a);
        assert!(a < c);
        assert_eq!(a.to_string(), "1/walk");
    }

    #[test]
    fn test_missing_time_orders_last() {
        let key = GroupKey::new(1, "walk");
        let valid = Record::new(Some(i64::MAX), &key, [0.0; 3], [0.0; 3]);
        let missing = Record::new(None, &key, [0.0; 3], [0.0; 3]);
        assert!(valid.time_order() < missing.time_order());
    }
}
