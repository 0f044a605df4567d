//! Coercion of raw axis cells into numbers.
//!
//! Exported sensor files often carry stray separators (`"0.53;"`) or units
//! glued to the value. With cleaning enabled the first decimal number found in
//! the cell is used; anything without a number becomes NaN.
//!
//! The sign is kept for integers as well as decimals: `"-4"` reads as -4.0,
//! not 4.0.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[-+]?(?:\d*\.\d+|\d+)").expect("number pattern is a valid regex")
    })
}

/// Extract the first number embedded in `text`, after dropping `;` separators.
pub fn extract_number(text: &str) -> Option<f64> {
    let stripped = text.replace(';', "");
    number_pattern()
        .find(&stripped)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Convert a raw cell into a float.
///
/// `clean` selects between number extraction and a strict parse of string
/// cells. Numbers pass through unchanged in both modes.
pub fn coerce_numeric(value: &Value, clean: bool) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) if clean => extract_number(s).unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_number_with_separator() {
        assert_eq!(extract_number("0.53;"), Some(0.53));
        assert_eq!(extract_number("-1.25;"), Some(-1.25));
        assert_eq!(extract_number("-4"), Some(-4.0));
        assert_eq!(extract_number(".5g"), Some(0.5));
        assert_eq!(extract_number("x"), None);
    }

    #[test]
    fn test_coerce_numeric_clean() {
        assert_eq!(coerce_numeric(&json!(1.5), true), 1.5);
        assert_eq!(coerce_numeric(&json!("9.81 m/s2"), true), 9.81);
        assert!(coerce_numeric(&json!("n/a"), true).is_nan());
        assert!(coerce_numeric(&json!(null), true).is_nan());
    }

    #[test]
    fn test_coerce_numeric_strict() {
        assert_eq!(coerce_numeric(&json!(" 2.0 "), false), 2.0);
        assert!(coerce_numeric(&json!("2.0;"), false).is_nan());
    }
}
