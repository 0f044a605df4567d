//! File readers producing [`RawTable`]s.

use crate::source::types::RawTable;
use serde_json::{Map, Value};
use std::path::Path;

/// Errors raised while reading an input file.
#[derive(Debug)]
pub enum SourceError {
    Io(String),
    Json { line: Option<usize>, message: String },
    Csv(String),
    UnsupportedFormat(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Io(e) => write!(f, "IO error: {e}"),
            SourceError::Json {
                line: Some(line),
                message,
            } => write!(f, "JSON error on line {line}: {message}"),
            SourceError::Json {
                line: None,
                message,
            } => write!(f, "JSON error: {message}"),
            SourceError::Csv(e) => write!(f, "CSV error: {e}"),
            SourceError::UnsupportedFormat(ext) => {
                write!(f, "Unsupported input format: {ext:?} (expected json, jsonl or csv)")
            }
        }
    }
}

impl std::error::Error for SourceError {}

/// Load a table, picking the reader from the file extension.
pub fn load_table(path: &Path) -> Result<RawTable, SourceError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let table = match extension.as_str() {
        "json" => read_json(path)?,
        "jsonl" | "ndjson" => read_json_lines(path)?,
        "csv" => read_csv(path)?,
        other => return Err(SourceError::UnsupportedFormat(other.to_string())),
    };

    tracing::info!(
        "Loaded {} rows ({} columns) from {:?}",
        table.len(),
        table.columns().len(),
        path
    );
    Ok(table)
}

/// Read a JSON document holding an array of row objects.
pub fn read_json(path: &Path) -> Result<RawTable, SourceError> {
    let content = std::fs::read_to_string(path).map_err(|e| SourceError::Io(e.to_string()))?;
    let document: Value = serde_json::from_str(&content).map_err(|e| SourceError::Json {
        line: Some(e.line()),
        message: e.to_string(),
    })?;

    let Value::Array(items) = document else {
        return Err(SourceError::Json {
            line: None,
            message: "expected a top-level array of objects".to_string(),
        });
    };

    let mut table = RawTable::new();
    for (index, item) in items.into_iter().enumerate() {
        table.push_row(into_row(item, None, index)?);
    }
    Ok(table)
}

/// Read a JSON Lines file, one row object per non-blank line.
pub fn read_json_lines(path: &Path) -> Result<RawTable, SourceError> {
    let content = std::fs::read_to_string(path).map_err(|e| SourceError::Io(e.to_string()))?;

    let mut table = RawTable::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|e| SourceError::Json {
            line: Some(index + 1),
            message: e.to_string(),
        })?;
        table.push_row(into_row(value, Some(index + 1), index)?);
    }
    Ok(table)
}

/// Read a CSV file with a header row. Every cell is kept as text; empty cells are null.
pub fn read_csv(path: &Path) -> Result<RawTable, SourceError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| SourceError::Csv(e.to_string()))?;
    let headers = reader
        .headers()
        .map_err(|e| SourceError::Csv(e.to_string()))?
        .clone();

    let mut table = RawTable::new();
    for result in reader.records() {
        let record = result.map_err(|e| SourceError::Csv(e.to_string()))?;
        let mut row = Map::new();
        for (name, cell) in headers.iter().zip(record.iter()) {
            let value = if cell.trim().is_empty() {
                Value::Null
            } else {
                Value::String(cell.to_string())
            };
            row.insert(name.to_string(), value);
        }
        table.push_row(row);
    }
    Ok(table)
}

fn into_row(
    value: Value,
    line: Option<usize>,
    index: usize,
) -> Result<Map<String, Value>, SourceError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(SourceError::Json {
            line,
            message: format!("row {index} is not an object: {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("create temp file");
        file.write_all(content.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn test_read_json_array() {
        let file = write_temp(
            ".json",
            r#"[{"Timestamp": 1620000000000, "ac_x": "0.5;"}, {"Timestamp": 1620000000050}]"#,
        );
        let table = load_table(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.has_column("ac_x"));
        assert_eq!(table.cell(1, "ac_x"), &Value::Null);
    }

    #[test]
    fn test_read_json_rejects_non_array() {
        let file = write_temp(".json", r#"{"Timestamp": 1}"#);
        assert!(matches!(
            load_table(file.path()),
            Err(SourceError::Json { .. })
        ));
    }

    #[test]
    fn test_read_json_lines_reports_line() {
        let file = write_temp(".jsonl", "{\"a\": 1}\n\n{not json}\n");
        match load_table(file.path()) {
            Err(SourceError::Json { line, .. }) => assert_eq!(line, Some(3)),
            other => panic!("expected JSON error, got {other:?}"),
        }
    }

    #[test]
    fn test_read_csv() {
        let file = write_temp(
            ".csv",
            "Timestamp,Subject-id,Activity Label,ac_x\n1620000000000,1,walk,0.1;\n1620000000050,1,walk,\n",
        );
        let table = load_table(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "ac_x"), &Value::String("0.1;".to_string()));
        assert_eq!(table.cell(1, "ac_x"), &Value::Null);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_temp(".parquet", "");
        assert!(matches!(
            load_table(file.path()),
            Err(SourceError::UnsupportedFormat(ext)) if ext == "parquet"
        ));
    }
}
