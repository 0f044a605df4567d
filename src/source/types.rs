//! Untyped tabular data as read from an input file.

use serde_json::{Map, Value};

/// A table of raw cells keyed by column name.
///
/// Rows may omit columns; a missing cell reads as `null`.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Map<String, Value>>,
}

impl RawTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from rows, collecting column names in order of first appearance.
    pub fn from_rows(rows: Vec<Map<String, Value>>) -> Self {
        let mut table = Self::new();
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Append a row, registering any column not seen before.
    pub fn push_row(&mut self, row: Map<String, Value>) {
        for name in row.keys() {
            if !self.columns.iter().any(|c| c == name) {
                self.columns.push(name.clone());
            }
        }
        self.rows.push(row);
    }

    /// Column names in order of first appearance.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Check whether any row carries the given column.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn rows(&self) -> &[Map<String, Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Read one cell, `null` when the row lacks the column.
    pub fn cell<'a>(&'a self, row: usize, column: &str) -> &'a Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_columns_in_first_appearance_order() {
        let table = RawTable::from_rows(vec![
            row(json!({"Timestamp": 1, "ac_x": 0.1})),
            row(json!({"Timestamp": 2, "g_x": 0.2})),
        ]);

        assert_eq!(table.len(), 2);
        assert!(table.has_column("g_x"));
        assert!(!table.has_column("g_y"));
        assert_eq!(table.columns().len(), 3);
    }

    #[test]
    fn test_missing_cell_is_null() {
        let table = RawTable::from_rows(vec![row(json!({"ac_x": 0.1}))]);
        assert_eq!(table.cell(0, "ac_y"), &Value::Null);
        assert_eq!(table.cell(5, "ac_x"), &Value::Null);
        assert_eq!(table.cell(0, "ac_x"), &json!(0.1));
    }
}
