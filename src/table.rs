use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell as read from (or written to) a worksheet
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    /// Returns the text content if this is a text cell
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{}", s),
            // Whole numbers print without a trailing ".0"
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Empty => Ok(()),
        }
    }
}

/// One row of a table. Values are stored in the table's column order.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Record {
    values: Vec<CellValue>,
}

impl Record {
    pub fn new(values: Vec<CellValue>) -> Self {
        Record { values }
    }

    pub fn get(&self, column: usize) -> Option<&CellValue> {
        self.values.get(column)
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn set(&mut self, column: usize, value: CellValue) {
        self.values[column] = value;
    }

    pub(crate) fn push(&mut self, value: CellValue) {
        self.values.push(value);
    }
}

/// Ordered column names plus ordered records sharing that schema.
///
/// Every record holds exactly `columns.len()` values; [`Table::new`] is the
/// only way to build one from outside the crate and it enforces that.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    /// Build a table from a header and raw rows
    ///
    /// # Arguments
    /// * `columns` - Column names in display order
    /// * `rows` - Cell values per row, each exactly as wide as `columns`
    ///
    /// # Returns
    /// * `Result<Table, DecodeError>` - The table, or `RaggedRow` naming the
    ///   first row (1-based, header excluded) with the wrong width
    ///
    /// # Examples
    /// ```
    /// use sheet_review::table::{CellValue, Table};
    ///
    /// let table = Table::new(
    ///     vec!["name".to_string()],
    ///     vec![vec![CellValue::text("Ada")]],
    /// ).unwrap();
    /// assert_eq!(table.row_count(), 1);
    /// ```
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, DecodeError> {
        let expected = columns.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
            return Err(DecodeError::RaggedRow {
                row: i + 1,
                expected,
                found: row.len(),
            });
        }

        Ok(Table {
            columns,
            rows: rows.into_iter().map(Record::new).collect(),
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn record(&self, row: usize) -> Option<&Record> {
        self.rows.get(row)
    }

    /// Looks up a cell by row index and column name
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Pairs each column name with the record's value, in column order
    pub fn named_cells(&self, row: usize) -> impl Iterator<Item = (&str, &CellValue)> {
        let values = self.rows.get(row).map(|r| r.values()).unwrap_or(&[]);
        self.columns.iter().map(String::as_str).zip(values.iter())
    }

    /// Appends a column, filling every existing record with `fill`
    pub(crate) fn push_column(&mut self, name: &str, fill: CellValue) {
        self.columns.push(name.to_string());
        for record in &mut self.rows {
            record.push(fill.clone());
        }
    }

    pub(crate) fn set_cell(&mut self, row: usize, column: usize, value: CellValue) {
        self.rows[row].set(column, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec!["id".into(), "name".into()],
            vec![
                vec![CellValue::Number(1.0), CellValue::text("Ada")],
                vec![CellValue::Number(2.0), CellValue::Empty],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = Table::new(
            vec!["a".into(), "b".into()],
            vec![
                vec![CellValue::Empty, CellValue::Empty],
                vec![CellValue::Empty],
            ],
        );
        match result {
            Err(DecodeError::RaggedRow {
                row,
                expected,
                found,
            }) => {
                assert_eq!(row, 2);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected RaggedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_named_access() {
        let table = sample();
        assert_eq!(table.cell(0, "name"), Some(&CellValue::text("Ada")));
        assert_eq!(table.cell(1, "name"), Some(&CellValue::Empty));
        assert_eq!(table.cell(0, "missing"), None);
        assert_eq!(table.cell(5, "id"), None);

        let pairs: Vec<_> = table.named_cells(0).collect();
        assert_eq!(pairs[0], ("id", &CellValue::Number(1.0)));
        assert_eq!(pairs[1], ("name", &CellValue::text("Ada")));
    }

    #[test]
    fn test_push_column_fills_every_row() {
        let mut table = sample();
        table.push_column("approved", CellValue::text("no"));
        assert_eq!(table.columns().len(), 3);
        assert!(table.rows().iter().all(|r| r.len() == 3));
        assert_eq!(table.cell(1, "approved"), Some(&CellValue::text("no")));
    }

    #[test]
    fn test_display_formats_numbers() {
        assert_eq!(CellValue::Number(2019.0).to_string(), "2019");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Bool(true).to_string(), "TRUE");
        assert_eq!(CellValue::Empty.to_string(), "");
    }
}
