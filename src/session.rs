use crate::error::ReviewError;
use crate::table::{CellValue, Record, Table};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the column holding the review marker
pub const APPROVAL_COLUMN: &str = "approved";

/// The two values the approval marker may take
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Approval {
    Yes,
    No,
}

impl Approval {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Approval::Yes => "yes",
            Approval::No => "no",
        }
    }

    pub const fn toggled(&self) -> Self {
        match self {
            Approval::Yes => Approval::No,
            Approval::No => Approval::Yes,
        }
    }

    /// Reads a stored cell. Anything other than the text `yes` reads as `No`.
    pub fn from_cell(cell: &CellValue) -> Self {
        match cell.as_text() {
            Some("yes") => Approval::Yes,
            _ => Approval::No,
        }
    }

    pub fn to_cell(self) -> CellValue {
        CellValue::text(self.as_str())
    }
}

impl FromStr for Approval {
    type Err = ReviewError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "yes" => Ok(Approval::Yes),
            "no" => Ok(Approval::No),
            other => Err(ReviewError::InvalidValue(other.to_string())),
        }
    }
}

impl fmt::Display for Approval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Working table, original snapshot and cursor for one loaded file+sheet.
///
/// Only the `approved` column of the working table is ever written; the
/// original is frozen at load, so change accounting is a positional value
/// comparison between the two.
#[derive(Clone, Debug)]
pub struct Session {
    working: Table,
    original: Table,
    approval_column: usize,
    approval_column_added: bool,
    cursor: usize,
}

impl Session {
    /// Start a review session over a decoded table
    ///
    /// If the table has no `approved` column one is appended with `"no"` in
    /// every row before the original snapshot is taken, so a fresh session
    /// always reports zero changes.
    ///
    /// # Arguments
    /// * `table` - The decoded table; its width was validated when it was built
    ///
    /// # Returns
    /// * `Session` - Cursor at row 0
    pub fn load(mut table: Table) -> Self {
        let (approval_column, approval_column_added) = match table.column_index(APPROVAL_COLUMN) {
            Some(index) => (index, false),
            None => {
                table.push_column(APPROVAL_COLUMN, Approval::No.to_cell());
                (table.columns().len() - 1, true)
            }
        };

        Session {
            original: table.clone(),
            working: table,
            approval_column,
            approval_column_added,
            cursor: 0,
        }
    }

    pub fn row_count(&self) -> usize {
        self.working.row_count()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn working(&self) -> &Table {
        &self.working
    }

    pub fn original(&self) -> &Table {
        &self.original
    }

    pub fn approval_column(&self) -> usize {
        self.approval_column
    }

    /// Whether `load` had to append the `approved` column
    pub fn approval_column_added(&self) -> bool {
        self.approval_column_added
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn set_cursor(&mut self, position: usize) {
        self.cursor = position;
    }

    pub fn get_record(&self, index: usize) -> Result<&Record, ReviewError> {
        self.working
            .record(index)
            .ok_or(ReviewError::IndexOutOfRange {
                index,
                row_count: self.row_count(),
            })
    }

    /// The raw `approved` cell of the working record at `index`
    pub fn approval_at(&self, index: usize) -> Result<&CellValue, ReviewError> {
        let record = self.get_record(index)?;
        Ok(&record.values()[self.approval_column])
    }

    /// Write the approval marker of one row
    ///
    /// The value is validated before the index, and nothing is written when
    /// either check fails.
    ///
    /// # Arguments
    /// * `index` - 0-based row index
    /// * `value` - `"yes"` or `"no"`
    ///
    /// # Returns
    /// * `Result<bool, ReviewError>` - Whether the stored value changed
    pub fn set_approval(&mut self, index: usize, value: &str) -> Result<bool, ReviewError> {
        let approval: Approval = value.parse()?;
        let cell = approval.to_cell();
        if *self.approval_at(index)? == cell {
            return Ok(false);
        }

        self.working.set_cell(index, self.approval_column, cell);
        Ok(true)
    }

    /// Rows whose working approval differs from the original, by position
    pub fn changed_count(&self) -> usize {
        let col = self.approval_column;
        self.working
            .rows()
            .iter()
            .zip(self.original.rows())
            .filter(|(working, original)| working.get(col) != original.get(col))
            .count()
    }
}
