use rust_xlsxwriter::XlsxError;
use thiserror::Error;

/// Failures while turning uploaded bytes into a [`Table`](crate::table::Table).
///
/// None of these leave partial state behind: a failed decode never creates a
/// session, and whatever session the caller already had is kept.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The file name does not end in `.xlsx` or `.xls`
    #[error("Unsupported file format for '{name}', expected .xlsx or .xls")]
    UnsupportedFormat { name: String },

    /// The workbook container or a worksheet could not be parsed
    #[error("Invalid spreadsheet: {0}")]
    Workbook(#[from] calamine::Error),

    /// The workbook parsed but holds no worksheets
    #[error("No sheets found in Excel file")]
    NoSheets,

    /// The requested worksheet does not exist
    #[error("Sheet '{name}' not found")]
    SheetNotFound { name: String },

    /// A row has a different number of cells than the header
    #[error("Row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The upload itself was missing or could not be read
    #[error("Could not read upload: {0}")]
    Upload(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the session store, the review controller and export.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Approval values are restricted to `yes` and `no`
    #[error("Invalid approval value '{0}', expected 'yes' or 'no'")]
    InvalidValue(String),

    #[error("Row index {index} out of range for {row_count} rows")]
    IndexOutOfRange { index: usize, row_count: usize },

    #[error("Failed to write spreadsheet: {0}")]
    Encode(#[from] XlsxError),
}
