use crate::error::DecodeError;
use crate::table::{CellValue, Table};
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto_from_rs};
use std::collections::HashSet;
use std::io::Cursor;
use std::iter;
use std::path::Path;

/// A decoded worksheet together with the workbook's sheet list
#[derive(Debug, Clone)]
pub struct Decoded {
    pub table: Table,
    /// Name of the sheet that was decoded
    pub sheet: String,
    /// Every sheet in the workbook, in workbook order
    pub sheet_names: Vec<String>,
}

/// Check that a file name carries one of the two accepted extensions
///
/// # Arguments
/// * `file_name` - Name of the uploaded or opened file
///
/// # Returns
/// * `Result<(), DecodeError>` - `UnsupportedFormat` for anything but `.xlsx` / `.xls`
pub fn check_extension(file_name: &str) -> Result<(), DecodeError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("xlsx") | Some("xls") => Ok(()),
        _ => Err(DecodeError::UnsupportedFormat {
            name: file_name.to_string(),
        }),
    }
}

fn open(bytes: &[u8], file_name: &str) -> Result<Sheets<Cursor<Vec<u8>>>, DecodeError> {
    check_extension(file_name)?;
    Ok(open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?)
}

/// List the sheet names of a workbook without decoding any of them
pub fn sheet_names(bytes: &[u8], file_name: &str) -> Result<Vec<String>, DecodeError> {
    let workbook = open(bytes, file_name)?;
    let names = workbook.sheet_names();
    if names.is_empty() {
        return Err(DecodeError::NoSheets);
    }
    Ok(names)
}

/// Decode one worksheet of an Excel workbook into a table
///
/// The first row of the sheet is the header. Every later row becomes a record.
///
/// # Arguments
/// * `bytes` - Raw workbook contents
/// * `file_name` - Original file name, used to check the format
/// * `sheet` - Sheet to decode; the first sheet when `None`
///
/// # Returns
/// * `Result<Decoded, DecodeError>` - The table and sheet metadata, or an error
///
/// # Examples
/// ```no_run
/// use sheet_review::loader::decode;
///
/// let bytes = std::fs::read("data.xlsx").unwrap();
/// match decode(&bytes, "data.xlsx", None) {
///     Ok(decoded) => println!("Loaded {} rows from {}", decoded.table.row_count(), decoded.sheet),
///     Err(e) => eprintln!("Error reading Excel file: {}", e),
/// }
/// ```
pub fn decode(bytes: &[u8], file_name: &str, sheet: Option<&str>) -> Result<Decoded, DecodeError> {
    let mut workbook = open(bytes, file_name)?;
    let sheet_names = workbook.sheet_names();

    let sheet = match sheet {
        Some(name) if sheet_names.iter().any(|s| s == name) => name.to_string(),
        Some(name) => {
            return Err(DecodeError::SheetNotFound {
                name: name.to_string(),
            });
        }
        None => sheet_names.first().ok_or(DecodeError::NoSheets)?.clone(),
    };

    let range = workbook.worksheet_range(&sheet)?;
    let table = range_to_table(&range)?;

    Ok(Decoded {
        table,
        sheet,
        sheet_names,
    })
}

/// Read a workbook from disk and decode one of its sheets
pub fn load_file(path: impl AsRef<Path>, sheet: Option<&str>) -> Result<Decoded, DecodeError> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    check_extension(file_name)?;
    let bytes = std::fs::read(path)?;
    decode(&bytes, file_name, sheet)
}

/// Build a table from a worksheet range, keeping column positions from column A
///
/// calamine starts a range at its first non-empty cell, so a sheet whose data
/// begins in column C would otherwise lose its two leading blank columns and
/// shift on export. Leading blank rows are skipped: the header is the first
/// row with data.
fn range_to_table(range: &Range<Data>) -> Result<Table, DecodeError> {
    let offset = range.start().map_or(0, |(_, col)| col as usize);
    let mut rows = range.rows();

    let columns = match rows.next() {
        Some(header) => {
            let padded: Vec<Data> = iter::repeat_n(Data::Empty, offset)
                .chain(header.iter().cloned())
                .collect();
            header_names(&padded)
        }
        None => Vec::new(),
    };
    let records = rows
        .map(|row| {
            iter::repeat_n(CellValue::Empty, offset)
                .chain(row.iter().map(convert_cell))
                .collect()
        })
        .collect();

    Table::new(columns, records)
}

/// Turn the header row into unique column names
///
/// Blank headers become `Unnamed: {index}`; repeats get `.1`, `.2`, ...
fn header_names(header: &[Data]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(header.len());

    for (index, cell) in header.iter().enumerate() {
        let base = match convert_cell(cell) {
            CellValue::Empty => format!("Unnamed: {}", index),
            CellValue::Text(s) if s.trim().is_empty() => format!("Unnamed: {}", index),
            value => value.to_string(),
        };

        let mut name = base.clone();
        let mut suffix = 0;
        while seen.contains(&name) {
            suffix += 1;
            name = format!("{}.{}", base, suffix);
        }
        seen.insert(name.clone());
        names.push(name);
    }

    names
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        // Dates keep their serial number; formatting is not carried
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
        Data::Empty => CellValue::Empty,
    }
}
