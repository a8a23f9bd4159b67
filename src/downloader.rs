use crate::error::ReviewError;
use crate::table::{CellValue, Table};
use rust_xlsxwriter::{Workbook, Worksheet};

/// MIME type of the exported workbook
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Convert a table to XLSX format
///
/// This function exports a table to XLSX (Excel) format using the rust_xlsxwriter library.
/// The first row holds the column names, followed by one row per record. Empty
/// cells are left blank.
///
/// # Arguments
/// * `table` - Reference to the table to convert
/// * `sheet_name` - Name given to the single worksheet
///
/// # Returns
/// * `Result<Vec<u8>, ReviewError>` - XLSX file content as bytes or an error
///
/// # Examples
/// ```
/// use sheet_review::downloader::to_xlsx;
/// use sheet_review::table::{CellValue, Table};
///
/// let table = Table::new(vec!["id".into()], vec![vec![CellValue::Number(1.0)]]).unwrap();
/// match to_xlsx(&table, "Sheet1") {
///     Ok(xlsx_data) => println!("XLSX generated: {} bytes", xlsx_data.len()),
///     Err(e) => eprintln!("Failed to generate XLSX: {}", e),
/// }
/// ```
pub fn to_xlsx(table: &Table, sheet_name: &str) -> Result<Vec<u8>, ReviewError> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name(sheet_name)?;

    for (c, name) in table.columns().iter().enumerate() {
        worksheet.write_string(0, column_index(c)?, name)?;
    }

    for (r, record) in table.rows().iter().enumerate() {
        let row = u32::try_from(r + 1).map_err(|_| rust_xlsxwriter::XlsxError::RowColumnLimitError)?;
        for (c, value) in record.values().iter().enumerate() {
            let col = column_index(c)?;
            match value {
                CellValue::Text(s) => worksheet.write_string(row, col, s)?,
                CellValue::Number(n) => worksheet.write_number(row, col, *n)?,
                CellValue::Bool(b) => worksheet.write_boolean(row, col, *b)?,
                CellValue::Empty => continue,
            };
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

fn column_index(c: usize) -> Result<u16, ReviewError> {
    u16::try_from(c).map_err(|_| rust_xlsxwriter::XlsxError::RowColumnLimitError.into())
}

/// Name of the downloaded file: `updated_` followed by the uploaded name
///
/// # Examples
/// ```
/// use sheet_review::downloader::export_file_name;
///
/// assert_eq!(export_file_name("q3.xlsx"), "updated_q3.xlsx");
/// ```
pub fn export_file_name(original: &str) -> String {
    format!("updated_{}", original)
}
