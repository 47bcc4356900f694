//! # Spreadsheet Module
//!
//! Reads the first worksheet of Excel (`.xlsx`, `.xlsm`, `.xltx`, `.xltm`) and
//! OpenDocument (`.ods`) workbooks into a [`SpreadsheetTable`]: a header row of
//! column names followed by data rows whose cells are kept with their detected type.
pub mod cell;
pub mod criteria;
pub(crate) mod excel;
pub(crate) mod ods;
pub(crate) mod reference;
pub(crate) mod sheet;
pub mod table;
pub(crate) mod xlsx;

use crate::error::RustyMergeError;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::ods::OdsSpreadsheet;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::table::SpreadsheetTable;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors raised while opening or reading a workbook.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// A required part is missing from the workbook package
    #[error("Missing part '{0}' in the workbook package")]
    FileError(String),

    /// The workbook declares no worksheets
    #[error("Spreadsheet '{0}' contains no sheets")]
    SpreadsheetEmptyError(String),

    /// The workbook is encrypted
    #[error("Spreadsheet '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    /// A cell value cannot be converted to text
    #[error("Cell {0} holds '{1}' which cannot be converted to text")]
    CellValueError(String, String),

    /// The file extension does not name a supported workbook format
    #[error("Cannot detect spreadsheet format for '{0}'")]
    InvalidFileFormat(String),

    /// No sheet matches the requested name
    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),

    /// The selected sheet has no header row
    #[error("Sheet '{0}' is empty")]
    EmptySheet(String),
}

/// Common interface of the workbook readers.
pub(crate) trait Spreadsheet {
    /// Returns the file name of the workbook
    fn name(&self) -> String;

    /// Returns the worksheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Loads the shared string table; formats without one return an empty list
    fn load_shared_strings(&mut self) -> Result<Vec<String>, RustyMergeError>;

    /// Reads the worksheets accepted by the criteria
    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, RustyMergeError>;
}

/// Opens a workbook, choosing the reader from the file extension.
pub(crate) fn open_spreadsheet(path: &Path) -> Result<Box<dyn Spreadsheet>, RustyMergeError> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") | Some("xltx") | Some("xltm") => Ok(Box::new(XlsxSpreadsheet::open(path)?)),
        Some("ods") => Ok(Box::new(OdsSpreadsheet::open(path)?)),
        _ => Err(SpreadsheetError::InvalidFileFormat(path.display().to_string()).into()),
    }
}

/// Returns true when the path names a supported workbook format.
pub fn is_supported(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|extension| extension.to_str()).map(str::to_ascii_lowercase).as_deref(),
        Some("xlsx" | "xlsm" | "xltx" | "xltm" | "ods")
    )
}

/// Loads a worksheet as a table whose first row holds the column names.
///
/// # Arguments
/// * `path` - Path to the workbook
/// * `criteria` - Sheet selection and empty-row handling
pub fn load_table(path: &Path, criteria: &Criteria) -> Result<SpreadsheetTable, RustyMergeError> {
    let mut spreadsheet = open_spreadsheet(path)?;
    let mut sheets = spreadsheet.read_sheets(criteria)?;
    if sheets.is_empty() {
        let requested = criteria
            .sheet_name_patterns
            .as_ref()
            .map(|patterns| patterns.iter().map(|pattern| pattern.as_str()).collect::<Vec<_>>().join(", "))
            .unwrap_or_else(|| spreadsheet.name());
        Err(SpreadsheetError::SheetNotFound(requested))?;
    }

    let mut sheet = sheets.remove(0);
    let shared_strings = spreadsheet.load_shared_strings()?;
    sheet.resolve_shared_strings(&shared_strings);
    debug!(file = %sheet.file_name, sheet = %sheet.name, cells = sheet.cells.len(), "worksheet loaded");
    SpreadsheetTable::from_sheet(&sheet, criteria.skip_empty_rows)
}
