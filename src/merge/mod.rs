//! # Merge Module
//!
//! Turns one spreadsheet row into one document: placeholders are bound to
//! columns, a filename is composed from selected columns, and every row is
//! rendered through the template independently of the others.
pub mod batch;
pub mod filename;
pub mod generator;
pub mod job;
pub mod mapping;
pub mod sanitize;

use thiserror::Error;

/// Problems found before any document is written.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Please select a {0} file")]
    NotSelected(&'static str),

    #[error("Spreadsheet '{0}' does not exist")]
    MissingSpreadsheet(String),

    #[error("Spreadsheet '{0}' is not an .xlsx, .xlsm, .xltx, .xltm or .ods workbook")]
    UnsupportedSpreadsheet(String),

    #[error("Spreadsheet '{0}' has no data rows")]
    EmptySpreadsheet(String),

    #[error("Template '{0}' does not exist")]
    MissingTemplate(String),

    #[error("No template fields found in '{0}'. Make sure fields are formatted as {{{{field_name}}}}")]
    NoFields(String),

    #[error("Please map the following template fields: {}", .0.join(", "))]
    UnmappedFields(Vec<String>),

    #[error("Field '{0}' is mapped to column '{1}' which is not in the spreadsheet")]
    UnknownColumn(String, String),

    #[error("Please select at least one column for the filename pattern")]
    NoFilenameColumn,

    #[error("Filename column '{0}' is not in the spreadsheet")]
    UnknownFilenameColumn(String),

    #[error("Please select an output directory")]
    MissingOutputDirectory,

    #[error("Output directory '{0}' is not a directory")]
    InvalidOutputDirectory(String),
}

/// Failure to produce the document of a single row.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Cannot load template: {0}")]
    TemplateLoad(String),

    #[error("Cannot render document: {0}")]
    Render(String),

    #[error("Cannot write document: {0}")]
    Write(String),

    #[error("Written document failed the integrity check: {0}")]
    Integrity(String),
}
