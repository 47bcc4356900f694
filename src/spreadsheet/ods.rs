use crate::error::RustyMergeError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::path::Path;
use thiserror::Error;
use zip::ZipArchive;

/// ODS file MIME type identifier
const MIME_TYPE: &[u8] = b"application/vnd.oasis.opendocument.spreadsheet";
/// XML element name for table (sheet)
const TABLE: QName = QName(b"table:table");
/// XML element name for table row
const TABLE_ROW: QName = QName(b"table:table-row");
/// XML element name for table cell
const TABLE_CELL: QName = QName(b"table:table-cell");
/// XML element name for covered table cell (merged cells)
const TABLE_COVERED_CELL: QName = QName(b"table:covered-table-cell");
/// XML element name for annotations (comments)
const ANNOTATION: QName = QName(b"office:annotation");
/// XML element name for paragraph text
const PARAGRAPH: QName = QName(b"text:p");
/// XML element name for string (space) text
const SPACE: QName = QName(b"text:s");
const TAB: QName = QName(b"text:tab");
const LINE_BREAK: QName = QName(b"text:line-break");

/// Error types specific to ODS spreadsheet processing
#[derive(Error, Debug)]
pub enum OdsError {
    /// Invalid ODS MIME type detected in file
    #[error("Invalid ODS MIME type in '{0}'")]
    MimeTypeError(String),
}

/// ODS spreadsheet handler for reading OpenDocument Spreadsheet files
pub(crate) struct OdsSpreadsheet {
    /// Name of the ODS file
    pub(crate) name: String,
    /// ZIP archive containing the ODS file contents
    zip: ZipArchive<UnifiedReader>,
    /// Table names in document order
    sheets: Vec<String>,
}

impl OdsSpreadsheet {
    /// Opens an ODS file and validates its format
    pub(crate) fn open(path: &Path) -> Result<Self, RustyMergeError> {
        let file_name = path.display().to_string();
        let mut zip = ZipArchive::new(UnifiedReader::open(path)?)?;
        check_mime(&mut zip, &file_name)?;
        if is_password_protected(&mut zip)? {
            Err(SpreadsheetError::SpreadsheetPasswordProtectedError(file_name.to_owned()))?;
        }
        let sheets = load_sheet_names(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()))?;
        }
        Ok(OdsSpreadsheet {
            name: file_name,
            zip,
            sheets,
        })
    }
}

impl Spreadsheet for OdsSpreadsheet {
    fn name(&self) -> String {
        self.name.to_owned()
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.to_owned()
    }

    /// ODS stores strings inline, so there is no shared string table.
    fn load_shared_strings(&mut self) -> Result<Vec<String>, RustyMergeError> {
        Ok(Vec::new())
    }

    fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, RustyMergeError> {
        let mut sheets = Vec::<Sheet>::new();
        let mut current: Option<Sheet> = None;
        let mut reader = self.zip
            .xml_reader("content.xml")?
            .ok_or_else(|| SpreadsheetError::FileError("content.xml".to_string()))?;

        // Cell position and repetition
        let mut row = 0usize;
        let mut col = 0usize;
        let mut row_count = 1usize;
        let mut col_count = 1usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        // Whether the text children of the current cell form its value
        let mut element_context = false;
        let mut comment_context = false;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TABLE => {
                if criteria.is_exhausted(sheets.len()) {
                    break;
                }
                let table_name = event.get_attribute_value("table:name")?.unwrap_or_default();
                if criteria.accept(&table_name) {
                    current = Some(Sheet::new(&self.name, &table_name));
                    row = 0;
                }
            }
            Event::End(event) if event.name() == TABLE => {
                if let Some(sheet) = current.take() {
                    sheets.push(sheet);
                }
            }
            Event::Start(event) if current.is_some() && event.name() == TABLE_ROW => {
                row_count = event.parse_attribute_value("table:number-rows-repeated")?.unwrap_or(1);
                col = 0;
            }
            Event::End(event) if current.is_some() && event.name() == TABLE_ROW => {
                row += row_count;
            }
            Event::Start(event) if current.is_some() && (event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL) => {
                value.clear();
                element_context = false;
                col_count = event.parse_attribute_value::<usize>("table:number-columns-repeated")?.unwrap_or(1);
                let value_type = event.get_attribute_value("office:value-type")?.map(|it| it.into_owned());
                let is_error = event.get_attribute_value("calcext:value-type")?
                    .map(|it| it == "error")
                    .unwrap_or(false);
                kind = match value_type.as_deref() {
                    None => CellType::Empty,
                    Some("boolean") => CellType::Boolean,
                    Some("date") => CellType::IsoDateTime,
                    Some("time") => CellType::IsoDuration,
                    Some("string") if is_error => CellType::Error,
                    Some("string") => CellType::InlineString,
                    Some(_) => CellType::Number,
                };

                match value_type.as_deref() {
                    Some("string") => element_context = true,
                    Some("boolean") => {
                        let truth = event.get_attribute_value("office:boolean-value")?
                            .map(|it| it != "false" && it != "0")
                            .unwrap_or(false);
                        value.push(if truth { '1' } else { '0' });
                    }
                    Some("date") => if let Some(data) = event.get_attribute_value("office:date-value")? {
                        value.push_str(&data);
                    }
                    Some("time") => if let Some(data) = event.get_attribute_value("office:time-value")? {
                        value.push_str(&data);
                    }
                    Some(_) => if let Some(data) = event.get_attribute_value("office:value")? {
                        value.push_str(&data);
                    }
                    None => (),
                }
            }
            Event::End(event) if current.is_some() && (event.name() == TABLE_CELL || event.name() == TABLE_COVERED_CELL) => {
                if let Some(sheet) = current.as_mut() {
                    if kind != CellType::Empty && !value.is_empty() {
                        for row_offset in 0..row_count {
                            for col_offset in 0..col_count {
                                sheet.push(Cell {
                                    row: row + row_offset,
                                    col: col + col_offset,
                                    kind,
                                    value: value.to_owned(),
                                });
                            }
                        }
                    }
                }
                col += col_count;
                element_context = false;
                comment_context = false;
            }
            // String content of the cell
            Event::Start(event) if element_context && event.name() == ANNOTATION => comment_context = true,
            Event::End(event) if element_context && comment_context && event.name() == ANNOTATION => comment_context = false,
            Event::Start(event) if element_context && !comment_context && event.name() == PARAGRAPH => {
                if !value.is_empty() {
                    value.push('\n');
                }
            }
            Event::Start(event) if element_context && !comment_context && event.name() == SPACE => {
                let count = event.parse_attribute_value("text:c")?.unwrap_or(1);
                for _ in 0..count {
                    value.push(' ');
                }
            }
            Event::Start(event) if element_context && !comment_context && event.name() == TAB => value.push('\t'),
            Event::Start(event) if element_context && !comment_context && event.name() == LINE_BREAK => value.push('\n'),
            Event::Text(event) if element_context && !comment_context => value.push_bytes_text(&event)?,
            Event::GeneralRef(event) if element_context && !comment_context => value.push_bytes_ref(&event)?,
        });

        Ok(sheets)
    }
}

/// Validates that the ZIP archive contains a valid ODS file by checking MIME type
fn check_mime(zip: &mut ZipArchive<UnifiedReader>, file_name: &str) -> Result<(), RustyMergeError> {
    if let Some(mime_type) = zip.read_bytes("mimetype")? {
        if mime_type.trim_ascii() != MIME_TYPE {
            Err(OdsError::MimeTypeError(file_name.to_owned()))?;
        }
    }
    Ok(())
}

/// Collects the table names declared in content.xml
fn load_sheet_names(zip: &mut ZipArchive<UnifiedReader>) -> Result<Vec<String>, RustyMergeError> {
    let mut reader = zip.xml_reader("content.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("content.xml".to_string()))?;
    let mut names = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TABLE => {
            names.push(event.get_attribute_value("table:name")?.unwrap_or_default().to_string());
        }
    });
    Ok(names)
}

/// Checks if the ODS file is password protected by examining the manifest
fn is_password_protected(zip: &mut ZipArchive<UnifiedReader>) -> Result<bool, RustyMergeError> {
    let mut reader = match zip.xml_reader("META-INF/manifest.xml")? {
        Some(reader) => reader,
        None => return Ok(false),
    };
    let mut in_file_entry = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = true,
        Event::End(event) if event.name() == QName(b"manifest:file-entry") => in_file_entry = false,
        Event::Start(event) if in_file_entry && event.name() == QName(b"manifest:encryption-data") => {
            return Ok(true);
        }
    });
    Ok(false)
}
