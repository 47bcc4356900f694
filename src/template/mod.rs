//! # Template Module
//!
//! Loads document templates, discovers their `{{field}}` placeholders and renders
//! them with per-row values. WordprocessingML (`.docx`, `.docm`, `.dotx`) and
//! OpenDocument text (`.odt`, `.ott`) packages are rewritten part by part; any
//! other file is treated as a UTF-8 text template.
pub(crate) mod fields;
pub(crate) mod package;
pub(crate) mod render;

use crate::error::ResultMessage;
use crate::error::RustyMergeError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::zip::entry_names;
use crate::helpers::zip::ZipHelper;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

const WORD_PARAGRAPH: QName = QName(b"w:p");
const WORD_TEXT: QName = QName(b"w:t");
const ODF_PARAGRAPH: QName = QName(b"text:p");
const ODF_HEADING: QName = QName(b"text:h");

/// Errors raised while loading, rendering or checking a template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template '{0}' is not a valid document package: {1}")]
    InvalidPackage(String, String),

    #[error("Template '{0}' is password protected")]
    PasswordProtected(String),

    #[error("Template '{0}' has no document body")]
    MissingPart(String),

    #[error("Template '{0}' is not UTF-8 text")]
    InvalidText(String),

    #[error("Document '{0}' is malformed: {1}")]
    MalformedOutput(String, String),
}

/// Kind of template, decided by the file extension.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TemplateFormat {
    /// WordprocessingML package
    Docx,
    /// OpenDocument text package
    Odt,
    /// Plain UTF-8 text
    Text,
}

impl TemplateFormat {
    /// Detects the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("docx" | "docm" | "dotx" | "dotm") => TemplateFormat::Docx,
            Some("odt" | "ott") => TemplateFormat::Odt,
            _ => TemplateFormat::Text,
        }
    }

    /// Returns true for zip based formats.
    pub fn is_package(&self) -> bool {
        *self != TemplateFormat::Text
    }

    /// Returns the rank of a package entry that may hold placeholders, body first.
    pub(crate) fn part_rank(&self, name: &str) -> Option<usize> {
        match self {
            TemplateFormat::Docx => {
                let file = name.strip_prefix("word/")?;
                if file.contains('/') || !file.ends_with(".xml") {
                    None
                } else if file == "document.xml" {
                    Some(0)
                } else if file.starts_with("header") {
                    Some(1)
                } else if file.starts_with("footer") {
                    Some(2)
                } else if file == "footnotes.xml" {
                    Some(3)
                } else if file == "endnotes.xml" {
                    Some(4)
                } else {
                    None
                }
            }
            TemplateFormat::Odt => match name {
                "content.xml" => Some(0),
                "styles.xml" => Some(1),
                _ => None,
            },
            TemplateFormat::Text => None,
        }
    }

    /// Returns true for the elements whose text forms one paragraph.
    pub(crate) fn is_paragraph(&self, name: QName) -> bool {
        match self {
            TemplateFormat::Docx => name == WORD_PARAGRAPH,
            TemplateFormat::Odt => name == ODF_PARAGRAPH || name == ODF_HEADING,
            TemplateFormat::Text => false,
        }
    }

    /// Element wrapping the visible text of a paragraph. `None` means every text
    /// node inside the paragraph is visible.
    pub(crate) fn text_element(&self) -> Option<QName<'static>> {
        match self {
            TemplateFormat::Docx => Some(WORD_TEXT),
            _ => None,
        }
    }
}

/// A template loaded in memory with the parts that may hold placeholders.
#[derive(Debug)]
pub struct DocumentTemplate {
    path: PathBuf,
    format: TemplateFormat,
    /// Raw bytes of the template file
    source: Vec<u8>,
    /// Templated parts as (entry name, text), body first
    parts: Vec<(String, String)>,
}

impl DocumentTemplate {
    /// Loads a template from disk.
    pub fn load(path: &Path) -> Result<Self, RustyMergeError> {
        let file_name = path.display().to_string();
        let source = std::fs::read(path)
            .map_err(RustyMergeError::from)
            .with_prefix(&format!("Cannot read template '{file_name}'"))?;
        let format = TemplateFormat::from_path(path);

        let parts = if format.is_package() {
            let mut reader = UnifiedReader::from_bytes(source.to_owned());
            if reader.is_compound_file()? {
                Err(TemplateError::PasswordProtected(file_name.to_owned()))?;
            }
            let mut zip = ZipArchive::new(reader)
                .map_err(|error| TemplateError::InvalidPackage(file_name.to_owned(), error.to_string()))?;
            load_parts(&mut zip, format, &file_name)?
        } else {
            let text = String::from_utf8(source.to_owned())
                .map_err(|_| TemplateError::InvalidText(file_name.to_owned()))?;
            vec![(file_name.to_owned(), text)]
        };

        debug!(template = %file_name, ?format, parts = parts.len(), "template loaded");
        Ok(DocumentTemplate {
            path: path.to_path_buf(),
            format,
            source,
            parts,
        })
    }

    pub fn format(&self) -> TemplateFormat {
        self.format
    }

    /// Extension given to the generated documents, taken verbatim from the template.
    pub fn extension(&self) -> String {
        Self::extension_of(&self.path)
    }

    /// Extension of a template path, empty when it has none.
    pub fn extension_of(path: &Path) -> String {
        path.extension()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
            .to_owned()
    }

    /// Placeholder names in discovery order, without duplicates.
    pub fn fields(&self) -> Result<Vec<String>, RustyMergeError> {
        fields::extract_fields(&self.parts, self.format)
    }

    /// Renders every templated part, returning the changed parts only.
    pub fn render(&self, context: &HashMap<String, String>) -> Result<Vec<(String, Vec<u8>)>, RustyMergeError> {
        let mut rendered = Vec::new();
        for (name, content) in &self.parts {
            let output = if self.format.is_package() {
                render::render_part(content, self.format, context)
                    .with_prefix(&format!("Cannot render '{name}'"))?
            } else {
                render::render_text(content, context)
            };
            if output != *content {
                rendered.push((name.to_owned(), output.into_bytes()));
            }
        }
        Ok(rendered)
    }

    /// Writes a rendered document to `output`.
    pub fn write(&self, rendered: &[(String, Vec<u8>)], output: &Path) -> Result<(), RustyMergeError> {
        if self.format.is_package() {
            let replacements: HashMap<&str, &[u8]> = rendered
                .iter()
                .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
                .collect();
            package::write_package(&self.source, &replacements, output)
        } else {
            let bytes = rendered
                .first()
                .map(|(_, bytes)| bytes.as_slice())
                .unwrap_or(self.source.as_slice());
            std::fs::write(output, bytes)?;
            Ok(())
        }
    }

    /// Re-opens a written document as a structured document of this template's format.
    pub fn verify(&self, output: &Path) -> Result<(), RustyMergeError> {
        package::verify(output, self.format)
    }
}

/// Reads the templated parts of a package, body first.
fn load_parts(
    zip: &mut ZipArchive<UnifiedReader>,
    format: TemplateFormat,
    file_name: &str,
) -> Result<Vec<(String, String)>, RustyMergeError> {
    let mut names = entry_names(zip, |name| format.part_rank(name).is_some());
    if names.is_empty() {
        Err(TemplateError::MissingPart(file_name.to_owned()))?;
    }
    names.sort_by_key(|name| format.part_rank(name));

    let mut parts = Vec::with_capacity(names.len());
    for name in names {
        let bytes = zip
            .read_bytes(&name)?
            .ok_or_else(|| TemplateError::MissingPart(file_name.to_owned()))?;
        parts.push((name, String::from_utf8(bytes)?));
    }
    Ok(parts)
}
