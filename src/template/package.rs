//! Writing rendered packages and checking them afterwards.
use crate::error::RustyMergeError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::zip::entry_names;
use crate::helpers::zip::ZipHelper;
use crate::template::TemplateError;
use crate::template::TemplateFormat;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Cursor;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use tracing::debug;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::ZipArchive;
use zip::ZipWriter;

/// Copies the template package to `output`, replacing the rendered parts.
///
/// Entries keep their order, compression method, modification time and
/// permissions, so an ODF `mimetype` entry stays first and stored.
pub(crate) fn write_package(
    source: &[u8],
    replacements: &HashMap<&str, &[u8]>,
    output: &Path,
) -> Result<(), RustyMergeError> {
    let mut zip = ZipArchive::new(Cursor::new(source))?;
    let mut writer = ZipWriter::new(BufWriter::new(File::create(output)?));

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let name = entry.name().to_owned();

        let mut options = SimpleFileOptions::default().compression_method(entry.compression());
        if let Some(time) = entry.last_modified() {
            options = options.last_modified_time(time);
        }
        if let Some(mode) = entry.unix_mode() {
            options = options.unix_permissions(mode);
        }

        if entry.is_dir() {
            writer.add_directory(name, options)?;
            continue;
        }

        let data = match replacements.get(name.as_str()) {
            Some(bytes) => {
                debug!(part = %name, bytes = bytes.len(), "writing rendered part");
                bytes.to_vec()
            }
            None => {
                let mut bytes = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut bytes)?;
                bytes
            }
        };
        writer.start_file(name, options)?;
        writer.write_all(&data)?;
    }

    writer.finish()?.flush()?;
    Ok(())
}

/// Re-opens a written document as a structured document.
///
/// Packages must open as zip archives whose templated parts are well-formed XML;
/// text documents must be valid UTF-8.
pub(crate) fn verify(path: &Path, format: TemplateFormat) -> Result<(), RustyMergeError> {
    let file_name = path.display().to_string();
    if !format.is_package() {
        let bytes = std::fs::read(path)?;
        return match std::str::from_utf8(&bytes) {
            Ok(_) => Ok(()),
            Err(error) => Err(TemplateError::MalformedOutput(file_name, error.to_string()).into()),
        };
    }

    let mut zip = ZipArchive::new(UnifiedReader::open(path)?)?;
    let names = entry_names(&zip, |name| format.part_rank(name).is_some());
    if names.is_empty() {
        Err(TemplateError::MissingPart(file_name.to_owned()))?;
    }
    for name in names {
        let entry = zip
            .file(&name)?
            .ok_or_else(|| TemplateError::MissingPart(file_name.to_owned()))?;
        check_xml(BufReader::new(entry))
            .map_err(|error| TemplateError::MalformedOutput(format!("{file_name}:{name}"), error.to_string()))?;
    }
    Ok(())
}

/// Reads an XML document to the end with end tag checking enabled.
fn check_xml<R: BufRead>(source: R) -> Result<(), quick_xml::Error> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().check_end_names = true;
    let mut buffer = Vec::new();
    loop {
        if let Event::Eof = reader.read_event_into(&mut buffer)? {
            return Ok(());
        }
        buffer.clear();
    }
}

/// Returns true when the error means the zip container itself could not be read.
pub(crate) fn is_malformed_container(error: &RustyMergeError) -> bool {
    matches!(
        error,
        RustyMergeError::ZipError(ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) | ZipError::Io(_))
    )
}

/// Rewrites the file's bytes unchanged, giving the file system a fresh copy.
pub(crate) fn rewrite_in_place(path: &Path) -> Result<(), RustyMergeError> {
    let bytes = std::fs::read(path)?;
    std::fs::write(path, bytes)?;
    Ok(())
}
