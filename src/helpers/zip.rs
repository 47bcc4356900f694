//! ZIP archive helper utilities for the OOXML and OpenDocument packages
//! Provides convenient methods for accessing files within ZIP archives

use crate::error::RustyMergeError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

/// Helper trait for ZIP archive operations with specialized reader creation
pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Gets a file from the ZIP archive by name (case-insensitive, path separator agnostic)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, RustyMergeError>;

    /// Creates an XML reader for a file within the ZIP archive
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, RustyMergeError>;

    /// Reads the whole content of a file within the ZIP archive
    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, RustyMergeError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    /// Gets a file from the ZIP archive by name, trying the exact name first and then
    /// a case-insensitive match with path separator normalization (backslash to forward slash)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, RustyMergeError> {
        let pattern = name.replace('\\', "/");
        let path = self.index_for_name(&pattern).or_else(|| {
            self.file_names()
                .find(|file_name| pattern.eq_ignore_ascii_case(file_name))
                .map(str::to_owned)
                .and_then(|file_name| self.index_for_name(&file_name))
        });
        let Some(index) = path else {
            return Ok(None);
        };
        match self.by_index(index) {
            Ok(file) => Ok(Some(file)),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, RustyMergeError> {
        let reader = self
            .file(name)?
            .map(|file| XmlReader::new(BufReader::new(file)));
        Ok(reader)
    }

    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, RustyMergeError> {
        let mut file = match self.file(name)? {
            Some(file) => file,
            None => return Ok(None),
        };
        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }
}

/// Lists the archive entries matching a predicate, in archive order
pub(crate) fn entry_names<RS, F>(zip: &ZipArchive<RS>, predicate: F) -> Vec<String>
where
    RS: Read + Seek,
    F: Fn(&str) -> bool,
{
    zip.file_names()
        .filter(|&name| predicate(name))
        .map(str::to_owned)
        .collect()
}
