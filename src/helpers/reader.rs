use crate::error::RustyMergeError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;

/// Leading bytes of an OLE compound file. Password protected OOXML packages
/// and the legacy binary Office formats are stored in this container.
const OLE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// A unified reader over either a file on disk or an in-memory buffer
pub(crate) enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// In-memory buffer, used when the bytes were already loaded
    Memory(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens a local file
    ///
    /// # Arguments
    /// * `path` - Path to the file
    ///
    /// # Returns
    /// * `Result<UnifiedReader, RustyMergeError>` - Reader for the file content
    pub(crate) fn open<P: AsRef<Path>>(path: P) -> Result<UnifiedReader, RustyMergeError> {
        let file = File::open(path)?;
        Ok(UnifiedReader::Local(BufReader::new(file)))
    }

    /// Wraps bytes that are already in memory
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> UnifiedReader {
        UnifiedReader::Memory(Cursor::new(bytes))
    }

    /// Checks whether the content is an OLE compound file rather than a zip package.
    /// The read position is restored to the start afterwards.
    pub(crate) fn is_compound_file(&mut self) -> Result<bool, RustyMergeError> {
        let mut signature = [0u8; 8];
        self.seek(SeekFrom::Start(0))?;
        let matched = match self.read_exact(&mut signature) {
            Ok(()) => signature == OLE_SIGNATURE,
            Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => false,
            Err(error) => Err(error)?,
        };
        self.seek(SeekFrom::Start(0))?;
        Ok(matched)
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Memory(reader) => reader.seek(pos),
        }
    }
}
