use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::error::DocxError;

/// Fixed, case-sensitive path of the main document markup inside the
/// package. Part of the OOXML package contract, not configurable.
pub const MAIN_DOCUMENT_PATH: &str = "word/document.xml";

/// A DOCX container read fully into memory. Read-only: this side of the
/// pipeline never writes back into the archive.
pub struct DocxPackage {
    pub entries: Vec<DocxEntry>,
}

pub struct DocxEntry {
    pub name: String,
    pub data: Vec<u8>,
}

impl DocxPackage {
    pub fn read(path: &Path) -> Result<Self, DocxError> {
        let f = File::open(path)
            .map_err(|e| DocxError::ArchiveCorrupt(format!("open {}: {e}", path.display())))?;
        Self::from_reader(f)
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, DocxError> {
        let mut zip = ZipArchive::new(reader)
            .map_err(|e| DocxError::ArchiveCorrupt(format!("read zip: {e}")))?;
        let mut entries = Vec::new();
        for i in 0..zip.len() {
            let mut file = zip
                .by_index(i)
                .map_err(|e| DocxError::ArchiveCorrupt(format!("zip entry {i}: {e}")))?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data).map_err(|e| {
                DocxError::ArchiveCorrupt(format!("read zip entry {}: {e}", file.name()))
            })?;
            entries.push(DocxEntry {
                name: file.name().to_string(),
                data,
            });
        }
        Ok(Self { entries })
    }

    /// Raw bytes of `word/document.xml`, the only entry the segmentation
    /// engine consumes.
    pub fn main_document(&self) -> Result<&[u8], DocxError> {
        self.entries
            .iter()
            .find(|e| e.name == MAIN_DOCUMENT_PATH)
            .map(|e| e.data.as_slice())
            .ok_or_else(|| {
                DocxError::EntryNotFound(format!("{MAIN_DOCUMENT_PATH} missing from package"))
            })
    }
}
