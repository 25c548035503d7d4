use thiserror::Error;

/// Failure kinds for one document's extraction run.
///
/// Each kind is terminal for the current document: no retry, no partial
/// output. Batch callers branch on the kind to decide between
/// skip-and-continue and fail-fast.
#[derive(Debug, Error)]
pub enum DocxError {
    /// The container could not be opened or listed as a zip archive
    /// (bad format, truncated data, unsupported compression).
    #[error("archive corrupt: {0}")]
    ArchiveCorrupt(String),

    /// The archive is readable but the main document entry is missing;
    /// the file is likely not a WordprocessingML package.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// The main document entry is present but is not valid XML, or its
    /// declared encoding does not match the bytes.
    #[error("malformed markup: {0}")]
    MalformedMarkup(String),
}
