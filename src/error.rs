//! Error taxonomy for index building, index reading, and tar synthesis.
use thiserror::Error;

/// Errors produced while building, reading, or streaming a tar index.
#[derive(Debug, Error)]
pub enum Error {
    /// The index file did not start with a valid header record. The reader
    /// can still be used, but `size()` will report 0.
    #[error("missing or malformed index header")]
    MissingHeader,

    /// A `seek_and_write` filename lookup did not match any entry in the
    /// index.
    #[error("reference file not found in index")]
    MissingFile,

    /// A reader was asked to seek a second time.
    #[error("index reader has already been sought once")]
    NoSeek,

    /// The requested position lies beyond the end of the archive (including
    /// postfix and footer).
    #[error("seek position beyond end of archive")]
    SkipBoundary,

    /// The filesystem entry observed at stream time does not match the kind
    /// recorded in the index.
    #[error("index entry does not match filesystem: {0}")]
    IndexFsMismatch(String),

    /// The index recorded an entry kind this writer does not know how to
    /// emit.
    #[error("unsupported entry kind")]
    Unsupported,

    /// A path could not be encoded into a ustar header (name too long).
    #[error("path cannot be represented in ustar format: {0}")]
    Tar(String),

    /// Propagated I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
