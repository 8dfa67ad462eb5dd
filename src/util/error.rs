//! Error types for the archive access layer.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for archive operations.
///
/// Per-resource failures (a corrupt entry, an index past the end of a table)
/// are absorbed at the resolver/decoder boundary and surface as absent or
/// empty results; only a load deadline or a missing mandatory file is allowed
/// to escalate out of startup.
#[derive(Error, Debug)]
pub enum Error {
    /// Backing file does not exist; the owning category is disabled.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic bytes at the start of an archive.
    #[error("Invalid archive: bad magic number")]
    InvalidMagic,

    /// A read would pass the declared end of the source.
    #[error("Unexpected end of data at position {0}")]
    Truncated(u64),

    /// Index beyond a table's declared bounds.
    #[error("Index {index} out of bounds (count: {count})")]
    OutOfRange { index: usize, count: usize },

    /// Corrupt compressed stream or malformed run data.
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Unknown compression flag in an archive entry.
    #[error("Unsupported compression flag: {0}")]
    UnsupportedCompression(u16),

    /// The parallel load did not finish before the deadline.
    #[error("Loading files timeout: {0}")]
    LoadTimeout(String),

    /// A category that cannot be missing was not found.
    #[error("Mandatory resource missing: {0}")]
    MandatoryMissing(String),

    /// Memory mapping failed.
    #[error("Memory mapping failed: {0}")]
    MmapFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a decode error from a message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;
