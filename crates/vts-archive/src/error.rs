//! Error types for the archive layer.

use crate::manager::ArchiveId;
use thiserror::Error;
use vts_core::diff::DiffError;

/// Errors that can occur in archive operations.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A version outside `[0, latest]` was referenced.
    #[error("unknown version: {version}")]
    UnknownVersion { version: u64, latest: Option<u64> },

    /// The submitted table cannot be reconciled against history.
    #[error("invalid schema: {0}")]
    InvalidSchema(#[from] DiffError),

    /// The archive manager has no archive under this identifier.
    #[error("unknown archive: {0}")]
    UnknownArchive(ArchiveId),

    /// Underlying storage failure; surfaced, never retried.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Persisted state could not be decoded.
    #[error("corrupt archive state: {0}")]
    Corrupt(String),
}

impl ArchiveError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;
