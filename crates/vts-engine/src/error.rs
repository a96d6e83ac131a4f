//! Error types for the engine layer.

use thiserror::Error;
use vts_archive::ArchiveError;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// `create` called with a name that is already registered.
    #[error("dataset '{0}' exists")]
    DuplicateName(String),

    /// An operation referenced a name not in the registry.
    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),

    /// Function library lookup failed.
    #[error("unknown function '{name}' in namespace '{}'", .namespace.as_deref().unwrap_or("default"))]
    UnknownFunction {
        name: String,
        namespace: Option<String>,
    },

    /// A column selection referenced a column the schema does not have.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    /// Anything raised by the archive layer (unknown versions, schema
    /// mismatches, storage faults).
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
