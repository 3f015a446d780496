//! Error types for the document store.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while loading or persisting a document.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The backing file exists but does not hold a valid document.
    #[error("{} does not contain a valid document: {source}", path.display())]
    Corruption {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The in-memory value could not be encoded as JSON.
    #[error("failed to encode document: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A blocking I/O task was cancelled or panicked.
    #[error("background task failed: {0}")]
    TaskJoin(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}
