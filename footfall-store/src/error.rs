//! Store error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting reports.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// IO error on a specific file.
    #[error("IO error on {path}: {source}")]
    File {
        /// The file being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Attaches a path to an IO error.
    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::File {
            path: path.into(),
            source,
        }
    }
}
