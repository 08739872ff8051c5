//! Core error types for Footfall.

use thiserror::Error;

/// Core error type for Footfall model operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid data in an API payload or stored document.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
