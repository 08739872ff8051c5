//! Fetch error types.

use thiserror::Error;

/// Error type for fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Unexpected status {status} from {url}")]
    Status {
        /// Redacted request URL.
        url: String,
        /// Status code returned.
        status: reqwest::StatusCode,
    },

    /// Every attempt allowed by the retry strategy failed.
    #[error("Fetch exhausted after {attempts} attempts for {url}: {last_error}")]
    Exhausted {
        /// Redacted request URL.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// The failure of the final attempt.
        last_error: String,
    },

    /// The body arrived but is not the documented shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Login failed; nothing else can run without a token.
    #[error("Token acquisition failed: {0}")]
    Token(#[source] Box<FetchError>),

    /// A page failed; the whole pull is abandoned.
    #[error("Page {page} failed: {source}")]
    Page {
        /// 1-based page index.
        page: u32,
        /// Underlying failure.
        #[source]
        source: Box<FetchError>,
    },

    /// The pull was cancelled before it drained.
    #[error("Fetch cancelled")]
    Cancelled,

    /// A worker task died without reporting an error.
    #[error("Worker failed: {0}")]
    Worker(String),
}

impl FetchError {
    /// Returns true if a single request failing this way is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Http(_) | FetchError::Status { .. })
    }
}

impl From<url::ParseError> for FetchError {
    fn from(err: url::ParseError) -> Self {
        FetchError::InvalidUrl(err.to_string())
    }
}
