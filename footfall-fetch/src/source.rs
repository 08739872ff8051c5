//! Page source trait.
//!
//! The engine does not know where pages come from; it only needs something
//! that can serve page `n` for a token. [`crate::api::VisitsApi`] is the
//! production source, tests plug in scripted ones.

use async_trait::async_trait;
use footfall_core::VisitPage;

use crate::api::Token;
use crate::error::FetchError;

/// Serves one page of the visit log.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches 1-based page `page`.
    ///
    /// Implementations do their own retrying; an error returned here is
    /// final for this page.
    async fn fetch_page(&self, page: u32, token: &Token) -> Result<VisitPage, FetchError>;
}
