//! Visits API client.

use async_trait::async_trait;
use footfall_core::VisitPage;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::client::HttpClient;
use crate::error::FetchError;
use crate::source::PageSource;

// ============================================================================
// Constants
// ============================================================================

/// Environment variable holding the API base URL.
pub const BASE_URL_ENV: &str = "FOOTFALL_URL";

/// Older name of [`BASE_URL_ENV`], still honoured.
pub const LEGACY_BASE_URL_ENV: &str = "url";

/// Login endpoint, relative to the base URL.
const LOGIN_ENDPOINT: &str = "login";

/// Visits endpoint, relative to the base URL.
const VISITS_ENDPOINT: &str = "visits";

// ============================================================================
// Token
// ============================================================================

/// Session token presented on every page request.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Wraps a raw token.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Response from the login endpoint.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Token,
}

// ============================================================================
// Configuration
// ============================================================================

/// Where the visits API lives.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    base_url: Url,
}

impl ApiConfig {
    /// Creates a config from a base URL.
    ///
    /// A trailing slash is added if missing so endpoints resolve below the
    /// base path rather than replacing its last segment.
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let mut base_url = Url::parse(base_url.trim())?;

        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(format!(
                "{base_url} cannot be used as a base URL"
            )));
        }

        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { base_url })
    }

    /// Reads the base URL from `FOOTFALL_URL`, falling back to `url`.
    pub fn from_env() -> Result<Self, FetchError> {
        let raw = std::env::var(BASE_URL_ENV)
            .or_else(|_| std::env::var(LEGACY_BASE_URL_ENV))
            .map_err(|_| {
                FetchError::InvalidConfig(format!(
                    "no API base URL; set {BASE_URL_ENV} or pass --url"
                ))
            })?;
        Self::new(&raw)
    }

    /// Returns the normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of the login endpoint.
    pub fn login_url(&self) -> Result<Url, FetchError> {
        Ok(self.base_url.join(LOGIN_ENDPOINT)?)
    }

    /// URL of one visits page: `<base>/visits?page=<n>&token=<token>`.
    pub fn page_url(&self, page: u32, token: &Token) -> Result<Url, FetchError> {
        let mut url = self.base_url.join(VISITS_ENDPOINT)?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("token", token.as_str());
        Ok(url)
    }
}

// ============================================================================
// API Client
// ============================================================================

/// Visits API client.
#[derive(Debug, Clone)]
pub struct VisitsApi {
    http: HttpClient,
    config: ApiConfig,
}

impl VisitsApi {
    /// Creates a new client over a shared HTTP client.
    pub fn new(http: HttpClient, config: ApiConfig) -> Self {
        Self { http, config }
    }

    /// Obtains a session token.
    #[instrument(skip(self))]
    pub async fn login(&self) -> Result<Token, FetchError> {
        let url = self.config.login_url()?;
        debug!("Requesting token");

        let response: LoginResponse = self.http.get_json(&url).await.map_err(|e| {
            warn!(error = %e, "Failed to obtain token");
            FetchError::Token(Box::new(e))
        })?;

        info!("Token acquired");
        Ok(response.token)
    }

    /// Fetches one page of visits.
    #[instrument(skip(self, token))]
    pub async fn fetch_page(&self, page: u32, token: &Token) -> Result<VisitPage, FetchError> {
        let url = self.config.page_url(page, token)?;

        let body = self.http.fetch(&url).await?;
        let parsed: VisitPage = serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "Failed to parse visits page");
            FetchError::Json(e)
        })?;

        debug!(total = parsed.total, items = parsed.len(), "Page decoded");
        Ok(parsed)
    }
}

#[async_trait]
impl PageSource for VisitsApi {
    async fn fetch_page(&self, page: u32, token: &Token) -> Result<VisitPage, FetchError> {
        VisitsApi::fetch_page(self, page, token).await
    }
}

// ============================================================================
// Tests
// ============================================================================
