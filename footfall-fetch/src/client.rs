//! HTTP client with capped, jittered retries.
//!
//! One [`HttpClient`] owns one `reqwest` connection pool. Clones share the
//! pool, so a single client built at startup serves the whole process.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::FetchError;
use crate::retry::RetryStrategy;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How long idle pooled connections are kept open.
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// User agent string for Footfall.
const USER_AGENT: &str = concat!("footfall/", env!("CARGO_PKG_VERSION"));

/// Query parameters whose values never appear in logs or errors.
const SENSITIVE_PARAMS: &[&str] = &["token"];

/// HTTP client with retry capabilities.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    retry_strategy: RetryStrategy,
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS))
            .tcp_keepalive(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            inner: client,
            retry_strategy: RetryStrategy::default(),
        })
    }

    /// Sets the retry strategy for this client.
    pub fn with_retry_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.retry_strategy = strategy;
        self
    }

    /// Returns the retry strategy in use.
    pub fn retry_strategy(&self) -> &RetryStrategy {
        &self.retry_strategy
    }

    /// Performs a GET and returns the body, retrying failed attempts.
    ///
    /// Network errors and non-success statuses are retried until the
    /// strategy's attempt budget runs out, at which point
    /// [`FetchError::Exhausted`] is returned.
    #[instrument(skip(self, url), fields(url = %redact(url)))]
    pub async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let max_attempts = self.retry_strategy.attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            if attempt > 1 {
                let delay = self.retry_strategy.delay_for_retry(attempt - 1);
                debug!(attempt, delay = ?delay, "Backing off before retry");
                tokio::time::sleep(delay).await;
            }

            match self.send_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "Request attempt failed");

                    if !self.retry_strategy.should_retry(attempt) {
                        return Err(FetchError::Exhausted {
                            url: redact(url),
                            attempts: attempt,
                            last_error: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Performs a GET with retries and decodes the body as JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        let body = self.fetch(url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// One attempt: send, check status, read the body.
    async fn send_once(&self, url: &Url) -> Result<String, FetchError> {
        let response = self.inner.get(url.clone()).send().await?;
        let status = response.status();
        debug!(status = %status, "Response received");

        if !status.is_success() {
            return Err(FetchError::Status {
                url: redact(url),
                status,
            });
        }

        Ok(response.text().await?)
    }
}

/// Renders a URL with sensitive query values masked.
pub fn redact(url: &Url) -> String {
    if !url
        .query_pairs()
        .any(|(key, _)| SENSITIVE_PARAMS.contains(&&*key))
    {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if SENSITIVE_PARAMS.contains(&&*key) {
                "***".to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();

    let mut masked = url.clone();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_masks_token() {
        let url = Url::parse("http://host/visits?page=3&token=s3cret").unwrap();
        assert_eq!(redact(&url), "http://host/visits?page=3&token=***");
    }

    #[test]
    fn test_redact_leaves_plain_urls() {
        let url = Url::parse("http://host/login").unwrap();
        assert_eq!(redact(&url), "http://host/login");
    }

    #[test]
    fn test_client_keeps_strategy() {
        let client = HttpClient::new()
            .unwrap()
            .with_retry_strategy(RetryStrategy::new(2));
        assert_eq!(client.retry_strategy().attempts(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_host_exhausts_attempts() {
        // Port 9 on localhost is closed in test environments.
        let client = HttpClient::new().unwrap().with_retry_strategy(
            RetryStrategy::new(3)
                .with_max_delay(Duration::from_millis(1))
                .with_jitter_ms(0),
        );
        let url = Url::parse("http://127.0.0.1:9/visits?page=1&token=abc").unwrap();

        match client.fetch(&url).await {
            Err(FetchError::Exhausted { attempts, url, .. }) => {
                assert_eq!(attempts, 3);
                assert!(url.contains("token=***"));
            }
            other => panic!("expected exhausted error, got {other:?}"),
        }
    }
}
