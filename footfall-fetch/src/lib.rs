// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Footfall Fetch
//!
//! Pulls the complete visit log from the visits API.
//!
//! ## Building Blocks
//!
//! - [`client::HttpClient`] - Pooled HTTP client with capped, jittered retries
//! - [`retry::RetryStrategy`] - Attempt cap and backoff computation
//! - [`api::VisitsApi`] - Token acquisition and page requests
//! - [`source::PageSource`] - Seam between the engine and whatever serves pages
//! - [`engine::PaginatedFetcher`] - Bounded worker pool that follows a growing total
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use footfall_fetch::{ApiConfig, EngineConfig, HttpClient, PaginatedFetcher, VisitsApi};
//!
//! let api = Arc::new(VisitsApi::new(HttpClient::new()?, ApiConfig::from_env()?));
//! let token = api.login().await?;
//!
//! let fetcher = PaginatedFetcher::new(EngineConfig::default());
//! let visits = fetcher.fetch_all(&token, api).await?;
//! ```

pub mod api;
pub mod client;
pub mod engine;
pub mod error;
pub mod retry;
pub mod source;

// Re-export key types at crate root
pub use api::{ApiConfig, Token, VisitsApi};
pub use client::HttpClient;
pub use engine::{EngineConfig, PaginatedFetcher};
pub use error::FetchError;
pub use retry::RetryStrategy;
pub use source::PageSource;
