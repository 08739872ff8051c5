//! Pull command - fetch the visit log and write reports.

use anyhow::{Context, Result};
use clap::Args;
use footfall_core::report::{self, Reports};
use footfall_fetch::engine::DEFAULT_PARALLELISM;
use footfall_fetch::retry::DEFAULT_MAX_ATTEMPTS;
use footfall_fetch::{
    ApiConfig, EngineConfig, HttpClient, PageSource, PaginatedFetcher, RetryStrategy, VisitsApi,
};
use footfall_store::ReportWriter;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::Cli;

/// Per-request timeout used when none is given, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Arguments for the pull command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PullArgs {
    /// Number of pages fetched concurrently.
    #[arg(long, short = 'j', default_value_t = DEFAULT_PARALLELISM)]
    pub parallelism: usize,

    /// Attempts per request, including the first.
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub attempts: u32,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

impl Default for PullArgs {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_PARALLELISM,
            attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Runs the pull command.
pub async fn run(args: &PullArgs, cli: &Cli) -> Result<()> {
    let api_config = match &cli.url {
        Some(url) => ApiConfig::new(url),
        None => ApiConfig::from_env(),
    }
    .context("Invalid API configuration")?;

    let writer = ReportWriter::new(&cli.out_dir);
    let reports = pull(args, api_config, &writer).await?;

    if !cli.quiet {
        println!(
            "Fetched {} visits, {} after filtering, {} names",
            reports.raw.total, reports.filtered.total, reports.visits.total
        );
        println!("Reports written to {}", writer.dir().display());
    }

    Ok(())
}

/// Logs in, fetches every page, derives the reports and writes them.
///
/// Nothing is written unless every page was fetched.
pub async fn pull(args: &PullArgs, api_config: ApiConfig, writer: &ReportWriter) -> Result<Reports> {
    let engine_config = EngineConfig::new(args.parallelism);
    engine_config
        .validate()
        .context("Invalid engine configuration")?;

    let http = HttpClient::with_timeout(Duration::from_secs(args.timeout))
        .context("Failed to build HTTP client")?
        .with_retry_strategy(RetryStrategy::new(args.attempts));

    info!(base_url = %api_config.base_url(), "Pulling visits");
    let api = Arc::new(VisitsApi::new(http, api_config));

    let token = api.login().await.context("Failed to obtain token")?;

    let fetcher = PaginatedFetcher::new(engine_config);
    let source: Arc<dyn PageSource> = api;
    let visits = fetcher
        .fetch_all(&token, source)
        .await
        .context("Failed to fetch visits")?;

    let reports = Reports::derive(visits, report::today());

    writer
        .write_all(&reports)
        .await
        .with_context(|| format!("Failed to write reports to {}", writer.dir().display()))?;

    Ok(reports)
}

// ============================================================================
// Tests
// ============================================================================
