//! Report command - rebuild reports from an earlier raw document.

use anyhow::{Context, Result};
use clap::Args;
use footfall_core::report::{self, Reports};
use footfall_store::{ReportWriter, read_listing};
use std::path::PathBuf;
use tracing::info;

use crate::Cli;

/// Arguments for the report command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportArgs {
    /// Raw document to read. Defaults to `data.json` in the output directory.
    #[arg(long, short)]
    pub input: Option<PathBuf>,
}

/// Runs the report command.
pub async fn run(args: &ReportArgs, cli: &Cli) -> Result<()> {
    let writer = ReportWriter::new(&cli.out_dir);
    let reports = rebuild(args, &writer).await?;

    if !cli.quiet {
        println!(
            "Rebuilt reports from {} visits, {} after filtering, {} names",
            reports.raw.total, reports.filtered.total, reports.visits.total
        );
    }

    Ok(())
}

/// Reads the raw document and rewrites all three reports from it.
pub async fn rebuild(args: &ReportArgs, writer: &ReportWriter) -> Result<Reports> {
    let input = args
        .input
        .clone()
        .unwrap_or_else(|| writer.paths().raw.clone());

    info!(input = %input.display(), "Rebuilding reports");
    let listing = read_listing(&input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let reports = Reports::derive(listing.into_data(), report::today());

    writer
        .write_all(&reports)
        .await
        .with_context(|| format!("Failed to write reports to {}", writer.dir().display()))?;

    Ok(reports)
}
