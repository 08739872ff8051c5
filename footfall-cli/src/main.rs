// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Footfall CLI - pulls the visit log and writes visit reports.
//!
//! # Examples
//!
//! ```bash
//! # Pull everything into ./data
//! FOOTFALL_URL=https://visits.example.com footfall
//!
//! # Explicit base URL, output directory and worker count
//! footfall --url https://visits.example.com --out-dir reports pull --parallelism 8
//!
//! # Re-derive the reports from an earlier data.json without fetching
//! footfall report --input reports/data.json
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use footfall_fetch::FetchError;
use footfall_store::{DEFAULT_OUTPUT_DIR, StoreError};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{pull, report};

// ============================================================================
// CLI Definition
// ============================================================================

/// Footfall CLI - visit log puller.
#[derive(Parser)]
#[command(name = "footfall")]
#[command(about = "Pulls a paginated visit log and writes visit reports")]
#[command(long_about = r#"
Footfall logs in to the visits API, pulls every page of the visit log
(following the total as it grows), and writes three documents:

  data.json            everything that was fetched
  filtered-data.json   weekday visits, de-duplicated, excluding today
  visits.json          visit counts per name over the filtered set

Examples:
  footfall                           # Pull into ./data
  footfall --out-dir reports         # Pull into ./reports
  footfall report --input data.json  # Rebuild reports offline
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'pull' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Base URL of the visits API. Falls back to the `url` variable.
    #[arg(long, env = "FOOTFALL_URL", global = true)]
    pub url: Option<String>,

    /// Directory the reports are written to.
    #[arg(long, short, default_value = DEFAULT_OUTPUT_DIR, global = true)]
    pub out_dir: PathBuf,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Quiet mode (no logs, no summary).
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the visit log and write reports (default if no command specified).
    #[command(visible_alias = "p")]
    Pull(pull::PullArgs),

    /// Rebuild reports from a previously written raw document.
    #[command(visible_alias = "r")]
    Report(report::ReportArgs),
}

/// CLI exit codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Missing or invalid configuration.
    Config = 2,
    /// Login or page fetch failed.
    Fetch = 3,
    /// Reports could not be read or written.
    Store = 4,
}

impl ExitCode {
    /// Picks the exit code for a failed command.
    pub fn for_error(error: &anyhow::Error) -> Self {
        if let Some(fetch) = error.downcast_ref::<FetchError>() {
            return match fetch {
                FetchError::InvalidConfig(_) | FetchError::InvalidUrl(_) => ExitCode::Config,
                _ => ExitCode::Fetch,
            };
        }
        if error.downcast_ref::<StoreError>().is_some() {
            return ExitCode::Store;
        }
        ExitCode::Error
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("footfall=debug,info")
    } else {
        EnvFilter::new("footfall=info,warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Some(Commands::Pull(args)) => pull::run(args, &cli).await,
        Some(Commands::Report(args)) => report::run(args, &cli).await,
        None => pull::run(&pull::PullArgs::default(), &cli).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_defaults_to_pull() {
        let cli = Cli::try_parse_from(["footfall"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.out_dir, PathBuf::from("data"));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_pull_arguments() {
        let cli = Cli::try_parse_from([
            "footfall",
            "pull",
            "--parallelism",
            "8",
            "--url",
            "http://localhost:3000",
            "--out-dir",
            "out",
        ])
        .unwrap();

        assert_eq!(cli.url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(cli.out_dir, PathBuf::from("out"));
        match cli.command {
            Some(Commands::Pull(args)) => assert_eq!(args.parallelism, 8),
            _ => panic!("expected pull command"),
        }
    }

    #[test]
    fn test_report_arguments() {
        let cli = Cli::try_parse_from(["footfall", "report", "--input", "old/data.json"]).unwrap();
        match cli.command {
            Some(Commands::Report(args)) => {
                assert_eq!(args.input, Some(PathBuf::from("old/data.json")));
            }
            _ => panic!("expected report command"),
        }
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["footfall", "--verbose", "--quiet"]).is_err());
    }

    #[test]
    fn test_exit_code_mapping() {
        let config = anyhow::Error::new(FetchError::InvalidConfig("x".into())).context("setup");
        assert_eq!(ExitCode::for_error(&config), ExitCode::Config);

        let fetch: Result<()> = Err(FetchError::Cancelled).context("pull");
        assert_eq!(ExitCode::for_error(&fetch.unwrap_err()), ExitCode::Fetch);

        let store = anyhow::Error::new(StoreError::Io(std::io::Error::other("disk")));
        assert_eq!(ExitCode::for_error(&store), ExitCode::Store);

        assert_eq!(ExitCode::for_error(&anyhow::anyhow!("other")), ExitCode::Error);
    }
}
