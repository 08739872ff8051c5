//! Writes the three report documents as one unit.

use footfall_core::{Listing, Reports, Visit};
use futures::future::join_all;
use futures::join;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::error::StoreError;
use crate::persistence::{Replacement, StagedFile, ensure_dir, load_json, stage_json};

/// Output directory used when none is given.
pub const DEFAULT_OUTPUT_DIR: &str = "data";

/// Raw fetched set.
pub const RAW_FILE: &str = "data.json";

/// Filtered set.
pub const FILTERED_FILE: &str = "filtered-data.json";

/// Per-name visit counts.
pub const VISITS_FILE: &str = "visits.json";

/// Locations of the report documents inside an output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// `data.json`.
    pub raw: PathBuf,
    /// `filtered-data.json`.
    pub filtered: PathBuf,
    /// `visits.json`.
    pub visits: PathBuf,
}

impl OutputPaths {
    /// Paths of the documents inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            raw: dir.join(RAW_FILE),
            filtered: dir.join(FILTERED_FILE),
            visits: dir.join(VISITS_FILE),
        }
    }
}

/// Writes [`Reports`] into an output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
    paths: OutputPaths,
}

impl ReportWriter {
    /// Creates a writer targeting `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let paths = OutputPaths::in_dir(&dir);
        Self { dir, paths }
    }

    /// The output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where each document lands.
    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    /// Writes all three documents, or none of them.
    ///
    /// Every document is staged before any is renamed into place. If staging
    /// or any rename fails, the temp files are removed and documents already
    /// renamed are rolled back, so the previous documents stay as they were.
    #[instrument(skip(self, reports), fields(dir = %self.dir.display()))]
    pub async fn write_all(&self, reports: &Reports) -> Result<(), StoreError> {
        ensure_dir(&self.dir).await?;

        let (raw, filtered, visits) = join!(
            stage_json(&self.paths.raw, &reports.raw),
            stage_json(&self.paths.filtered, &reports.filtered),
            stage_json(&self.paths.visits, &reports.visits),
        );
        let results = [raw, filtered, visits];

        let mut staged = Vec::with_capacity(results.len());
        let mut failure = None;
        for result in results {
            match result {
                Ok(file) => staged.push(file),
                Err(e) if failure.is_none() => failure = Some(e),
                Err(e) => warn!(error = %e, "Additional staging failure"),
            }
        }

        if let Some(e) = failure {
            discard_all(staged).await;
            return Err(e);
        }

        let mut replaced = Vec::with_capacity(staged.len());
        let mut pending = staged.into_iter();
        while let Some(file) = pending.next() {
            match file.replace().await {
                Ok(replacement) => replaced.push(replacement),
                Err(e) => {
                    discard_all(pending.collect()).await;
                    rollback_all(replaced).await;
                    return Err(e);
                }
            }
        }

        join_all(replaced.into_iter().map(Replacement::finish)).await;

        info!(
            raw = reports.raw.total,
            filtered = reports.filtered.total,
            names = reports.visits.total,
            "Reports written"
        );
        Ok(())
    }

    /// Reads back the raw document written by a previous pull.
    pub async fn read_raw(&self) -> Result<Listing<Visit>, StoreError> {
        read_listing(&self.paths.raw).await
    }
}

/// Reads a `{ total, data }` visit document from `path`.
///
/// `total` is recomputed from `data` when the two disagree.
pub async fn read_listing(path: &Path) -> Result<Listing<Visit>, StoreError> {
    let listing: Listing<Visit> = load_json(path).await?;

    if listing.total != listing.data.len() {
        warn!(
            path = %path.display(),
            total = listing.total,
            items = listing.data.len(),
            "Document total disagrees with its data"
        );
        return Ok(Listing::new(listing.data));
    }

    Ok(listing)
}

async fn discard_all(staged: Vec<StagedFile>) {
    join_all(staged.into_iter().map(StagedFile::discard)).await;
}

async fn rollback_all(replaced: Vec<Replacement>) {
    for replacement in replaced.into_iter().rev() {
        replacement.rollback().await;
    }
}
