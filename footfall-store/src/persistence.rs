//! File persistence helpers.
//!
//! Writes go through a sibling temp file that is renamed into place, so a
//! reader never sees a half-written document.

use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::StoreError;

/// Suffix appended to a file name while it is being staged.
const TEMP_SUFFIX: &str = "tmp";

/// Suffix of the copy kept while a file is being replaced.
const BACKUP_SUFFIX: &str = "bak";

// ============================================================================
// Staged Files
// ============================================================================

/// A document fully written to a temp file, waiting to be renamed into place.
///
/// Dropping a `StagedFile` without calling [`StagedFile::commit`],
/// [`StagedFile::replace`] or [`StagedFile::discard`] leaves the temp file
/// behind.
#[derive(Debug)]
#[must_use = "a staged file is not visible until committed"]
pub struct StagedFile {
    temp_path: PathBuf,
    target: PathBuf,
}

impl StagedFile {
    /// Renames the temp file over the target.
    ///
    /// If the rename fails the temp file is removed.
    pub async fn commit(self) -> Result<(), StoreError> {
        if let Err(e) = tokio::fs::rename(&self.temp_path, &self.target).await {
            let target = self.target.clone();
            self.discard().await;
            return Err(StoreError::file(target, e));
        }

        debug!(path = %self.target.display(), "JSON file committed");
        Ok(())
    }

    /// Commits, keeping the previous target aside until the returned
    /// [`Replacement`] is finished or rolled back.
    ///
    /// On failure the previous target is put back and the temp file removed.
    pub async fn replace(self) -> Result<Replacement, StoreError> {
        let target = self.target.clone();

        let backup = match move_aside(&target).await {
            Ok(backup) => backup,
            Err(e) => {
                self.discard().await;
                return Err(e);
            }
        };

        let replacement = Replacement { target, backup };
        match self.commit().await {
            Ok(()) => Ok(replacement),
            Err(e) => {
                // The target was never replaced; only a moved-aside file needs restoring.
                if replacement.backup.is_some() {
                    replacement.rollback().await;
                }
                Err(e)
            }
        }
    }

    /// Removes the temp file without touching the target.
    pub async fn discard(self) {
        if let Err(e) = tokio::fs::remove_file(&self.temp_path).await {
            warn!(path = %self.temp_path.display(), error = %e, "Failed to remove temp file");
        }
    }
}

/// A committed file whose previous contents can still be restored.
#[derive(Debug)]
#[must_use = "the previous file is kept until finished or rolled back"]
pub struct Replacement {
    target: PathBuf,
    backup: Option<PathBuf>,
}

impl Replacement {
    /// Drops the previous contents.
    pub async fn finish(self) {
        if let Some(backup) = &self.backup {
            if let Err(e) = tokio::fs::remove_file(backup).await {
                warn!(path = %backup.display(), error = %e, "Failed to remove backup");
            }
        }
    }

    /// Puts the previous contents back, or removes the target if there
    /// were none.
    pub async fn rollback(self) {
        let result = match &self.backup {
            Some(backup) => tokio::fs::rename(backup, &self.target).await,
            None => match tokio::fs::remove_file(&self.target).await {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };

        match result {
            Ok(()) => debug!(path = %self.target.display(), "Replacement rolled back"),
            Err(e) => warn!(path = %self.target.display(), error = %e, "Failed to roll back"),
        }
    }
}

/// Sibling path of `path` with `suffix` appended: `data.json` -> `data.json.tmp`.
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn temp_path_for(path: &Path) -> PathBuf {
    sibling_path(path, TEMP_SUFFIX)
}

/// Renames an existing regular file at `path` to its backup path.
///
/// Anything that is not a regular file is left where it is.
async fn move_aside(path: &Path) -> Result<Option<PathBuf>, StoreError> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) if metadata.is_file() => {
            let backup = sibling_path(path, BACKUP_SUFFIX);
            tokio::fs::rename(path, &backup)
                .await
                .map_err(|e| StoreError::file(path, e))?;
            Ok(Some(backup))
        }
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::file(path, e)),
    }
}

// ============================================================================
// File Operations
// ============================================================================

/// Creates the parent directory of `path` if it is missing.
async fn create_parent_dirs(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent).await,
        _ => Ok(()),
    }
}

/// Serializes `data` to the temp file next to `path`.
///
/// Parent directories are created. The target itself is not touched until
/// the returned [`StagedFile`] is committed.
pub async fn stage_json<T: Serialize + ?Sized>(
    path: &Path,
    data: &T,
) -> Result<StagedFile, StoreError> {
    create_parent_dirs(path).await?;

    let json = serde_json::to_string_pretty(data)?;

    let temp_path = temp_path_for(path);
    tokio::fs::write(&temp_path, &json)
        .await
        .map_err(|e| StoreError::file(&temp_path, e))?;

    debug!(path = %path.display(), bytes = json.len(), "JSON file staged");
    Ok(StagedFile {
        temp_path,
        target: path.to_path_buf(),
    })
}

/// Saves data to a JSON file.
///
/// Creates parent directories if they don't exist and writes atomically
/// (via temp file + rename).
pub async fn save_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), StoreError> {
    debug!(path = %path.display(), "Saving JSON file");
    stage_json(path, data).await?.commit().await
}

/// Loads data from a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    debug!(path = %path.display(), "Loading JSON file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StoreError::file(path, e))?;
    let data = serde_json::from_str(&content)?;

    debug!(path = %path.display(), "JSON file loaded");
    Ok(data)
}

/// Ensures a directory exists.
pub async fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "Creating directory");
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| StoreError::file(path, e))?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
