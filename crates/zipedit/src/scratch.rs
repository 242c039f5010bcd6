//! Disposable working directories, one per extract or repack.
//!
//! Directories are named `extract-<timestamp>-from-zipedit-<random>` under the
//! scratch root. [`ScratchSpace::release`] removes the directory and logs a
//! failure instead of returning it; dropping an unreleased space still removes
//! the directory (silently), so an unwinding operation leaks nothing.

use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;
use tracing::{debug, warn};

const SCRATCH_PREFIX: &str = "extract-";
const SCRATCH_MARKER: &str = "-from-zipedit-";

/// A uniquely named directory owned by exactly one operation.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
    created_at: DateTime<Utc>,
}

impl ScratchSpace {
    /// Create a fresh directory under `parent`, creating `parent` if needed.
    pub fn create_in(parent: &Path) -> std::io::Result<Self> {
        let created_at = Utc::now();
        let prefix = format!(
            "{}{}{}",
            SCRATCH_PREFIX,
            created_at.format("%Y-%m-%dT%H-%M-%S-%3fZ"),
            SCRATCH_MARKER
        );

        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .rand_bytes(12)
            .tempdir_in(parent)?;

        debug!(path = %dir.path().display(), "Created scratch directory");
        Ok(Self { dir, created_at })
    }

    /// [`create_in`](Self::create_in) on the blocking thread pool.
    pub async fn acquire(parent: PathBuf) -> std::io::Result<Self> {
        tokio::task::spawn_blocking(move || Self::create_in(&parent))
            .await
            .map_err(std::io::Error::other)?
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Remove the directory. Failures are logged, never returned.
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %path.display(), "Removed scratch directory"),
            Err(source) => {
                let err = PipelineError::ScratchCleanupFailed { path, source };
                warn!(error = %err, "Scratch cleanup failed");
            }
        }
    }

    /// [`release`](Self::release) on the blocking thread pool.
    pub async fn dispose(self) {
        if let Err(e) = tokio::task::spawn_blocking(move || self.release()).await {
            warn!(error = %e, "Scratch cleanup task failed");
        }
    }
}

/// A scratch directory left behind by an earlier process.
#[derive(Debug, Clone)]
pub struct LeftoverScratch {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

/// Whether a directory name follows the scratch naming pattern.
pub fn is_scratch_name(name: &str) -> bool {
    name.starts_with(SCRATCH_PREFIX) && name.contains(SCRATCH_MARKER)
}

/// List scratch directories under `root`.
pub fn find_leftovers(root: &Path) -> std::io::Result<Vec<LeftoverScratch>> {
    let mut leftovers = Vec::new();

    for entry in std::fs::read_dir(root)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable temp entry");
                continue;
            }
        };

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !is_scratch_name(name) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) if m.is_dir() => m,
            _ => continue,
        };

        leftovers.push(LeftoverScratch {
            path: entry.path(),
            modified: metadata.modified().ok(),
        });
    }

    leftovers.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(leftovers)
}

/// Remove every leftover scratch directory under `root`.
///
/// Returns how many were removed; directories that cannot be removed are
/// logged and skipped.
pub fn remove_leftovers(root: &Path) -> std::io::Result<usize> {
    let mut removed = 0;

    for leftover in find_leftovers(root)? {
        match std::fs::remove_dir_all(&leftover.path) {
            Ok(()) => removed += 1,
            Err(source) => {
                let err = PipelineError::ScratchCleanupFailed {
                    path: leftover.path,
                    source,
                };
                warn!(error = %err, "Leftover cleanup failed");
            }
        }
    }

    Ok(removed)
}
