//! Modification-time snapshots of the corpus directory.
//!
//! Only regular files directly inside the corpus directory are tracked.
//! Two snapshots are equal exactly when they list the same file names with
//! the same modification times, which is the sole signal used to decide
//! that an index must be rebuilt.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::warn;
use walkdir::WalkDir;

use super::CorpusError;

/// Point-in-time mapping of corpus file names to modification times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusSnapshot {
    files: BTreeMap<PathBuf, SystemTime>,
}

/// Serializable form of one snapshot entry, used in index metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Paths that differ between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

impl CorpusSnapshot {
    /// Capture the current state of `directory`.
    ///
    /// Subdirectories are skipped, not descended into. Symlinks are followed
    /// so a link to a regular file counts as a file.
    pub fn capture(directory: &Path) -> Result<Self, CorpusError> {
        let meta = std::fs::metadata(directory).map_err(|source| CorpusError::Unavailable {
            path: directory.to_path_buf(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(CorpusError::NotADirectory {
                path: directory.to_path_buf(),
            });
        }

        let mut files = BTreeMap::new();
        for entry in WalkDir::new(directory)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable corpus entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let modified = match entry.metadata().map(|m| m.modified()) {
                Ok(Ok(time)) => time,
                Ok(Err(e)) => {
                    warn!("No modification time for {}: {e}", entry.path().display());
                    continue;
                }
                Err(e) => {
                    warn!("Cannot stat {}: {e}", entry.path().display());
                    continue;
                }
            };
            files.insert(PathBuf::from(entry.file_name()), modified);
        }

        Ok(Self { files })
    }

    /// Rebuild a snapshot from persisted stamps.
    pub fn from_stamps(stamps: impl IntoIterator<Item = FileStamp>) -> Self {
        Self {
            files: stamps
                .into_iter()
                .map(|stamp| (stamp.path, stamp.modified))
                .collect(),
        }
    }

    /// Entries in path order, for persistence.
    pub fn stamps(&self) -> Vec<FileStamp> {
        self.files
            .iter()
            .map(|(path, modified)| FileStamp {
                path: path.clone(),
                modified: *modified,
            })
            .collect()
    }

    /// File names relative to the corpus directory, in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Describe what changed between `previous` and `self`.
    pub fn diff(&self, previous: &CorpusSnapshot) -> SnapshotDiff {
        let mut diff = SnapshotDiff::default();
        for (path, modified) in &self.files {
            match previous.files.get(path) {
                None => diff.added.push(path.clone()),
                Some(old) if old != modified => diff.modified.push(path.clone()),
                Some(_) => {}
            }
        }
        diff.removed = previous
            .files
            .keys()
            .filter(|path| !self.files.contains_key(*path))
            .cloned()
            .collect();
        diff
    }
}
