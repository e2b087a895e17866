//! Durable mirror of every indexed chunk and its embedding.
//!
//! The persisted vector index is what a restart loads. The mirror is an
//! append-only record keyed by chunk text, so a chunk that has been stored
//! once is never written again, even across rebuilds.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::PersistenceError;

/// One mirrored chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEmbedding {
    pub text: String,
    pub embedding: Vec<f32>,
}

/// Counts from one [`EmbeddingStore::mirror`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorOutcome {
    pub stored: usize,
    pub skipped: usize,
}

pub trait EmbeddingStore: Send + Sync {
    /// Texts already present in the store.
    fn stored_texts(&self) -> Result<HashSet<String>, PersistenceError>;

    fn append(&self, rows: &[StoredEmbedding]) -> Result<(), PersistenceError>;

    /// Every stored row, in insertion order.
    fn load_all(&self) -> Result<Vec<StoredEmbedding>, PersistenceError>;

    /// Store each `(text, embedding)` whose text is not stored yet.
    ///
    /// Duplicate texts within `entries` are stored once.
    fn mirror(&self, entries: &[(&str, &[f32])]) -> Result<MirrorOutcome, PersistenceError> {
        let mut known = self.stored_texts()?;
        let mut rows = Vec::new();
        let mut skipped = 0;

        for (text, embedding) in entries {
            if known.insert((*text).to_string()) {
                rows.push(StoredEmbedding {
                    text: (*text).to_string(),
                    embedding: embedding.to_vec(),
                });
            } else {
                skipped += 1;
            }
        }

        if !rows.is_empty() {
            self.append(&rows)?;
        }
        Ok(MirrorOutcome {
            stored: rows.len(),
            skipped,
        })
    }
}

/// Appends one JSON object per chunk to a file.
#[derive(Debug)]
pub struct JsonlEmbeddingStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlEmbeddingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_rows(&self) -> Result<Vec<StoredEmbedding>, PersistenceError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let mut rows = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| PersistenceError::Read {
                path: self.path.clone(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let row = serde_json::from_str(&line).map_err(|source| PersistenceError::Decode {
                path: self.path.clone(),
                line: i + 1,
                source,
            })?;
            rows.push(row);
        }
        Ok(rows)
    }
}

impl EmbeddingStore for JsonlEmbeddingStore {
    fn stored_texts(&self) -> Result<HashSet<String>, PersistenceError> {
        Ok(self.read_rows()?.into_iter().map(|row| row.text).collect())
    }

    fn append(&self, rows: &[StoredEmbedding]) -> Result<(), PersistenceError> {
        let mut buffer = Vec::new();
        for row in rows {
            serde_json::to_writer(&mut buffer, row)?;
            buffer.push(b'\n');
        }

        let write_error = |source: std::io::Error| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };
        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_error)?;
        file.write_all(&buffer).map_err(write_error)?;

        debug!("Appended {} embeddings to {}", rows.len(), self.path.display());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<StoredEmbedding>, PersistenceError> {
        let rows = self.read_rows()?;
        info!("Loaded {} embeddings from {}", rows.len(), self.path.display());
        Ok(rows)
    }
}
