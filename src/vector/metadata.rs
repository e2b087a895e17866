//! Metadata persisted next to an index artifact.
//!
//! Records the embedding model, the vector dimension and the corpus
//! snapshot the index was built from, so a later process can decide
//! whether the artifact on disk is still usable.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::corpus::{CorpusSnapshot, FileStamp};
use crate::vector::VectorError;

/// File name of the metadata inside an index directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Metadata for index persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Name of the embedding model used
    pub model_name: String,

    /// Dimension of embeddings
    pub dimension: usize,

    /// Number of chunks stored
    pub entry_count: usize,

    pub created_at: DateTime<Utc>,

    /// Version of the metadata format
    pub version: u32,

    /// Corpus files and modification times at build time
    #[serde(default)]
    pub corpus: Vec<FileStamp>,
}

impl IndexMetadata {
    /// Current metadata version
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(model_name: impl Into<String>, dimension: usize, entry_count: usize) -> Self {
        Self {
            model_name: model_name.into(),
            dimension,
            entry_count,
            created_at: Utc::now(),
            version: Self::CURRENT_VERSION,
            corpus: Vec::new(),
        }
    }

    /// Attach the corpus snapshot the index was built from.
    pub fn with_corpus(mut self, snapshot: &CorpusSnapshot) -> Self {
        self.corpus = snapshot.stamps();
        self
    }

    /// The recorded corpus as a comparable snapshot.
    pub fn corpus_snapshot(&self) -> CorpusSnapshot {
        CorpusSnapshot::from_stamps(self.corpus.iter().cloned())
    }

    /// Save metadata to `dir/metadata.json`.
    pub fn save(&self, dir: &Path) -> Result<(), VectorError> {
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| VectorError::Serialization(format!("Failed to serialize metadata: {e}")))?;
        let tmp_path = dir.join(format!("{METADATA_FILE}.tmp"));
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, dir.join(METADATA_FILE))?;
        Ok(())
    }

    /// Load metadata from `dir/metadata.json`.
    pub fn load(dir: &Path) -> Result<Self, VectorError> {
        let json = std::fs::read_to_string(dir.join(METADATA_FILE))?;

        let metadata: Self = serde_json::from_str(&json)
            .map_err(|e| VectorError::Corrupted(format!("Failed to parse metadata: {e}")))?;

        if metadata.version != Self::CURRENT_VERSION {
            return Err(VectorError::VersionMismatch {
                expected: Self::CURRENT_VERSION,
                actual: metadata.version,
            });
        }

        Ok(metadata)
    }

    /// Check if metadata file exists
    pub fn exists(dir: &Path) -> bool {
        dir.join(METADATA_FILE).exists()
    }
}
