//! Immutable in-memory vector index over corpus chunks.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::corpus::CorpusSnapshot;
use crate::vector::metadata::{IndexMetadata, METADATA_FILE};
use crate::vector::storage::{self, ENTRIES_FILE};
use crate::vector::{EmbeddingGenerator, SearchHit, VectorDimension, VectorError};

/// Number of chunks embedded per generator call when building.
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 64;

/// One indexed chunk and its embedding.
#[derive(Debug, Clone)]
struct IndexEntry {
    text: String,
    vector: Vec<f32>,
}

/// A set of embedded chunks supporting cosine top-k search.
///
/// An index never changes after it is built or loaded. Rebuilding produces
/// a new `VectorIndex`, so readers holding an `Arc` to the old one keep a
/// consistent view.
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimension: VectorDimension,
    embedder: Arc<dyn EmbeddingGenerator>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("entries", &self.entries.len())
            .field("dimension", &self.dimension)
            .field("model_name", &self.embedder.model_name())
            .finish()
    }
}

impl VectorIndex {
    /// Embed `chunks` and build an index over them.
    ///
    /// # Errors
    /// [`VectorError::EmptyCorpus`] when `chunks` is empty, or any error the
    /// embedder reports.
    pub fn build(
        chunks: Vec<String>,
        embedder: Arc<dyn EmbeddingGenerator>,
    ) -> Result<Self, VectorError> {
        Self::build_with_batch_size(chunks, embedder, DEFAULT_EMBEDDING_BATCH_SIZE)
    }

    pub fn build_with_batch_size(
        chunks: Vec<String>,
        embedder: Arc<dyn EmbeddingGenerator>,
        batch_size: usize,
    ) -> Result<Self, VectorError> {
        if chunks.is_empty() {
            return Err(VectorError::EmptyCorpus);
        }

        let dimension = embedder.dimension();
        let mut entries = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<&str> = batch.iter().map(String::as_str).collect();
            let vectors = embedder.generate_embeddings(&texts)?;
            if vectors.len() != batch.len() {
                return Err(VectorError::EmbeddingFailed(format!(
                    "Embedder returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            for (text, vector) in batch.iter().zip(vectors) {
                dimension.validate_vector(&vector)?;
                entries.push(IndexEntry {
                    text: text.clone(),
                    vector,
                });
            }
            debug!("Embedded {}/{} chunks", entries.len(), chunks.len());
        }

        info!(
            "Built index with {} chunks using model '{}'",
            entries.len(),
            embedder.model_name()
        );

        Ok(Self {
            entries,
            dimension,
            embedder,
        })
    }

    /// Write the index and its metadata into `dir`.
    ///
    /// `corpus` is recorded so a later process can tell whether the artifact
    /// still matches the directory it was built from.
    pub fn persist(&self, dir: &Path, corpus: &CorpusSnapshot) -> Result<(), VectorError> {
        let entries: Vec<_> = self.entries().collect();
        storage::write_entries(dir, self.dimension, &entries)?;

        IndexMetadata::new(
            self.embedder.model_name(),
            self.dimension.get(),
            self.entries.len(),
        )
        .with_corpus(corpus)
        .save(dir)?;

        info!("Persisted {} chunks to {}", self.entries.len(), dir.display());
        Ok(())
    }

    /// Load a persisted index, using `embedder` for future queries.
    ///
    /// # Errors
    /// Fails when the artifact is missing or corrupted, or when it was built
    /// with a different model or dimension than `embedder` produces.
    pub fn load(dir: &Path, embedder: Arc<dyn EmbeddingGenerator>) -> Result<Self, VectorError> {
        let metadata = IndexMetadata::load(dir)?;
        if metadata.model_name != embedder.model_name() {
            return Err(VectorError::ModelMismatch {
                stored: metadata.model_name,
                current: embedder.model_name().to_string(),
            });
        }

        let (dimension, raw) = storage::read_entries(dir)?;
        if dimension != embedder.dimension() || dimension.get() != metadata.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: embedder.dimension().get(),
                actual: dimension.get(),
            });
        }
        if raw.len() != metadata.entry_count {
            return Err(VectorError::Corrupted(format!(
                "Metadata lists {} entries but storage holds {}",
                metadata.entry_count,
                raw.len()
            )));
        }

        let entries = raw
            .into_iter()
            .map(|(text, vector)| IndexEntry { text, vector })
            .collect::<Vec<_>>();
        debug!("Loaded {} chunks from {}", entries.len(), dir.display());

        Ok(Self {
            entries,
            dimension,
            embedder,
        })
    }

    /// Check whether both artifact files are present in `dir`.
    pub fn exists(dir: &Path) -> bool {
        dir.join(ENTRIES_FILE).exists() && dir.join(METADATA_FILE).exists()
    }

    /// Return up to `k` chunks most similar to `query`, best first.
    ///
    /// Chunks with equal scores keep their build order.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, VectorError> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .generate_embeddings(&[query])?
            .into_iter()
            .next()
            .ok_or_else(|| {
                VectorError::EmbeddingFailed("No embedding returned for query".to_string())
            })?;
        self.dimension.validate_vector(&query_vector)?;

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(&query_vector, &entry.vector)))
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchHit {
                text: self.entries[i].text.clone(),
                score,
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Chunk texts in build order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.text.as_str())
    }

    /// Chunk texts with their embeddings, in build order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.entries
            .iter()
            .map(|e| (e.text.as_str(), e.vector.as_slice()))
    }
}

/// Calculate cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
