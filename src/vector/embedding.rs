//! Embedding generation for corpus chunks and queries.
//!
//! [`EmbeddingGenerator`] is the embedding capability the index is built
//! on. Two implementations ship with the crate: [`FastEmbedGenerator`]
//! runs a local sentence-transformer through fastembed, and
//! [`HashEmbeddingGenerator`] is a deterministic bag-of-words hasher that
//! needs no model download (useful offline and in tests).

use crate::vector::{VectorDimension, VectorError};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::Path;
use std::sync::Mutex;

/// Name accepted in configuration for [`HashEmbeddingGenerator`].
pub const HASH_MODEL_NAME: &str = "hash";

/// Trait for generating embeddings from text.
///
/// Implementations must be thread-safe and deterministic: the same text
/// must always map to the same vector, otherwise a reloaded index would
/// not reproduce the search results of the index that was persisted.
pub trait EmbeddingGenerator: Send + Sync {
    /// Generate embeddings for multiple texts, one per input, in order.
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError>;

    /// Get the dimension of embeddings produced by this generator.
    #[must_use]
    fn dimension(&self) -> VectorDimension;

    /// Identifier recorded in index metadata.
    #[must_use]
    fn model_name(&self) -> &str;
}

/// FastEmbed implementation backed by a local ONNX sentence-transformer.
pub struct FastEmbedGenerator {
    model: Mutex<TextEmbedding>,
    dimension: VectorDimension,
    model_name: String,
}

impl std::fmt::Debug for FastEmbedGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedGenerator")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("model", &"<TextEmbedding>")
            .finish()
    }
}

impl FastEmbedGenerator {
    /// Create a generator for the named model, caching downloads in
    /// `cache_dir`.
    ///
    /// # Errors
    /// Returns an error if the model name is unknown or the model fails to
    /// initialize or download.
    pub fn new(model_name: &str, cache_dir: &Path, show_progress: bool) -> Result<Self, VectorError> {
        let model = parse_embedding_model(model_name)?;
        let mut text_model = TextEmbedding::try_new(
            InitOptions::new(model)
                .with_cache_dir(cache_dir.to_path_buf())
                .with_show_download_progress(show_progress),
        )
        .map_err(|e| VectorError::EmbeddingFailed(
            format!("Failed to initialize embedding model: {e}. Ensure you have internet connection for first-time model download")
        ))?;

        // Get dimensions by generating a sample embedding
        let sample = text_model
            .embed(vec!["dimension check"], None)
            .map_err(|e| VectorError::EmbeddingFailed(e.to_string()))?;
        let dimension = sample
            .first()
            .map(Vec::len)
            .ok_or_else(|| VectorError::EmbeddingFailed("Model returned no embedding".to_string()))
            .and_then(VectorDimension::new)?;

        Ok(Self {
            model: Mutex::new(text_model),
            dimension,
            model_name: model_name.to_string(),
        })
    }
}

impl EmbeddingGenerator for FastEmbedGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self
            .model
            .lock()
            .map_err(|_| {
                VectorError::EmbeddingFailed(
                    "Failed to acquire embedding model lock - model may be poisoned".to_string(),
                )
            })?
            .embed(texts.to_vec(), None)
            .map_err(|e| {
                VectorError::EmbeddingFailed(format!("Failed to generate embeddings: {e}"))
            })?;

        for embedding in &embeddings {
            self.dimension.validate_vector(embedding)?;
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Deterministic feature-hashing embedder.
///
/// Each lowercased alphanumeric token is hashed into one of `dimension`
/// buckets with a hash-derived sign, and the result is L2-normalized.
/// Texts sharing vocabulary end up close in cosine space.
#[derive(Debug, Clone)]
pub struct HashEmbeddingGenerator {
    dimension: VectorDimension,
    model_name: String,
}

impl Default for HashEmbeddingGenerator {
    fn default() -> Self {
        Self::new(VectorDimension::dimension_384())
    }
}

impl HashEmbeddingGenerator {
    #[must_use]
    pub fn new(dimension: VectorDimension) -> Self {
        Self {
            dimension,
            model_name: HASH_MODEL_NAME.to_string(),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let dim = self.dimension.get();
        let mut embedding = vec![0.0f32; dim];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a_hash(token.to_lowercase().as_bytes());
            let bucket = (hash % dim as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for val in &mut embedding {
                *val /= magnitude;
            }
        }
        embedding
    }
}

impl EmbeddingGenerator for HashEmbeddingGenerator {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// FNV-1a hash function for good distribution
fn fnv1a_hash(data: &[u8]) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET_BASIS;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Map a configuration model name onto a fastembed model.
pub fn parse_embedding_model(name: &str) -> Result<EmbeddingModel, VectorError> {
    match name {
        "AllMiniLML6V2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            Ok(EmbeddingModel::AllMiniLML6V2)
        }
        "AllMiniLML12V2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        "BGEBaseENV15" => Ok(EmbeddingModel::BGEBaseENV15),
        "MultilingualE5Small" => Ok(EmbeddingModel::MultilingualE5Small),
        other => Err(VectorError::UnknownModel(other.to_string())),
    }
}
