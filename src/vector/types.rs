//! Type-safe wrappers and core types for the vector index.

use thiserror::Error;

/// Output dimension of the all-MiniLM-L6-v2 model.
pub const VECTOR_DIMENSION_384: usize = 384;

/// Type-safe wrapper for vector dimensions.
///
/// Ensures runtime validation of vector dimensions to prevent dimension
/// mismatches between the embedder, the index and persisted artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> Result<Self, VectorError> {
        if dim == 0 {
            return Err(VectorError::InvalidDimension {
                dimension: 0,
                reason: "Vector dimension cannot be zero",
            });
        }
        Ok(Self(dim))
    }

    /// Creates a standard 384-dimensional vector dimension.
    #[must_use]
    pub const fn dimension_384() -> Self {
        Self(VECTOR_DIMENSION_384)
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has the expected dimension.
    pub fn validate_vector(&self, vector: &[f32]) -> Result<(), VectorError> {
        if vector.len() != self.0 {
            return Err(VectorError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for VectorDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A ranked search result: a chunk of corpus text and its cosine similarity
/// to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub score: f32,
}

/// Errors that can occur while building, persisting, loading or searching
/// a vector index.
#[derive(Error, Debug)]
pub enum VectorError {
    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors use the same embedding model"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector dimension: {dimension}\nReason: {reason}")]
    InvalidDimension {
        dimension: usize,
        reason: &'static str,
    },

    #[error("Cannot build an index from zero chunks")]
    EmptyCorpus,

    #[error("Storage error: {0}\nSuggestion: Check disk space and file permissions")]
    Storage(#[from] std::io::Error),

    #[error(
        "Embedding generation failed: {0}\nSuggestion: Verify the embedding model is properly initialized"
    )]
    EmbeddingFailed(String),

    #[error(
        "Serialization error: {0}\nSuggestion: Check that index data is valid and not corrupted"
    )]
    Serialization(String),

    #[error("Index artifact is corrupted: {0}\nSuggestion: Run 'askdocs index --force'")]
    Corrupted(String),

    #[error(
        "Storage version mismatch: expected {expected}, got {actual}\nSuggestion: Rebuild the index with the current version"
    )]
    VersionMismatch { expected: u32, actual: u32 },

    #[error(
        "Index was built with model '{stored}' but the embedder is '{current}'\nSuggestion: Rebuild the index or switch back to the original model"
    )]
    ModelMismatch { stored: String, current: String },

    #[error("Unknown embedding model '{0}'")]
    UnknownModel(String),
}
