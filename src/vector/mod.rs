//! Vector storage and search over corpus chunks.
//!
//! # Architecture
//! Chunks are embedded once at build time and kept in memory as a flat
//! list. Search is an exhaustive cosine scan, which is fast enough for the
//! corpus sizes a single Q&A deployment serves. A built index can be
//! persisted as a binary entry file plus JSON metadata and memory-mapped
//! back in by a later process.

mod embedding;
mod index;
mod metadata;
mod storage;
mod types;

// Re-export core types for public API
pub use embedding::{
    EmbeddingGenerator, FastEmbedGenerator, HASH_MODEL_NAME, HashEmbeddingGenerator,
    parse_embedding_model,
};
pub use index::{DEFAULT_EMBEDDING_BATCH_SIZE, VectorIndex, cosine_similarity};
pub use metadata::{IndexMetadata, METADATA_FILE};
pub use types::{SearchHit, VECTOR_DIMENSION_384, VectorDimension, VectorError};
