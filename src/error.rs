//! Error types for the document question-answering system
//!
//! This module provides structured error types using thiserror. Fatal
//! index failures, recoverable generation failures, soft persistence
//! failures and boundary validation failures are separate types so the
//! caller can tell them apart without inspecting messages.

use crate::corpus::CorpusError;
use crate::vector::VectorError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while obtaining a usable vector index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The corpus directory could not be listed.
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    /// The corpus contains no extractable chunks, so no index can exist.
    #[error(
        "Corpus '{directory}' yielded no text chunks. Add readable text files before starting"
    )]
    EmptyCorpus { directory: PathBuf },

    /// No index could be built or loaded.
    ///
    /// This is fatal: the service must not accept turns without an index.
    /// Index builds have no timeout, so a build that hangs on the embedding
    /// backend blocks every caller waiting for the first index.
    #[error("Failed to initialize index for '{directory}': {reason}")]
    Initialization { directory: PathBuf, reason: String },

    /// The manager was asked for an index over a directory it does not own.
    #[error("Index manager serves '{expected}', not '{actual}'")]
    DirectoryMismatch { expected: PathBuf, actual: PathBuf },

    /// Embedding, storage or search failure inside the index itself.
    #[error(transparent)]
    Vector(#[from] VectorError),
}

impl IndexError {
    /// Get a stable status code for this error type.
    pub fn status_code(&self) -> String {
        match self {
            Self::Corpus(_) => "CORPUS_UNAVAILABLE",
            Self::EmptyCorpus { .. } => "EMPTY_CORPUS",
            Self::Initialization { .. } => "INITIALIZATION_FAILED",
            Self::DirectoryMismatch { .. } => "DIRECTORY_MISMATCH",
            Self::Vector(_) => "VECTOR_ERROR",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Corpus(_) => vec![
                "Check that corpus_dir in .askdocs/settings.toml points to an existing directory",
                "Ensure the process has read permission on the corpus directory",
            ],
            Self::EmptyCorpus { .. } => vec![
                "Add at least one non-empty text file to the corpus directory",
            ],
            Self::Initialization { .. } => vec![
                "Run 'askdocs index --force' to rebuild the index from scratch",
                "Check that the embedding model can be downloaded or is cached locally",
            ],
            _ => vec![],
        }
    }

    /// True when the failure leaves the process without any usable index.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::EmptyCorpus { .. } | Self::Initialization { .. } | Self::Corpus(_)
        )
    }
}

/// Errors from the generation capability.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation backend is not configured: {reason}")]
    NotConfigured { reason: String },

    #[error("Generation request failed: {0}")]
    Request(String),

    #[error("Generation backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Generation backend returned an unexpected response: {reason}")]
    InvalidResponse { reason: String },
}

/// Errors from the durable stores. Always soft: a failed write never
/// fails a turn or an index build.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to write to '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode row: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Malformed row at '{path}' line {line}: {source}")]
    Decode {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Store rejected the insert: {reason}")]
    Rejected { reason: String },
}

/// Boundary validation failures. Reported as structured results, never
/// propagated past the boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid email format: '{email}'")]
    InvalidEmail { email: String },
}

/// Errors that abort a single conversation turn.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] VectorError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl ChatError {
    /// Get a stable status code for this error type.
    pub fn status_code(&self) -> String {
        match self {
            Self::Index(e) => return e.status_code(),
            Self::Retrieval(_) => "RETRIEVAL_FAILED",
            Self::Generation(_) => "GENERATION_FAILED",
            Self::InvalidConfig { .. } => "CONFIG_ERROR",
        }
        .to_string()
    }
}

/// Result type alias for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Result type alias for conversation turns
pub type ChatResult<T> = Result<T, ChatError>;
