//! Document corpus access: change detection and chunk extraction.
//!
//! A corpus is a flat directory of text files. [`CorpusSnapshot`] records
//! each file's modification time so the index manager can tell whether the
//! index is still current; [`CorpusLoader`] turns the files into chunks for
//! embedding.

mod loader;
mod watcher;

pub use loader::{CorpusLoader, DEFAULT_MAX_CHUNK_CHARS};
pub use watcher::{CorpusSnapshot, FileStamp, SnapshotDiff};

use std::path::PathBuf;
use thiserror::Error;

/// Errors specific to reading the corpus directory
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error(
        "Cannot read corpus directory '{path}': {source}\nSuggestion: Verify the path exists and you have read permissions"
    )]
    Unavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corpus path '{path}' is not a directory")]
    NotADirectory { path: PathBuf },
}
