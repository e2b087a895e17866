#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use askdocs::error::{GenerationError, PersistenceError};
use askdocs::vector::{VectorDimension, VectorError};
use askdocs::{
    EmbeddingGenerator, Generation, Generator, HashEmbeddingGenerator, IndexManager,
    InsertOutcome, SessionRow, SessionStore, Turn,
};
use parking_lot::Mutex;
use tempfile::TempDir;

/// A corpus directory and a separate directory for the persisted index.
pub struct TestCorpus {
    pub docs: TempDir,
    pub store: TempDir,
}

impl TestCorpus {
    pub fn new() -> Self {
        Self {
            docs: TempDir::new().expect("Failed to create temp dir"),
            store: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Write a document with a fixed modification time `offset_secs` after
    /// a base instant, so change detection never depends on clock
    /// resolution.
    pub fn add_file(&self, name: &str, content: &str, offset_secs: u64) -> PathBuf {
        let path = self.docs.path().join(name);
        fs::write(&path, content).expect("Failed to write file");
        let file = fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .expect("Failed to reopen file");
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + offset_secs))
            .expect("Failed to set mtime");
        path
    }

    pub fn path(&self) -> &Path {
        self.docs.path()
    }

    pub fn index_path(&self) -> PathBuf {
        self.store.path().join("index")
    }

    pub fn manager(&self, embedder: Arc<dyn EmbeddingGenerator>) -> IndexManager {
        IndexManager::new(self.path(), self.index_path(), embedder)
    }
}

/// Hash embedder that counts calls and can be switched to fail.
#[derive(Default)]
pub struct CountingEmbedder {
    inner: HashEmbeddingGenerator,
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub delay_ms: u64,
}

impl CountingEmbedder {
    pub fn slow(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingGenerator for CountingEmbedder {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(VectorError::EmbeddingFailed("embedding backend unavailable".to_string()));
        }
        if self.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.delay_ms));
        }
        self.inner.generate_embeddings(texts)
    }

    fn dimension(&self) -> VectorDimension {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Hash embedder that, once armed, holds its next call until the test
/// releases it.
///
/// The embedding thread meets the test at `entered`, then waits at
/// `release`. Only one call is held per arming.
pub struct GatedEmbedder {
    inner: HashEmbeddingGenerator,
    pub armed: AtomicBool,
    pub entered: Barrier,
    pub release: Barrier,
}

impl Default for GatedEmbedder {
    fn default() -> Self {
        Self {
            inner: HashEmbeddingGenerator::default(),
            armed: AtomicBool::new(false),
            entered: Barrier::new(2),
            release: Barrier::new(2),
        }
    }
}

impl EmbeddingGenerator for GatedEmbedder {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.wait();
            self.release.wait();
        }
        self.inner.generate_embeddings(texts)
    }

    fn dimension(&self) -> VectorDimension {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Generator that answers from the context it was given.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<(String, String, usize)>>,
    pub fail: AtomicBool,
}

impl Generator for ScriptedGenerator {
    fn generate(
        &self,
        question: &str,
        context: &str,
        history: &[Turn],
    ) -> Result<Generation, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(GenerationError::Status {
                status: 503,
                body: "overloaded".to_string(),
            });
        }
        self.seen
            .lock()
            .push((question.to_string(), context.to_string(), history.len()));
        Ok(Generation::new(format!("Based on the handbook: {context}")))
    }
}

/// In-memory session store, optionally failing every insert.
#[derive(Default)]
pub struct RecordingStore {
    pub rows: Mutex<Vec<SessionRow>>,
    pub inserts: AtomicUsize,
    pub fail: bool,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl SessionStore for RecordingStore {
    fn insert(&self, rows: &[SessionRow]) -> Result<InsertOutcome, PersistenceError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PersistenceError::Rejected {
                reason: "database unreachable".to_string(),
            });
        }
        self.rows.lock().extend_from_slice(rows);
        Ok(InsertOutcome {
            success: true,
            rows_affected: rows.len(),
        })
    }
}

pub mod sample_docs {
    pub const LIBRARY: &str = "The central library opens at nine in the morning.\n\n\
        Borrowed books must be returned within fourteen days.";

    pub const EXAMS: &str = "Exam results are published on the student portal.\n\n\
        Quiz schedules are announced two weeks in advance.";
}
