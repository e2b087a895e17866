//! Shared owner of the current vector index for a corpus directory.
//!
//! Every request re-snapshots the corpus. An unchanged corpus is served
//! from memory without touching the embedder; a changed one triggers a
//! rebuild that replaces the published index and snapshot in one step.
//!
//! Two locks are involved:
//! - `published` (read-mostly) holds the index readers get an `Arc` to
//! - `rebuild_lock` serializes builds; it is never held by searches

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::corpus::{CorpusLoader, CorpusSnapshot};
use crate::error::{IndexError, IndexResult};
use crate::storage::{EmbeddingStore, JsonlEmbeddingStore};
use crate::vector::{
    DEFAULT_EMBEDDING_BATCH_SIZE, EmbeddingGenerator, IndexMetadata, SearchHit, VectorIndex,
};

/// Lifecycle state of the managed index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// No index has been loaded or built yet.
    Uninitialized,
    /// The published index matches the last observed corpus.
    Loaded,
    /// The corpus changed since the published index was built.
    Stale,
    /// A replacement index is being built; readers get the previous one.
    Rebuilding,
}

impl std::fmt::Display for IndexState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Loaded => "loaded",
            Self::Stale => "stale",
            Self::Rebuilding => "rebuilding",
        };
        f.write_str(name)
    }
}

struct Published {
    state: IndexState,
    current: Option<(Arc<VectorIndex>, CorpusSnapshot)>,
}

pub struct IndexManager {
    corpus_dir: PathBuf,
    index_path: PathBuf,
    loader: CorpusLoader,
    embedder: Arc<dyn EmbeddingGenerator>,
    embedding_store: Option<Arc<dyn EmbeddingStore>>,
    batch_size: usize,
    published: RwLock<Published>,
    rebuild_lock: Mutex<()>,
    rebuilds: AtomicUsize,
}

impl std::fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("corpus_dir", &self.corpus_dir)
            .field("index_path", &self.index_path)
            .field("state", &self.state())
            .field("rebuilds", &self.rebuild_count())
            .finish()
    }
}

impl IndexManager {
    /// Create a manager for `corpus_dir` that persists its index under
    /// `index_path`. Nothing is read until the first request.
    pub fn new(
        corpus_dir: impl Into<PathBuf>,
        index_path: impl Into<PathBuf>,
        embedder: Arc<dyn EmbeddingGenerator>,
    ) -> Self {
        Self {
            corpus_dir: corpus_dir.into(),
            index_path: index_path.into(),
            loader: CorpusLoader::default(),
            embedder,
            embedding_store: None,
            batch_size: DEFAULT_EMBEDDING_BATCH_SIZE,
            published: RwLock::new(Published {
                state: IndexState::Uninitialized,
                current: None,
            }),
            rebuild_lock: Mutex::new(()),
            rebuilds: AtomicUsize::new(0),
        }
    }

    pub fn from_settings(settings: &Settings, embedder: Arc<dyn EmbeddingGenerator>) -> Self {
        let manager = Self::new(&settings.corpus_dir, &settings.index_path, embedder)
            .with_loader(CorpusLoader::new(settings.indexing.max_chunk_chars))
            .with_batch_size(settings.indexing.embedding_batch_size);
        match &settings.storage.embeddings_path {
            Some(path) => manager.with_embedding_store(Arc::new(JsonlEmbeddingStore::new(path))),
            None => manager,
        }
    }

    /// Mirror every built chunk and its embedding into `store`.
    pub fn with_embedding_store(mut self, store: Arc<dyn EmbeddingStore>) -> Self {
        self.embedding_store = Some(store);
        self
    }

    pub fn with_loader(mut self, loader: CorpusLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn corpus_dir(&self) -> &Path {
        &self.corpus_dir
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn state(&self) -> IndexState {
        self.published.read().state
    }

    /// Number of build passes run by this manager. Loading a persisted
    /// artifact does not count.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds.load(Ordering::SeqCst)
    }

    /// Return an index that reflects `directory` as of this call.
    ///
    /// While another caller rebuilds a stale index, this returns the
    /// previous index instead of waiting. Only callers that have no index
    /// to fall back on block on the rebuild.
    ///
    /// # Errors
    /// [`IndexError::DirectoryMismatch`] for a directory this manager does
    /// not serve, [`IndexError::EmptyCorpus`] or
    /// [`IndexError::Initialization`] when no first index can be produced.
    pub fn get_current_index(&self, directory: &Path) -> IndexResult<Arc<VectorIndex>> {
        if directory != self.corpus_dir {
            return Err(IndexError::DirectoryMismatch {
                expected: self.corpus_dir.clone(),
                actual: directory.to_path_buf(),
            });
        }
        self.current()
    }

    /// Search the current index without holding any manager lock during
    /// the scan.
    pub fn search(&self, query: &str, k: usize) -> IndexResult<Vec<SearchHit>> {
        let index = self.current()?;
        Ok(index.search(query, k)?)
    }

    /// Build a fresh index from the corpus regardless of any persisted or
    /// in-memory one, and publish it.
    pub fn force_rebuild(&self) -> IndexResult<Arc<VectorIndex>> {
        let _guard = self.rebuild_lock.lock();
        let snapshot = CorpusSnapshot::capture(&self.corpus_dir)?;
        let had_index = self.published.read().current.is_some();

        if had_index {
            self.set_state(IndexState::Rebuilding);
        }
        match self.build(&snapshot) {
            Ok(index) => Ok(self.publish(index, snapshot)),
            // The published index keeps serving, so the failure is not fatal
            Err(e) if had_index => {
                self.set_state(IndexState::Loaded);
                Err(e)
            }
            Err(e) => {
                self.set_state(IndexState::Uninitialized);
                Err(self.initialization_error(e))
            }
        }
    }

    fn current(&self) -> IndexResult<Arc<VectorIndex>> {
        let snapshot = CorpusSnapshot::capture(&self.corpus_dir)?;
        if let Some(index) = self.fresh_index(&snapshot) {
            return Ok(index);
        }
        self.mark_stale(&snapshot);

        let _guard = match self.rebuild_lock.try_lock() {
            Some(guard) => guard,
            None => {
                let previous = self.published_index();
                if let Some(index) = previous {
                    debug!("Rebuild in progress; serving previous index");
                    return Ok(index);
                }
                self.rebuild_lock.lock()
            }
        };

        // The corpus or the published index may have moved while waiting.
        let snapshot = CorpusSnapshot::capture(&self.corpus_dir)?;
        if let Some(index) = self.fresh_index(&snapshot) {
            self.settle_stale();
            return Ok(index);
        }

        let previous = self.published.read().current.clone();
        match previous {
            None => self.initialize(snapshot),
            Some((index, recorded)) => Ok(self.refresh(index, &recorded, snapshot)),
        }
    }

    fn fresh_index(&self, snapshot: &CorpusSnapshot) -> Option<Arc<VectorIndex>> {
        let published = self.published.read();
        match &published.current {
            Some((index, recorded)) if recorded == snapshot => Some(Arc::clone(index)),
            _ => None,
        }
    }

    fn published_index(&self) -> Option<Arc<VectorIndex>> {
        self.published
            .read()
            .current
            .as_ref()
            .map(|(index, _)| Arc::clone(index))
    }

    /// Mark the published index stale if it was built from a snapshot other
    /// than `observed`. A rebuild may have published a matching index since
    /// the caller last looked.
    fn mark_stale(&self, observed: &CorpusSnapshot) {
        let mut published = self.published.write();
        let outdated = published
            .current
            .as_ref()
            .is_some_and(|(_, recorded)| recorded != observed);
        if published.state == IndexState::Loaded && outdated {
            published.state = IndexState::Stale;
        }
    }

    /// Called with the rebuild lock held and a fresh index published.
    fn settle_stale(&self) {
        let mut published = self.published.write();
        if published.state == IndexState::Stale {
            published.state = IndexState::Loaded;
        }
    }

    fn set_state(&self, state: IndexState) {
        self.published.write().state = state;
    }

    fn publish(&self, index: VectorIndex, snapshot: CorpusSnapshot) -> Arc<VectorIndex> {
        let index = Arc::new(index);
        let mut published = self.published.write();
        published.current = Some((Arc::clone(&index), snapshot));
        published.state = IndexState::Loaded;
        index
    }

    /// First index for this process: a matching persisted artifact, else a
    /// fresh build.
    fn initialize(&self, snapshot: CorpusSnapshot) -> IndexResult<Arc<VectorIndex>> {
        if let Some(index) = self.load_persisted(&snapshot) {
            info!(
                "Loaded persisted index with {} chunks from {}",
                index.len(),
                self.index_path.display()
            );
            return Ok(self.publish(index, snapshot));
        }

        info!(
            "Building index for {} ({} files)",
            self.corpus_dir.display(),
            snapshot.file_count()
        );
        let index = self
            .build(&snapshot)
            .map_err(|e| self.initialization_error(e))?;
        Ok(self.publish(index, snapshot))
    }

    /// Replace a stale index. On failure the previous index stays published
    /// with its old snapshot, so the next request retries.
    fn refresh(
        &self,
        previous: Arc<VectorIndex>,
        recorded: &CorpusSnapshot,
        snapshot: CorpusSnapshot,
    ) -> Arc<VectorIndex> {
        let diff = snapshot.diff(recorded);
        info!(
            "Corpus changed ({} added, {} removed, {} modified); rebuilding index",
            diff.added.len(),
            diff.removed.len(),
            diff.modified.len()
        );
        self.set_state(IndexState::Rebuilding);

        match self.build(&snapshot) {
            Ok(index) => self.publish(index, snapshot),
            Err(e) => {
                error!("Index rebuild failed, serving previous index: {e}");
                self.set_state(IndexState::Loaded);
                previous
            }
        }
    }

    fn load_persisted(&self, snapshot: &CorpusSnapshot) -> Option<VectorIndex> {
        if !VectorIndex::exists(&self.index_path) {
            debug!("No persisted index at {}", self.index_path.display());
            return None;
        }

        let metadata = match IndexMetadata::load(&self.index_path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Ignoring unreadable index metadata: {e}");
                return None;
            }
        };
        if metadata.corpus_snapshot() != *snapshot {
            info!("Persisted index was built from a different corpus state; rebuilding");
            return None;
        }

        match VectorIndex::load(&self.index_path, Arc::clone(&self.embedder)) {
            Ok(index) => Some(index),
            Err(e) => {
                warn!("Ignoring unusable persisted index: {e}");
                None
            }
        }
    }

    fn build(&self, snapshot: &CorpusSnapshot) -> IndexResult<VectorIndex> {
        self.rebuilds.fetch_add(1, Ordering::SeqCst);

        let chunks = self.loader.load_chunks(&self.corpus_dir, snapshot)?;
        if chunks.is_empty() {
            return Err(IndexError::EmptyCorpus {
                directory: self.corpus_dir.clone(),
            });
        }

        let index =
            VectorIndex::build_with_batch_size(chunks, Arc::clone(&self.embedder), self.batch_size)?;

        if let Err(e) = index.persist(&self.index_path, snapshot) {
            warn!(
                "Failed to persist index to {}: {e}",
                self.index_path.display()
            );
        }
        if let Some(store) = &self.embedding_store {
            let entries: Vec<_> = index.entries().collect();
            match store.mirror(&entries) {
                Ok(outcome) => info!(
                    "Mirrored embeddings: {} stored, {} already present",
                    outcome.stored, outcome.skipped
                ),
                Err(e) => warn!("Failed to mirror embeddings: {e}"),
            }
        }

        Ok(index)
    }

    fn initialization_error(&self, e: IndexError) -> IndexError {
        match e {
            IndexError::EmptyCorpus { .. } => e,
            other => IndexError::Initialization {
                directory: self.corpus_dir.clone(),
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{HashEmbeddingGenerator, VectorDimension, VectorError};
    use std::fs;
    use std::sync::atomic::AtomicBool;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    /// Hash embedder that counts calls and can be told to fail.
    #[derive(Default)]
    struct ProbeEmbedder {
        inner: HashEmbeddingGenerator,
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl EmbeddingGenerator for ProbeEmbedder {
        fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(VectorError::EmbeddingFailed("backend down".to_string()));
            }
            std::thread::sleep(Duration::from_millis(5));
            self.inner.generate_embeddings(texts)
        }

        fn dimension(&self) -> VectorDimension {
            self.inner.dimension()
        }

        fn model_name(&self) -> &str {
            self.inner.model_name()
        }
    }

    struct Fixture {
        corpus: TempDir,
        store: TempDir,
        embedder: Arc<ProbeEmbedder>,
    }

    impl Fixture {
        fn new() -> Self {
            let fixture = Self {
                corpus: TempDir::new().unwrap(),
                store: TempDir::new().unwrap(),
                embedder: Arc::new(ProbeEmbedder::default()),
            };
            fixture.write("hours.txt", "The library opens at nine.", 0);
            fixture.write("exams.txt", "Exam results appear on the portal.", 0);
            fixture
        }

        fn write(&self, name: &str, text: &str, offset_secs: u64) {
            let path = self.corpus.path().join(name);
            fs::write(&path, text).unwrap();
            let file = fs::OpenOptions::new().write(true).open(&path).unwrap();
            file.set_modified(
                SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + offset_secs),
            )
            .unwrap();
        }

        fn manager(&self) -> IndexManager {
            IndexManager::new(
                self.corpus.path(),
                self.store.path().join("index"),
                Arc::clone(&self.embedder) as Arc<dyn EmbeddingGenerator>,
            )
        }
    }

    #[test]
    fn test_unchanged_corpus_is_built_once() {
        let fixture = Fixture::new();
        let manager = fixture.manager();
        assert_eq!(manager.state(), IndexState::Uninitialized);

        let first = manager.get_current_index(fixture.corpus.path()).unwrap();
        let calls_after_build = fixture.embedder.calls.load(Ordering::SeqCst);
        let second = manager.get_current_index(fixture.corpus.path()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.rebuild_count(), 1);
        assert_eq!(
            fixture.embedder.calls.load(Ordering::SeqCst),
            calls_after_build
        );
        assert_eq!(manager.state(), IndexState::Loaded);
    }

    #[test]
    fn test_modified_corpus_triggers_rebuild() {
        let fixture = Fixture::new();
        let manager = fixture.manager();
        let before = manager.get_current_index(fixture.corpus.path()).unwrap();

        fixture.write("hours.txt", "The library now opens at eight.", 60);
        let after = manager.get_current_index(fixture.corpus.path()).unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(manager.rebuild_count(), 2);
        assert!(after.texts().any(|t| t.contains("eight")));
        assert!(before.texts().any(|t| t.contains("nine")));
    }

    #[test]
    fn test_empty_corpus_fails_fast() {
        let corpus = TempDir::new().unwrap();
        let store = TempDir::new().unwrap();
        fs::write(corpus.path().join("blank.txt"), "\n\n   \n").unwrap();
        let manager = IndexManager::new(
            corpus.path(),
            store.path().join("index"),
            Arc::new(HashEmbeddingGenerator::default()),
        );

        let result = manager.get_current_index(corpus.path());

        assert!(matches!(result, Err(IndexError::EmptyCorpus { .. })));
        assert_eq!(manager.state(), IndexState::Uninitialized);
        assert!(!VectorIndex::exists(&store.path().join("index")));
    }

    #[test]
    fn test_embedding_failure_is_initialization_error() {
        let fixture = Fixture::new();
        fixture.embedder.fail.store(true, Ordering::SeqCst);
        let manager = fixture.manager();

        match manager.get_current_index(fixture.corpus.path()) {
            Err(e @ IndexError::Initialization { .. }) => {
                assert!(e.is_fatal());
                assert!(e.to_string().contains("backend down"));
            }
            other => panic!("Expected Initialization, got {other:?}"),
        }
    }

    #[test]
    fn test_persisted_index_is_loaded_without_building() {
        let fixture = Fixture::new();
        fixture
            .manager()
            .get_current_index(fixture.corpus.path())
            .unwrap();

        let restarted = fixture.manager();
        let index = restarted.get_current_index(fixture.corpus.path()).unwrap();

        assert_eq!(restarted.rebuild_count(), 0);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_persisted_index_for_other_corpus_state_is_rebuilt() {
        let fixture = Fixture::new();
        fixture
            .manager()
            .get_current_index(fixture.corpus.path())
            .unwrap();

        fixture.write("fees.txt", "Fees are due in June.", 120);
        let restarted = fixture.manager();
        let index = restarted.get_current_index(fixture.corpus.path()).unwrap();

        assert_eq!(restarted.rebuild_count(), 1);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_corrupted_artifact_is_rebuilt() {
        let fixture = Fixture::new();
        fixture
            .manager()
            .get_current_index(fixture.corpus.path())
            .unwrap();
        fs::write(fixture.store.path().join("index").join("index.vec"), b"junk").unwrap();

        let restarted = fixture.manager();
        let index = restarted.get_current_index(fixture.corpus.path()).unwrap();

        assert_eq!(restarted.rebuild_count(), 1);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_artifact_with_impossible_entry_count_is_rebuilt() {
        let fixture = Fixture::new();
        fixture
            .manager()
            .get_current_index(fixture.corpus.path())
            .unwrap();
        let vec_path = fixture.store.path().join("index").join("index.vec");
        let mut bytes = fs::read(&vec_path).unwrap();
        bytes[12..16].copy_from_slice(&u32::MAX.to_le_bytes());
        fs::write(&vec_path, &bytes).unwrap();

        let restarted = fixture.manager();
        let index = restarted.get_current_index(fixture.corpus.path()).unwrap();

        assert_eq!(restarted.rebuild_count(), 1);
        assert_eq!(index.len(), 2);
        assert_eq!(restarted.state(), IndexState::Loaded);
    }

    #[test]
    fn test_failed_rebuild_serves_previous_index_and_retries() {
        let fixture = Fixture::new();
        let manager = fixture.manager();
        let original = manager.get_current_index(fixture.corpus.path()).unwrap();

        fixture.write("hours.txt", "Closed on Sundays.", 300);
        fixture.embedder.fail.store(true, Ordering::SeqCst);
        let served = manager.get_current_index(fixture.corpus.path()).unwrap();
        assert!(Arc::ptr_eq(&original, &served));
        assert_eq!(manager.state(), IndexState::Loaded);

        fixture.embedder.fail.store(false, Ordering::SeqCst);
        let rebuilt = manager.get_current_index(fixture.corpus.path()).unwrap();
        assert!(!Arc::ptr_eq(&original, &rebuilt));
        assert_eq!(manager.rebuild_count(), 3);
    }

    #[test]
    fn test_unwritable_index_path_still_serves() {
        let fixture = Fixture::new();
        let blocker = fixture.store.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();
        let manager = IndexManager::new(
            fixture.corpus.path(),
            blocker.join("index"),
            Arc::clone(&fixture.embedder) as Arc<dyn EmbeddingGenerator>,
        );

        let index = manager.get_current_index(fixture.corpus.path()).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_other_directory_is_rejected() {
        let fixture = Fixture::new();
        let other = TempDir::new().unwrap();

        assert!(matches!(
            fixture.manager().get_current_index(other.path()),
            Err(IndexError::DirectoryMismatch { .. })
        ));
    }

    #[test]
    fn test_concurrent_first_requests_build_once() {
        let fixture = Fixture::new();
        let manager = fixture.manager();
        let barrier = std::sync::Barrier::new(8);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    barrier.wait();
                    manager.get_current_index(fixture.corpus.path()).unwrap();
                });
            }
        });

        assert_eq!(manager.rebuild_count(), 1);
    }

    #[test]
    fn test_search_uses_current_index() {
        let fixture = Fixture::new();
        let manager = fixture.manager();

        let hits = manager.search("when does the library open", 1).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "The library opens at nine.");
    }

    #[test]
    fn test_force_rebuild_counts_a_build() {
        let fixture = Fixture::new();
        let manager = fixture.manager();
        manager.get_current_index(fixture.corpus.path()).unwrap();

        manager.force_rebuild().unwrap();

        assert_eq!(manager.rebuild_count(), 2);
        assert_eq!(manager.state(), IndexState::Loaded);
    }

    #[test]
    fn test_failed_force_rebuild_keeps_serving() {
        let fixture = Fixture::new();
        let manager = fixture.manager();
        let original = manager.get_current_index(fixture.corpus.path()).unwrap();

        fixture.embedder.fail.store(true, Ordering::SeqCst);
        let err = manager.force_rebuild().unwrap_err();

        assert!(matches!(err, IndexError::Vector(VectorError::EmbeddingFailed(_))));
        assert!(!err.is_fatal());
        assert_eq!(manager.state(), IndexState::Loaded);
        fixture.embedder.fail.store(false, Ordering::SeqCst);
        let served = manager.get_current_index(fixture.corpus.path()).unwrap();
        assert!(Arc::ptr_eq(&original, &served));
    }

    #[test]
    fn test_mark_stale_ignores_matching_snapshot() {
        let fixture = Fixture::new();
        let manager = fixture.manager();
        manager.get_current_index(fixture.corpus.path()).unwrap();
        let current = CorpusSnapshot::capture(fixture.corpus.path()).unwrap();

        // A caller that saw an older corpus arrives after the rebuild
        manager.mark_stale(&current);
        assert_eq!(manager.state(), IndexState::Loaded);

        manager.mark_stale(&CorpusSnapshot::default());
        assert_eq!(manager.state(), IndexState::Stale);
        manager.settle_stale();
        assert_eq!(manager.state(), IndexState::Loaded);
    }

    #[test]
    fn test_builds_are_mirrored_without_duplicates() {
        let fixture = Fixture::new();
        let store = Arc::new(JsonlEmbeddingStore::new(
            fixture.store.path().join("embeddings.jsonl"),
        ));
        let manager = fixture
            .manager()
            .with_embedding_store(Arc::clone(&store) as Arc<dyn EmbeddingStore>);

        manager.get_current_index(fixture.corpus.path()).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 2);

        fixture.write("fees.txt", "Fees are due in June.", 90);
        manager.get_current_index(fixture.corpus.path()).unwrap();

        let rows = store.load_all().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].text, "Fees are due in June.");
        assert_eq!(rows[2].embedding.len(), 384);
    }

    #[test]
    fn test_mirror_failure_does_not_fail_build() {
        let fixture = Fixture::new();
        let blocker = fixture.store.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();
        let manager = fixture
            .manager()
            .with_embedding_store(Arc::new(JsonlEmbeddingStore::new(blocker.join("e.jsonl"))));

        let index = manager.get_current_index(fixture.corpus.path()).unwrap();
        assert_eq!(index.len(), 2);
    }
}
