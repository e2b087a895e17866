//! Per-turn conversation flow.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{SessionPolicy, SimilarityCache, TokenCounter};
use crate::config::Settings;
use crate::error::{ChatError, ChatResult};
use crate::generation::Generator;
use crate::indexing::IndexManager;
use crate::storage::{SessionRow, SessionStore};

pub const DEFAULT_CLOSING_MESSAGE: &str =
    "Session data successfully saved. Please refresh to start a new session";

/// Message returned to clients for any failed turn. Causes are logged, not
/// exposed.
pub const GENERIC_TURN_FAILURE: &str = "An error occurred while processing the question.";

const SESSION_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One answered exchange. Serialized as a `[question, answer]` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

impl From<(String, String)> for Turn {
    fn from((question, answer): (String, String)) -> Self {
        Self { question, answer }
    }
}

impl From<Turn> for (String, String) {
    fn from(turn: Turn) -> Self {
        (turn.question, turn.answer)
    }
}

/// Input for one turn. The caller owns the history and passes it in full.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnRequest {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub question: String,
    #[serde(default, alias = "chat_history")]
    pub history: Vec<Turn>,
    /// Session start; defaults to the time the turn is processed.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

impl TurnRequest {
    pub fn new(email: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            question: question.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_start_time(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }
}

/// Where a turn's answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnSource {
    /// Reused from a near-duplicate earlier question.
    Cache,
    /// Freshly generated.
    Generated,
    /// Generated, then the session was closed and saved.
    SessionClosed,
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub answer: String,
    pub tokens_count: usize,
    /// The history after this turn.
    pub history: Vec<Turn>,
    pub source: TurnSource,
    /// `Some` only when the session closed: whether the store accepted it.
    pub persisted: Option<bool>,
}

/// Serializable boundary reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TurnReply {
    Success { answer: String, tokens_count: usize },
    Error { message: String },
}

impl TurnReply {
    /// Convert a turn result, logging and hiding the cause of a failure.
    pub fn from_result(result: ChatResult<TurnOutcome>) -> Self {
        match result {
            Ok(outcome) => Self::Success {
                answer: outcome.answer,
                tokens_count: outcome.tokens_count,
            },
            Err(e) => {
                error!("Turn failed [{}]: {e}", e.status_code());
                Self::Error {
                    message: GENERIC_TURN_FAILURE.to_string(),
                }
            }
        }
    }
}

/// Answers turns against one corpus.
///
/// Shared freely between threads: the only mutable state is inside the
/// [`IndexManager`] and the session store.
pub struct ConversationOrchestrator {
    index_manager: Arc<IndexManager>,
    generator: Arc<dyn Generator>,
    store: Arc<dyn SessionStore>,
    cache: SimilarityCache,
    policy: SessionPolicy,
    tokens: TokenCounter,
    retrieval_k: usize,
    closing_message: String,
    timezone: Tz,
}

impl std::fmt::Debug for ConversationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationOrchestrator")
            .field("index_manager", &self.index_manager)
            .field("cache", &self.cache)
            .field("policy", &self.policy)
            .field("retrieval_k", &self.retrieval_k)
            .field("timezone", &self.timezone)
            .finish()
    }
}

impl ConversationOrchestrator {
    pub fn new(
        index_manager: Arc<IndexManager>,
        generator: Arc<dyn Generator>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            index_manager,
            generator,
            store,
            cache: SimilarityCache::default(),
            policy: SessionPolicy::default(),
            tokens: TokenCounter,
            retrieval_k: 1,
            closing_message: DEFAULT_CLOSING_MESSAGE.to_string(),
            timezone: chrono_tz::Asia::Kolkata,
        }
    }

    /// Build with the `[chat]` and `[storage]` settings applied.
    ///
    /// # Errors
    /// [`ChatError::InvalidConfig`] for an unknown timezone or a
    /// non-positive session timeout.
    pub fn from_settings(
        settings: &Settings,
        index_manager: Arc<IndexManager>,
        generator: Arc<dyn Generator>,
        store: Arc<dyn SessionStore>,
    ) -> ChatResult<Self> {
        let timezone: Tz =
            settings
                .storage
                .timezone
                .parse()
                .map_err(|_| ChatError::InvalidConfig {
                    reason: format!("Unknown timezone '{}'", settings.storage.timezone),
                })?;
        if settings.chat.session_timeout_mins <= 0 {
            return Err(ChatError::InvalidConfig {
                reason: "chat.session_timeout_mins must be positive".to_string(),
            });
        }

        Ok(Self::new(index_manager, generator, store)
            .with_cache(SimilarityCache::new(settings.chat.similarity_threshold))
            .with_policy(SessionPolicy::new(
                TimeDelta::minutes(settings.chat.session_timeout_mins),
                &settings.chat.stop_keyword,
            ))
            .with_retrieval_k(settings.chat.retrieval_k)
            .with_closing_message(&settings.chat.closing_message)
            .with_timezone(timezone))
    }

    pub fn with_cache(mut self, cache: SimilarityCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retrieval_k(mut self, k: usize) -> Self {
        self.retrieval_k = k.max(1);
        self
    }

    pub fn with_closing_message(mut self, message: impl Into<String>) -> Self {
        self.closing_message = message.into();
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn index_manager(&self) -> &IndexManager {
        &self.index_manager
    }

    /// Token estimate for a question, without running a turn.
    pub fn token_count(&self, question: &str) -> usize {
        self.tokens.count(question)
    }

    pub fn process_turn(&self, request: TurnRequest) -> ChatResult<TurnOutcome> {
        self.process_turn_at(request, Utc::now())
    }

    /// Run one turn with `now` as the single clock reading for the turn.
    ///
    /// # Errors
    /// Index and generation failures abort the turn; the caller's history
    /// is not extended. A failure to save a closing session is logged and
    /// reported through [`TurnOutcome::persisted`] instead.
    pub fn process_turn_at(
        &self,
        request: TurnRequest,
        now: DateTime<Utc>,
    ) -> ChatResult<TurnOutcome> {
        let TurnRequest {
            email,
            name,
            question,
            mut history,
            start_time,
        } = request;
        info!("Processing question from {email}: {question}");
        let start_time = start_time.unwrap_or(now);

        if let Some(hit) = self.cache.find(&question, &history) {
            info!("Found similar question: {}", hit.question);
            return Ok(TurnOutcome {
                answer: hit.answer,
                tokens_count: 0,
                history,
                source: TurnSource::Cache,
                persisted: None,
            });
        }

        debug!(
            "No earlier question scored above {}",
            self.cache.threshold()
        );

        let index = self
            .index_manager
            .get_current_index(self.index_manager.corpus_dir())?;
        let hits = index.search(&question, self.retrieval_k)?;
        let context = hits
            .iter()
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        debug!("Retrieved {} context chunks", hits.len());

        let generation = self.generator.generate(&question, &context, &history)?;
        let tokens_count = self.token_count(&question);
        info!("Tokens sent for question: {tokens_count}");
        history.push(Turn::new(question.as_str(), generation.answer.as_str()));

        let explicit_stop = self.policy.is_stop(&question);
        if self.policy.should_close(start_time, now, explicit_stop) {
            let persisted = self.persist_session(&email, &name, &history, now);
            return Ok(TurnOutcome {
                answer: self.closing_message.clone(),
                tokens_count,
                history,
                source: TurnSource::SessionClosed,
                persisted: Some(persisted),
            });
        }

        Ok(TurnOutcome {
            answer: generation.answer,
            tokens_count,
            history,
            source: TurnSource::Generated,
            persisted: None,
        })
    }

    /// Boundary form of [`process_turn`](Self::process_turn).
    pub fn respond(&self, request: TurnRequest) -> TurnReply {
        TurnReply::from_result(self.process_turn(request))
    }

    fn persist_session(
        &self,
        email: &str,
        name: &str,
        history: &[Turn],
        now: DateTime<Utc>,
    ) -> bool {
        let timestamp = now
            .with_timezone(&self.timezone)
            .format(SESSION_TIMESTAMP_FORMAT)
            .to_string();
        let name = (!name.is_empty()).then(|| name.to_string());
        let rows: Vec<SessionRow> = history
            .iter()
            .map(|turn| SessionRow {
                email: email.to_string(),
                name: name.clone(),
                question: turn.question.clone(),
                answer: turn.answer.clone(),
                timestamp: timestamp.clone(),
            })
            .collect();

        match self.store.insert(&rows) {
            Ok(outcome) if outcome.success => {
                info!("Session for {email} saved ({} rows)", outcome.rows_affected);
                true
            }
            Ok(_) => {
                warn!("Session store did not accept the session for {email}");
                false
            }
            Err(e) => {
                warn!("Failed to save session for {email}: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GenerationError, PersistenceError};
    use crate::generation::Generation;
    use crate::storage::InsertOutcome;
    use crate::vector::HashEmbeddingGenerator;
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct EchoGenerator {
        calls: AtomicUsize,
        contexts: Mutex<Vec<String>>,
    }

    impl Generator for EchoGenerator {
        fn generate(
            &self,
            question: &str,
            context: &str,
            _history: &[Turn],
        ) -> Result<Generation, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.contexts.lock().push(context.to_string());
            Ok(Generation::new(format!("Answer to: {question}")))
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<SessionRow>>,
        fail: bool,
    }

    impl SessionStore for MemoryStore {
        fn insert(&self, rows: &[SessionRow]) -> Result<InsertOutcome, PersistenceError> {
            if self.fail {
                return Err(PersistenceError::Rejected {
                    reason: "offline".to_string(),
                });
            }
            self.rows.lock().extend_from_slice(rows);
            Ok(InsertOutcome {
                success: true,
                rows_affected: rows.len(),
            })
        }
    }

    struct Harness {
        _corpus: TempDir,
        _store_dir: TempDir,
        generator: Arc<EchoGenerator>,
        store: Arc<MemoryStore>,
        orchestrator: ConversationOrchestrator,
    }

    fn harness(store: MemoryStore) -> Harness {
        let corpus = TempDir::new().unwrap();
        let store_dir = TempDir::new().unwrap();
        std::fs::write(
            corpus.path().join("handbook.txt"),
            "The library opens at nine.\n\nRefunds are processed within ten days.",
        )
        .unwrap();
        let manager = Arc::new(
            IndexManager::new(
                corpus.path(),
                store_dir.path().join("index"),
                Arc::new(HashEmbeddingGenerator::default()),
            )
            .with_loader(crate::corpus::CorpusLoader::new(40)),
        );
        let generator = Arc::new(EchoGenerator::default());
        let store = Arc::new(store);
        let orchestrator = ConversationOrchestrator::new(
            manager,
            Arc::clone(&generator) as Arc<dyn Generator>,
            Arc::clone(&store) as Arc<dyn SessionStore>,
        )
        .with_timezone(chrono_tz::UTC);
        Harness {
            _corpus: corpus,
            _store_dir: store_dir,
            generator,
            store,
            orchestrator,
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_cache_hit_skips_generation() {
        let h = harness(MemoryStore::default());
        let history = vec![Turn::new("What is X?", "X is Y.")];
        let request = TurnRequest::new("a@b.c", "what is x").with_history(history.clone());

        let outcome = h.orchestrator.process_turn_at(request, noon()).unwrap();

        assert_eq!(outcome.answer, "X is Y.");
        assert_eq!(outcome.tokens_count, 0);
        assert_eq!(outcome.history, history);
        assert_eq!(outcome.source, TurnSource::Cache);
        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_miss_generates_with_top_context() {
        let h = harness(MemoryStore::default());
        let request = TurnRequest::new("a@b.c", "When does the library open?");

        let outcome = h.orchestrator.process_turn_at(request, noon()).unwrap();

        assert_eq!(outcome.answer, "Answer to: When does the library open?");
        assert_eq!(outcome.source, TurnSource::Generated);
        assert_eq!(
            outcome.tokens_count,
            h.orchestrator.token_count("When does the library open?")
        );
        assert_eq!(
            outcome.history,
            vec![Turn::new(
                "When does the library open?",
                "Answer to: When does the library open?"
            )]
        );
        assert_eq!(
            h.generator.contexts.lock().as_slice(),
            ["The library opens at nine."]
        );
        assert!(h.store.rows.lock().is_empty());
    }

    #[test]
    fn test_stop_persists_and_closes() {
        let h = harness(MemoryStore::default());
        let request = TurnRequest::new("a@b.c", "STOP")
            .with_name("Asha")
            .with_history(vec![Turn::new("Where is block C?", "Near the gate.")]);

        let outcome = h.orchestrator.process_turn_at(request, noon()).unwrap();

        assert_eq!(outcome.answer, DEFAULT_CLOSING_MESSAGE);
        assert_eq!(outcome.source, TurnSource::SessionClosed);
        assert_eq!(outcome.persisted, Some(true));
        assert_eq!(outcome.tokens_count, h.orchestrator.token_count("STOP"));

        let rows = h.store.rows.lock();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].question, "STOP");
        assert!(rows.iter().all(|r| r.timestamp == "2024-03-01 12:00"));
        assert!(rows.iter().all(|r| r.name.as_deref() == Some("Asha")));
    }

    #[test]
    fn test_timeout_closes_session() {
        let h = harness(MemoryStore::default());
        let request = TurnRequest::new("a@b.c", "Any refunds?")
            .with_start_time(noon() - TimeDelta::minutes(31));

        let outcome = h.orchestrator.process_turn_at(request, noon()).unwrap();

        assert_eq!(outcome.source, TurnSource::SessionClosed);
        assert_eq!(h.store.rows.lock()[0].name, None);
    }

    #[test]
    fn test_store_failure_is_soft() {
        let h = harness(MemoryStore {
            fail: true,
            ..MemoryStore::default()
        });

        let outcome = h
            .orchestrator
            .process_turn_at(TurnRequest::new("a@b.c", "stop"), noon())
            .unwrap();

        assert_eq!(outcome.answer, DEFAULT_CLOSING_MESSAGE);
        assert_eq!(outcome.persisted, Some(false));
        assert_eq!(outcome.tokens_count, 1);
    }

    #[test]
    fn test_repeated_stop_is_served_from_cache() {
        let h = harness(MemoryStore::default());
        let request = TurnRequest::new("a@b.c", "stop")
            .with_history(vec![Turn::new("stop", "Earlier answer.")]);

        let outcome = h.orchestrator.process_turn_at(request, noon()).unwrap();

        assert_eq!(outcome.source, TurnSource::Cache);
        assert_eq!(outcome.answer, "Earlier answer.");
        assert!(h.store.rows.lock().is_empty());
    }

    #[test]
    fn test_timestamp_uses_configured_timezone() {
        let h = harness(MemoryStore::default());
        let orchestrator = h.orchestrator.with_timezone(chrono_tz::Asia::Kolkata);

        orchestrator
            .process_turn_at(TurnRequest::new("a@b.c", "stop"), noon())
            .unwrap();

        assert_eq!(h.store.rows.lock()[0].timestamp, "2024-03-01 17:30");
    }

    #[test]
    fn test_reply_serialization() {
        let success = TurnReply::Success {
            answer: "Nine.".to_string(),
            tokens_count: 3,
        };
        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            serde_json::json!({"status": "success", "answer": "Nine.", "tokens_count": 3})
        );

        let failure = TurnReply::from_result(Err(ChatError::Generation(
            GenerationError::Request("timeout".to_string()),
        )));
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            serde_json::json!({"status": "error", "message": GENERIC_TURN_FAILURE})
        );
    }

    #[test]
    fn test_request_accepts_history_pairs() {
        let request: TurnRequest = serde_json::from_value(serde_json::json!({
            "email": "a@b.c",
            "question": "hi",
            "chat_history": [["q0", "a0"]],
            "start_time": "2024-03-01T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(request.history, vec![Turn::new("q0", "a0")]);
        assert_eq!(request.start_time, Some(noon()));
        assert_eq!(request.name, "");
    }

    #[test]
    fn test_invalid_timezone_is_config_error() {
        let h = harness(MemoryStore::default());
        let mut settings = Settings::default();
        settings.storage.timezone = "Mars/Olympus".to_string();

        let result = ConversationOrchestrator::from_settings(
            &settings,
            Arc::clone(&h.orchestrator.index_manager),
            Arc::clone(&h.generator) as Arc<dyn Generator>,
            Arc::clone(&h.store) as Arc<dyn SessionStore>,
        );

        assert!(matches!(result, Err(ChatError::InvalidConfig { .. })));
    }
}
