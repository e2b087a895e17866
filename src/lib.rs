/// The main library module for askdocs
pub mod chat;
pub mod config;
pub mod corpus;
pub mod error;
pub mod generation;
pub mod indexing;
pub mod storage;
pub mod validation;
pub mod vector;

// Explicit exports for better API clarity
pub use chat::{
    ConversationOrchestrator, SessionPolicy, SimilarityCache, TokenCounter, Turn, TurnOutcome,
    TurnReply, TurnRequest, TurnSource,
};
pub use config::Settings;
pub use corpus::{CorpusLoader, CorpusSnapshot};
pub use error::{
    ChatError, ChatResult, GenerationError, IndexError, IndexResult, PersistenceError,
    ValidationError,
};
pub use generation::{Generation, Generator, OpenAiCompatibleGenerator};
pub use indexing::{IndexManager, IndexState};
pub use storage::{
    EmbeddingStore, InsertOutcome, JsonlEmbeddingStore, JsonlSessionStore, SessionRow,
    SessionStore,
};
pub use validation::{EmailValidator, ValidationReply};
pub use vector::{EmbeddingGenerator, FastEmbedGenerator, HashEmbeddingGenerator, VectorIndex};
