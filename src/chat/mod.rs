//! Conversation turn handling.
//!
//! A turn is answered from the caller's own history when a near-duplicate
//! question was already asked ([`SimilarityCache`]); otherwise it goes
//! through retrieval and generation. [`SessionPolicy`] decides when a
//! session ends and its history is persisted.

mod orchestrator;
mod session;
mod similarity;
mod tokens;

pub use orchestrator::{
    ConversationOrchestrator, DEFAULT_CLOSING_MESSAGE, GENERIC_TURN_FAILURE, Turn, TurnOutcome,
    TurnReply, TurnRequest, TurnSource,
};
pub use session::{DEFAULT_SESSION_TIMEOUT_MINS, DEFAULT_STOP_KEYWORD, SessionPolicy};
pub use similarity::{CacheHit, DEFAULT_SIMILARITY_THRESHOLD, SimilarityCache};
pub use tokens::TokenCounter;
