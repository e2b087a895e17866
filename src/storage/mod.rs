//! Durable storage for finished conversation sessions and mirrored
//! chunk embeddings.

mod embedding_store;
mod session_store;

pub use embedding_store::{EmbeddingStore, JsonlEmbeddingStore, MirrorOutcome, StoredEmbedding};
pub use session_store::{InsertOutcome, JsonlSessionStore, SessionRow, SessionStore};
