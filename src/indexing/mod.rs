//! Index lifecycle: keeping one vector index current for one corpus.

pub mod manager;

pub use manager::{IndexManager, IndexState};
