//! Answer generation.
//!
//! [`Generator`] is the seam between the conversation logic and whatever
//! produces answers. The shipped implementation talks to an
//! OpenAI-compatible chat completions endpoint.

mod openai;

pub use openai::{
    DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
    OpenAiCompatibleGenerator,
};

use crate::chat::Turn;
use crate::error::GenerationError;

/// Result of one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub answer: String,
}

impl Generation {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
        }
    }
}

/// Produces an answer for a question given retrieved context and the prior
/// turns of the conversation.
pub trait Generator: Send + Sync {
    fn generate(
        &self,
        question: &str,
        context: &str,
        history: &[Turn],
    ) -> Result<Generation, GenerationError>;
}
