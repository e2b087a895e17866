//! Generator backed by an OpenAI-compatible chat completions API.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Generation, Generator};
use crate::chat::Turn;
use crate::config::GenerationConfig;
use crate::error::GenerationError;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";
pub const DEFAULT_TEMPERATURE: f32 = 0.8;
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Sends each question, its retrieved context and the conversation so far
/// to `{base_url}/chat/completions`.
pub struct OpenAiCompatibleGenerator {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl std::fmt::Debug for OpenAiCompatibleGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleGenerator")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl OpenAiCompatibleGenerator {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        Self::with_options(base_url, model, api_key, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT)
    }

    pub fn with_options(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::NotConfigured {
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature,
            api_key: api_key.into(),
        })
    }

    /// Build from configuration, reading the API key from the environment
    /// variable the configuration names.
    pub fn from_config(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            GenerationError::NotConfigured {
                reason: format!("{} is not set", config.api_key_env),
            }
        })?;

        Self::with_options(
            &config.base_url,
            &config.model,
            api_key,
            config.temperature,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn build_messages(question: &str, context: &str, history: &[Turn]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(ChatMessage {
        role: "system",
        content: format!(
            "Use the following pieces of context to answer the question. \
             If you don't know the answer, just say that you don't know.\n\n{context}"
        ),
    });
    for turn in history {
        messages.push(ChatMessage {
            role: "user",
            content: turn.question.clone(),
        });
        messages.push(ChatMessage {
            role: "assistant",
            content: turn.answer.clone(),
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: question.to_string(),
    });
    messages
}

fn parse_answer(body: &str) -> Result<String, GenerationError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::InvalidResponse {
            reason: format!("Malformed completion body: {e}"),
        })?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| GenerationError::InvalidResponse {
            reason: "Completion contained no message content".to_string(),
        })
}

impl Generator for OpenAiCompatibleGenerator {
    fn generate(
        &self,
        question: &str,
        context: &str,
        history: &[Turn],
    ) -> Result<Generation, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: build_messages(question, context, history),
        };
        debug!(
            "Requesting completion from {} with {} messages",
            self.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_answer(&body).map(Generation::new)
    }
}
