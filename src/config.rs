//! Configuration module for the document question-answering service.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.askdocs/settings.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `ASKDOCS_` and use double
//! underscores to separate nested levels:
//! - `ASKDOCS_CHAT__SIMILARITY_THRESHOLD=0.9` sets `chat.similarity_threshold`
//! - `ASKDOCS_GENERATION__MODEL=llama3-70b-8192` sets `generation.model`
//! - `ASKDOCS_CORPUS_DIR=/srv/docs` sets `corpus_dir`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chat::{DEFAULT_SESSION_TIMEOUT_MINS, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_STOP_KEYWORD};
use crate::corpus::DEFAULT_MAX_CHUNK_CHARS;
use crate::generation::{DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::vector::DEFAULT_EMBEDDING_BATCH_SIZE;

const CONFIG_DIR: &str = ".askdocs";
const ENV_PREFIX: &str = "ASKDOCS_";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory of documents to answer from
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: PathBuf,

    /// Directory holding the persisted vector index
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Global debug mode
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub validation: ValidationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexingConfig {
    /// Upper bound on chunk length in characters
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Chunks embedded per embedder call
    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,

    /// fastembed model name, or "hash" for the offline hashing embedder
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Where downloaded embedding models are cached
    #[serde(default = "default_model_cache_dir")]
    pub model_cache_dir: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatConfig {
    /// Similarity a prior question must exceed to reuse its answer
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    #[serde(default = "default_session_timeout_mins")]
    pub session_timeout_mins: i64,

    /// Question that ends a session (case-insensitive)
    #[serde(default = "default_stop_keyword")]
    pub stop_keyword: String,

    /// Reply sent when a session ends
    #[serde(default = "default_closing_message")]
    pub closing_message: String,

    /// Number of retrieved chunks passed to generation as context
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// JSON-lines file that closed sessions are appended to
    #[serde(default = "default_sessions_path")]
    pub sessions_path: PathBuf,

    /// IANA timezone used for session timestamps
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// JSON-lines file every built chunk and its embedding is mirrored to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeddings_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ValidationConfig {
    /// Address accepted regardless of the student email pattern
    #[serde(default = "default_override_email")]
    pub override_email: String,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_corpus_dir() -> PathBuf {
    PathBuf::from("hidden_docs")
}
fn default_index_path() -> PathBuf {
    PathBuf::from(".askdocs/index")
}
fn default_max_chunk_chars() -> usize {
    DEFAULT_MAX_CHUNK_CHARS
}
fn default_embedding_batch_size() -> usize {
    DEFAULT_EMBEDDING_BATCH_SIZE
}
fn default_embedding_model() -> String {
    "AllMiniLML6V2".to_string()
}
fn default_model_cache_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR).join("models"))
        .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("models"))
}
fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}
fn default_session_timeout_mins() -> i64 {
    DEFAULT_SESSION_TIMEOUT_MINS
}
fn default_stop_keyword() -> String {
    DEFAULT_STOP_KEYWORD.to_string()
}
fn default_closing_message() -> String {
    crate::chat::DEFAULT_CLOSING_MESSAGE.to_string()
}
fn default_retrieval_k() -> usize {
    1
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_generation_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}
fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_sessions_path() -> PathBuf {
    PathBuf::from(".askdocs/sessions.jsonl")
}
fn default_timezone() -> String {
    "Asia/Kolkata".to_string()
}
fn default_override_email() -> String {
    crate::validation::DEFAULT_OVERRIDE_EMAIL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            corpus_dir: default_corpus_dir(),
            index_path: default_index_path(),
            debug: false,
            indexing: IndexingConfig::default(),
            chat: ChatConfig::default(),
            generation: GenerationConfig::default(),
            storage: StorageConfig::default(),
            validation: ValidationConfig::default(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            embedding_batch_size: default_embedding_batch_size(),
            embedding_model: default_embedding_model(),
            model_cache_dir: default_model_cache_dir(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            session_timeout_mins: default_session_timeout_mins(),
            stop_keyword: default_stop_keyword(),
            closing_message: default_closing_message(),
            retrieval_k: default_retrieval_k(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_generation_model(),
            temperature: default_temperature(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sessions_path: default_sessions_path(),
            timezone: default_timezone(),
            embeddings_path: None,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            override_email: default_override_email(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honoring
    /// environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels, single underscores
            // stay inside field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.askdocs/settings.toml` by searching from the current
    /// directory up to the filesystem root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join("settings.toml"))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments in the current
    /// directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        Self::init_config_file_in(Path::new("."), force)
    }

    pub fn init_config_file_in(
        root: &Path,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.join(CONFIG_DIR).join("settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let defaults = Settings::default();
        let template = format!(
            r#"# askdocs configuration file

# Version of the configuration schema
version = 1

# Directory of documents to answer from
corpus_dir = "hidden_docs"

# Where the vector index is persisted
index_path = ".askdocs/index"

# Global debug mode (debug-level logging unless RUST_LOG is set)
debug = false

[indexing]
# Maximum characters per chunk
max_chunk_chars = {max_chunk_chars}

# Chunks embedded per batch
embedding_batch_size = {batch}

# fastembed model, or "hash" for an offline deterministic embedder
embedding_model = "AllMiniLML6V2"

# Model download cache
# model_cache_dir = "~/.askdocs/models"

[chat]
# A prior question scoring above this reuses its answer (0.0 to 1.0)
similarity_threshold = {threshold}

# Sessions older than this are closed and saved
session_timeout_mins = {timeout}

# Sending this question ends the session
stop_keyword = "stop"

closing_message = "{closing}"

# Retrieved chunks passed to the model as context
retrieval_k = 1

[generation]
# Any OpenAI-compatible chat completions API
base_url = "{base_url}"
model = "{model}"
temperature = {temperature}

# Environment variable holding the API key
api_key_env = "{api_key_env}"
timeout_secs = 60

[storage]
# Closed sessions are appended here, one JSON object per turn
sessions_path = ".askdocs/sessions.jsonl"

# Timezone for session timestamps
timezone = "Asia/Kolkata"

# Mirror every indexed chunk and its embedding here (disabled when unset)
# embeddings_path = ".askdocs/embeddings.jsonl"

[validation]
# Accepted in addition to the student email pattern
override_email = "{override_email}"
"#,
            max_chunk_chars = defaults.indexing.max_chunk_chars,
            batch = defaults.indexing.embedding_batch_size,
            threshold = defaults.chat.similarity_threshold,
            timeout = defaults.chat.session_timeout_mins,
            closing = defaults.chat.closing_message,
            base_url = defaults.generation.base_url,
            model = defaults.generation.model,
            temperature = defaults.generation.temperature,
            api_key_env = defaults.generation.api_key_env,
            override_email = defaults.validation.override_email,
        );

        std::fs::write(&config_path, template)?;
        Ok(config_path)
    }
}
