//! CLI entry point for the document question-answering service.
//!
//! Provides commands for indexing a corpus, searching it, and running
//! conversation turns against it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use askdocs::chat::TurnReply;
use askdocs::vector::HASH_MODEL_NAME;
use askdocs::{
    ConversationOrchestrator, EmailValidator, EmbeddingGenerator, EmbeddingStore,
    FastEmbedGenerator, HashEmbeddingGenerator, IndexError, IndexManager, JsonlEmbeddingStore,
    JsonlSessionStore, OpenAiCompatibleGenerator, Settings, Turn, TurnRequest,
};
use chrono::{DateTime, Utc};
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default())
}

/// Question answering over a directory of documents
#[derive(Parser)]
#[command(
    name = "askdocs",
    version = env!("CARGO_PKG_VERSION"),
    about = "Question answering over a directory of documents",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize project
    #[command(about = "Set up .askdocs directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings")]
    Config,

    /// Build or load the vector index for the configured corpus
    Index {
        /// Rebuild even if a current index exists
        #[arg(short, long)]
        force: bool,
    },

    /// Search the corpus without generating an answer
    Search {
        query: String,

        /// Number of chunks to return
        #[arg(short = 'k', long, default_value_t = 3)]
        limit: usize,
    },

    /// Run one conversation turn and print the reply as JSON
    Ask {
        question: String,

        #[arg(long)]
        email: String,

        #[arg(long, default_value = "")]
        name: String,

        /// JSON file holding prior turns as [question, answer] pairs
        #[arg(long)]
        history: Option<PathBuf>,

        /// Write the updated history back to the --history file
        #[arg(long, requires = "history")]
        write_history: bool,

        /// Session start time (RFC 3339); defaults to now
        #[arg(long)]
        start_time: Option<DateTime<Utc>>,
    },

    /// Show how many chunk embeddings have been mirrored
    Embeddings,

    /// Print the token estimate for a question
    Tokens { question: String },

    /// Check an email address against the accepted patterns
    ValidateEmail { email: String },
}

fn init_logging(settings: &Settings) {
    let default_level = if settings.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok();
}

fn load_settings(config: Option<&Path>) -> Result<Settings> {
    let settings = match config {
        Some(path) => Settings::load_from(path).map_err(|e| {
            anyhow::anyhow!("Configuration error loading from {}: {e}", path.display())
        })?,
        None => Settings::load().map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?,
    };
    Ok(settings)
}

fn create_embedder(settings: &Settings) -> Result<Arc<dyn EmbeddingGenerator>> {
    let model = &settings.indexing.embedding_model;
    if model == HASH_MODEL_NAME {
        return Ok(Arc::new(HashEmbeddingGenerator::default()));
    }
    let generator = FastEmbedGenerator::new(model, &settings.indexing.model_cache_dir, true)
        .with_context(|| format!("Failed to load embedding model '{model}'"))?;
    Ok(Arc::new(generator))
}

fn create_manager(settings: &Settings) -> Result<Arc<IndexManager>> {
    let embedder = create_embedder(settings)?;
    Ok(Arc::new(IndexManager::from_settings(settings, embedder)))
}

fn print_suggestions(error: &IndexError) {
    for suggestion in error.recovery_suggestions() {
        eprintln!("  Suggestion: {suggestion}");
    }
}

fn read_history(path: &Path) -> Result<Vec<Turn>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a list of [question, answer] pairs", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;
    init_logging(&settings);

    match cli.command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(force)
                .map_err(|e| anyhow::anyhow!("{e}"))
                .context("Failed to create configuration file")?;
            println!("Created configuration file at: {}", path.display());
            println!("Edit this file to customize your settings.");
        }

        Commands::Config => {
            println!("{}", toml::to_string_pretty(&settings)?);
        }

        Commands::Index { force } => {
            let manager = create_manager(&settings)?;
            let result = if force {
                manager.force_rebuild()
            } else {
                manager.get_current_index(manager.corpus_dir())
            };
            let index = result.inspect_err(print_suggestions)?;
            println!(
                "Index ready: {} chunks from {} ({} model, {} dimensions, {} build passes)",
                index.len(),
                manager.corpus_dir().display(),
                index.model_name(),
                index.dimension(),
                manager.rebuild_count()
            );
        }

        Commands::Search { query, limit } => {
            let manager = create_manager(&settings)?;
            let hits = manager
                .search(&query, limit)
                .inspect_err(print_suggestions)?;
            for (rank, hit) in hits.iter().enumerate() {
                println!("{}. [{:.3}] {}", rank + 1, hit.score, hit.text);
            }
        }

        Commands::Ask {
            question,
            email,
            name,
            history,
            write_history,
            start_time,
        } => {
            let prior = match &history {
                Some(path) => read_history(path)?,
                None => Vec::new(),
            };
            let manager = create_manager(&settings)?;
            let generator = Arc::new(OpenAiCompatibleGenerator::from_config(&settings.generation)?);
            tracing::debug!("Answering with model {}", generator.model());
            let store = Arc::new(JsonlSessionStore::new(&settings.storage.sessions_path));
            let orchestrator =
                ConversationOrchestrator::from_settings(&settings, manager, generator, store)?;

            let mut request = TurnRequest::new(email, question)
                .with_name(name)
                .with_history(prior);
            if let Some(start) = start_time {
                request = request.with_start_time(start);
            }

            let result = orchestrator.process_turn(request);
            if let (Ok(outcome), Some(path), true) = (&result, &history, write_history) {
                std::fs::write(path, serde_json::to_string_pretty(&outcome.history)?)
                    .with_context(|| format!("Failed to write history to {}", path.display()))?;
            }
            let reply = TurnReply::from_result(result);
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }

        Commands::Embeddings => match &settings.storage.embeddings_path {
            Some(path) => {
                let rows = JsonlEmbeddingStore::new(path).load_all()?;
                println!("{} embeddings mirrored in {}", rows.len(), path.display());
            }
            None => println!(
                "Embedding mirroring is disabled; set storage.embeddings_path to enable it"
            ),
        },

        Commands::Tokens { question } => {
            let count = askdocs::TokenCounter.count(&question);
            let reply = serde_json::json!({"status": "success", "token_count": count});
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }

        Commands::ValidateEmail { email } => {
            let validator = EmailValidator::new(&settings.validation.override_email);
            println!("{}", serde_json::to_string_pretty(&validator.reply(&email))?);
        }
    }

    Ok(())
}
