//! Application configuration: loading, connection handling, schema bootstrap.
//!
//! The `DocentConfig` struct holds every tunable the pipeline consumes —
//! provider endpoints and model ids, chunking geometry, retrieval knobs,
//! store locations, and the history timezone. It is loaded from a YAML file
//! with [`load_config`].
//!
//! # Examples
//!
//! ```no_run
//! use docent::config::{DocentConfig, load_config};
//!
//! let config: DocentConfig = load_config("/path/to/config.yaml").unwrap();
//! println!("{:?}", config.model);
//! ```

use chrono_tz::Tz;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;

use tracing::debug;

use crate::error::{DocentError, Result};

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_top_k() -> usize {
    5
}

fn default_mmr_lambda() -> f32 {
    0.5
}

fn default_timezone() -> String {
    "Asia/Seoul".to_string()
}

/// Represents the application's configuration.
///
/// Constructed by loading a YAML file with [`load_config`]. The retrieval
/// and chunking knobs carry the reference defaults (chunk 1000/overlap 100,
/// top-k 5, lambda 0.5, Asia/Seoul) so a minimal config only needs the
/// provider endpoints and store paths.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct DocentConfig {
    /// API key for the OpenAI-compatible provider.
    pub api_key: String,

    /// Base URL of the OpenAI-compatible provider.
    pub api_base: String,

    /// Model identifier for completion generation.
    pub model: String,

    /// Model identifier for embeddings.
    pub embedding_model: String,

    /// SQLite database URL holding corpus, history, and accounts.
    pub db_url: String,

    /// Where the serialized vector index lives.
    pub index_path: String,

    /// URL of the prompt-template provider (fetched per call).
    pub template_url: String,

    /// Path to the static few-shot example resource (JSON).
    pub few_shot_path: String,

    /// Target chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks, in characters. Must stay below
    /// `chunk_size`.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// How many chunks the retriever asks the index for.
    #[serde(default = "default_top_k")]
    pub retriever_top_k: usize,

    /// Relevance/diversity tradeoff: 0 = max diversity, 1 = max relevance.
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f32,

    /// IANA zone name used to stamp conversation creation times.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl DocentConfig {
    /// Parse the configured zone name into a [`chrono_tz::Tz`].
    ///
    /// The zone is a configuration choice, never a hardcoded literal; an
    /// unknown name is a configuration error, not a fallback to UTC.
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| DocentError::Config(format!("unknown timezone {:?}", self.timezone)))
    }
}

/// Loads the application's configuration from a YAML file.
///
/// # Errors
/// - The file cannot be read.
/// - The YAML does not deserialize into a [`DocentConfig`].
///
/// # Examples
///
/// ```no_run
/// use docent::config::load_config;
///
/// match load_config("/path/to/config.yaml") {
///     Ok(config) => println!("{:?}", config),
///     Err(err) => eprintln!("Error loading config: {}", err),
/// }
/// ```
pub fn load_config(file: &str) -> Result<DocentConfig> {
    debug!("Loading config: {file}");
    let content = fs::read_to_string(file)?;
    let config: DocentConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Open a SQLite connection to `db_url`.
///
/// A generous busy timeout is set so that concurrent turn handlers queue on
/// the counter upsert instead of failing with `SQLITE_BUSY`.
pub fn establish_connection(db_url: &str) -> Result<SqliteConnection> {
    let mut connection = SqliteConnection::establish(db_url)?;
    connection.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON;")?;
    Ok(connection)
}

/// Create the Docent tables if they do not exist yet.
///
/// Idempotent; called by the CLI on `init` and by the stores' constructors
/// in tests. The `conversations` primary key is *not* AUTOINCREMENT — ids
/// come from the `counters` sequence so they are monotonic across deletes
/// and across server instances sharing this store.
pub fn setup_schema(connection: &mut SqliteConnection) -> Result<()> {
    connection.batch_execute(
        r#"
        CREATE TABLE IF NOT EXISTS sections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS counters (
            name TEXT PRIMARY KEY NOT NULL,
            value BIGINT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS conversations (
            conversation_id BIGINT PRIMARY KEY NOT NULL,
            username TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS turns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id BIGINT NOT NULL,
            user_text TEXT NOT NULL,
            ai_text TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}
