//! Error types for the retrieval-augmented chat pipeline.
//!
//! Provider-facing failures (`EmbeddingService`, `GenerationService`,
//! `TemplateUnavailable`) propagate unmodified to the turn-handling caller —
//! no internal retry, no silent fallback. A failed turn must never produce a
//! partial conversation record; callers append history only after full
//! success. "Conversation not found" is *not* an error: the history store
//! reports it through booleans/options per its contract.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DocentError>;

/// All failure modes of the pipeline and its stores.
#[derive(Debug, Error)]
pub enum DocentError {
    /// The embedding provider failed or returned no vector.
    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    /// The generation provider failed or returned no completion.
    #[error("generation service error: {0}")]
    GenerationService(#[source] async_openai::error::OpenAIError),

    /// The prompt-template provider could not be reached or answered
    /// with a non-success status. Fatal for the turn: prompt
    /// reproducibility matters more than availability here.
    #[error("prompt template unavailable: {0}")]
    TemplateUnavailable(String),

    /// A query was issued against an index that was never built or loaded.
    #[error("vector index has not been built or loaded")]
    IndexUnavailable,

    /// Rejected chunker configuration (`size == 0` or `overlap >= size`).
    #[error("invalid chunker configuration: {0}")]
    InvalidChunkerConfig(String),

    /// Bad configuration value outside the chunker (e.g. unknown timezone).
    #[error("configuration error: {0}")]
    Config(String),

    /// A vector with the wrong dimensionality was handed to the index.
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Internal ANN index failure (insert/build/dump/load).
    #[error("vector index internals: {0}")]
    Index(String),

    /// Password hashing or verification failure.
    #[error("credential hashing error: {0}")]
    Credential(String),

    #[error("database error: {0}")]
    Db(#[from] diesel::result::Error),

    #[error("database connection error: {0}")]
    DbConnection(#[from] diesel::result::ConnectionError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
