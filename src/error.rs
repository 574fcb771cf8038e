//! Error types for Kilde.

use thiserror::Error;

/// Library-level error type for Kilde operations.
///
/// External-dependency failures (`EmbeddingUnavailable`, `RetrievalUnavailable`,
/// `GenerationUnavailable`) carry enough context to identify the failing stage
/// and dependency. "Nothing found above the relevance threshold" is not an
/// error; it is the [`crate::rag::QueryOutcome::NoRelevantResults`] outcome.
#[derive(Error, Debug)]
pub enum KildeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed source '{source_id}': {reason}")]
    MalformedSource { source_id: String, reason: String },

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Generation unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Query timed out after {0} seconds")]
    Timeout(u64),

    #[error("Search store error: {0}")]
    Store(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl KildeError {
    /// Shorthand for a malformed-source error.
    pub fn malformed(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSource {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for Kilde operations.
pub type Result<T> = std::result::Result<T, KildeError>;
