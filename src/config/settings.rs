//! Configuration settings for Kilde.

use crate::error::{KildeError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Root configuration structure.
///
/// Unknown keys are rejected at load time so a typo in the config file
/// surfaces as an error instead of silently falling back to a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub corpus: CorpusSettings,
    pub store: StoreSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub rag: RagSettings,
    pub prompts: PromptSettings,
}


/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralSettings {
    /// Where the index database and other state live.
    pub data_dir: String,
    /// Default log level when RUST_LOG and -v are absent.
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.kilde".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Where source material lives on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorpusSettings {
    /// Directory with page-indexed PDF extraction files.
    pub pdf_dir: String,
    /// Directory with transcript word-stream files.
    pub transcript_dir: String,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            pdf_dir: "~/.kilde/corpus/pdfs".to_string(),
            transcript_dir: "~/.kilde/corpus/transcripts".to_string(),
        }
    }
}

/// Search store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    /// Which search store backs the index: "sqlite" or "memory".
    pub provider: String,
    /// Database file for the sqlite provider.
    pub sqlite_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.kilde/index.db".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmbeddingSettings {
    /// Embedding provider; only "openai" is currently wired up.
    pub provider: String,
    /// Model name passed to the embeddings API.
    pub model: String,
    /// Dimensionality every stored vector must have.
    pub dimensions: u32,
    /// Texts per embeddings API request.
    pub batch_size: usize,
    /// Concurrent embedding requests during an index build.
    pub concurrency: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            batch_size: 100,
            concurrency: 2,
        }
    }
}

/// Content chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChunkingSettings {
    /// Maximum characters per PDF chunk.
    pub pdf_max_chars: usize,
    /// Character overlap between consecutive PDF chunks.
    pub pdf_overlap_chars: usize,
    /// Maximum words per transcript chunk.
    pub transcript_max_words: usize,
    /// Maximum time span per transcript chunk, in seconds.
    pub transcript_max_seconds: f64,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            pdf_max_chars: 1200,
            pdf_overlap_chars: 200,
            transcript_max_words: 80,
            transcript_max_seconds: 45.0,
        }
    }
}

/// Hybrid retrieval and fusion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrievalSettings {
    /// Minimum fused score a candidate must reach to survive (inclusive).
    pub relevance_threshold: f32,
    /// Maximum candidates after fusion, and per-list depth before it.
    pub max_results: usize,
    /// Weight of the normalized lexical score in fusion.
    pub lexical_weight: f32,
    /// Weight of the normalized vector score in fusion.
    pub vector_weight: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            relevance_threshold: 0.3,
            max_results: 10,
            lexical_weight: 0.5,
            vector_weight: 0.5,
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RagSettings {
    /// LLM model for answer generation.
    pub model: String,
    /// Maximum characters of assembled context per query.
    pub context_budget_chars: usize,
    /// Combined retrieval + generation latency budget per query.
    pub query_timeout_seconds: u64,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            context_budget_chars: 6000,
            query_timeout_seconds: 60,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory whose rag.toml overrides the built-in templates.
    pub custom_dir: Option<String>,
    /// Extra `{{name}}` substitutions applied to every prompt render.
    pub variables: std::collections::HashMap<String, String>,
}


impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load and validate settings, falling back to defaults when no config
    /// file exists yet.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = path.cloned().unwrap_or_else(Self::default_config_path);

        let settings = if config_path.exists() {
            toml::from_str(&std::fs::read_to_string(&config_path)?)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Check every recognized option against its valid range.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.retrieval.relevance_threshold) {
            return Err(KildeError::Config(format!(
                "retrieval.relevance_threshold must be in [0, 1], got {}",
                self.retrieval.relevance_threshold
            )));
        }
        if self.retrieval.max_results == 0 {
            return Err(KildeError::Config(
                "retrieval.max_results must be greater than 0".to_string(),
            ));
        }
        if self.retrieval.lexical_weight < 0.0 || self.retrieval.vector_weight < 0.0 {
            return Err(KildeError::Config(format!(
                "retrieval weights must be non-negative, got lexical={} vector={}",
                self.retrieval.lexical_weight, self.retrieval.vector_weight
            )));
        }
        let weight_sum = self.retrieval.lexical_weight + self.retrieval.vector_weight;
        if (weight_sum - 1.0).abs() > 0.05 {
            warn!(
                "retrieval weights sum to {:.2}; fused scores will not span [0, 1]",
                weight_sum
            );
        }
        if self.rag.context_budget_chars == 0 {
            return Err(KildeError::Config(
                "rag.context_budget_chars must be greater than 0".to_string(),
            ));
        }
        if self.rag.query_timeout_seconds == 0 {
            return Err(KildeError::Config(
                "rag.query_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.chunking.pdf_max_chars == 0 || self.chunking.transcript_max_words == 0 {
            return Err(KildeError::Config(
                "chunking bounds must be greater than 0".to_string(),
            ));
        }
        if self.chunking.pdf_overlap_chars >= self.chunking.pdf_max_chars {
            return Err(KildeError::Config(format!(
                "chunking.pdf_overlap_chars ({}) must be smaller than pdf_max_chars ({})",
                self.chunking.pdf_overlap_chars, self.chunking.pdf_max_chars
            )));
        }
        if self.chunking.transcript_max_seconds <= 0.0 {
            return Err(KildeError::Config(
                "chunking.transcript_max_seconds must be positive".to_string(),
            ));
        }
        if self.embedding.dimensions == 0 || self.embedding.batch_size == 0 {
            return Err(KildeError::Config(
                "embedding.dimensions and embedding.batch_size must be greater than 0".to_string(),
            ));
        }
        if self.embedding.concurrency == 0 {
            return Err(KildeError::Config(
                "embedding.concurrency must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Platform config location, e.g. `~/.config/kilde/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kilde")
            .join("config.toml")
    }

    /// Turn a configured path into a usable one (`~` expanded).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    pub fn pdf_dir(&self) -> PathBuf {
        Self::expand_path(&self.corpus.pdf_dir)
    }

    pub fn transcript_dir(&self) -> PathBuf {
        Self::expand_path(&self.corpus.transcript_dir)
    }

    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.store.sqlite_path)
    }
}
