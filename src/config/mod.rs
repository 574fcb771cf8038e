//! Configuration module for Kilde.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    ChunkingSettings, CorpusSettings, EmbeddingSettings, GeneralSettings, PromptSettings,
    RagSettings, RetrievalSettings, Settings, StoreSettings,
};
