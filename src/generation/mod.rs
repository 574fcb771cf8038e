//! Answer generation: the external LLM call behind grounded answers.

mod openai;

pub use openai::OpenAIGenerator;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for prose generation from an assembled prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate text for a rendered prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
