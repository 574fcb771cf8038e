//! Text-to-vector embedding behind a capability trait.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::Result;
use async_trait::async_trait;

/// The external embedding function.
///
/// Implementations must return one vector per input text, in input order,
/// each with exactly [`dimensions`](Embedder::dimensions) finite components.
/// A batch that cannot meet that contract fails whole; partially embedded
/// batches are never returned.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text (used for queries).
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts (used for indexing).
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Dimensionality of every returned vector.
    fn dimensions(&self) -> usize;
}
