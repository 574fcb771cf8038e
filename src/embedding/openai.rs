//! OpenAI embeddings implementation.

use super::Embedder;
use crate::error::{KildeError, Result};
use crate::openai::create_client;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder with default settings.
    pub fn new() -> Self {
        Self::with_config("text-embedding-3-small", 1536, 100)
    }

    /// Create a new OpenAI embedder with custom model, dimensions, and batch size.
    pub fn with_config(model: &str, dimensions: usize, batch_size: usize) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            dimensions,
            batch_size: batch_size.max(1),
        }
    }

    /// One embeddings API call for up to `batch_size` texts. The response is
    /// re-sorted by index and validated before anything is returned, so a
    /// malformed element fails its whole batch.
    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(texts.to_vec()))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| KildeError::EmbeddingUnavailable(format!("request build: {e}")))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| KildeError::EmbeddingUnavailable(format!("embeddings API: {e}")))?;

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        let vectors: Vec<Vec<f32>> = data.into_iter().map(|d| d.embedding).collect();

        self.validate(&vectors, texts.len())?;
        Ok(vectors)
    }

    /// Reject vectors that would poison the index: wrong count, wrong
    /// dimensionality, or non-finite components.
    fn validate(&self, vectors: &[Vec<f32>], expected: usize) -> Result<()> {
        if vectors.len() != expected {
            return Err(KildeError::EmbeddingUnavailable(format!(
                "expected {expected} embeddings, got {}",
                vectors.len()
            )));
        }
        for (i, vector) in vectors.iter().enumerate() {
            if vector.len() != self.dimensions {
                return Err(KildeError::EmbeddingUnavailable(format!(
                    "embedding {i} has {} dimensions, expected {}",
                    vector.len(),
                    self.dimensions
                )));
            }
            if vector.iter().any(|c| !c.is_finite()) {
                return Err(KildeError::EmbeddingUnavailable(format!(
                    "embedding {i} contains non-finite components"
                )));
            }
        }
        Ok(())
    }
}

impl Default for OpenAIEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| KildeError::EmbeddingUnavailable("empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.request_batch(batch).await?);
        }
        debug!("Embedded {} texts", vectors.len());
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_creation() {
        let embedder = OpenAIEmbedder::new();
        assert_eq!(embedder.dimensions(), 1536);

        let embedder = OpenAIEmbedder::with_config("text-embedding-3-large", 3072, 64);
        assert_eq!(embedder.dimensions(), 3072);
    }

    #[test]
    fn test_validate_rejects_wrong_dimensionality() {
        let embedder = OpenAIEmbedder::with_config("m", 3, 10);
        let err = embedder.validate(&[vec![1.0, 0.0]], 1).unwrap_err();
        assert!(matches!(err, KildeError::EmbeddingUnavailable(_)));
    }

    #[test]
    fn test_validate_rejects_nan_components() {
        let embedder = OpenAIEmbedder::with_config("m", 3, 10);
        let err = embedder.validate(&[vec![1.0, f32::NAN, 0.0]], 1).unwrap_err();
        assert!(matches!(err, KildeError::EmbeddingUnavailable(_)));
    }

    #[test]
    fn test_validate_rejects_short_batch() {
        let embedder = OpenAIEmbedder::with_config("m", 2, 10);
        let err = embedder.validate(&[vec![1.0, 0.0]], 2).unwrap_err();
        assert!(matches!(err, KildeError::EmbeddingUnavailable(_)));
    }

    #[test]
    fn test_validate_accepts_well_formed_batch() {
        let embedder = OpenAIEmbedder::with_config("m", 2, 10);
        embedder.validate(&[vec![1.0, 0.0], vec![0.5, 0.5]], 2).unwrap();
    }
}
