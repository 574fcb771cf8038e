//! Hybrid retrieval: concurrent lexical + vector search over the store.

mod fusion;

pub use fusion::{fuse, FusionWeights, RankedChunk, SearchCandidate};

use crate::embedding::Embedder;
use crate::error::{KildeError, Result};
use crate::store::{ScoredChunk, SearchStore};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Issues a lexical and a vector search for one query, concurrently.
///
/// Store failures surface as [`KildeError::RetrievalUnavailable`], never an
/// empty list, so callers can tell "nothing matched" apart from "the store
/// was down". Query-embedding failures keep their own
/// [`KildeError::EmbeddingUnavailable`] identity.
pub struct HybridRetriever {
    store: Arc<dyn SearchStore>,
    embedder: Arc<dyn Embedder>,
}

impl HybridRetriever {
    pub fn new(store: Arc<dyn SearchStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Retrieve up to `k` candidates per strategy, as two ranked lists.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<(Vec<ScoredChunk>, Vec<ScoredChunk>)> {
        let lexical = async {
            self.store.search_lexical(query, k).await.map_err(|e| {
                KildeError::RetrievalUnavailable(format!("lexical search: {}", e))
            })
        };

        let vector = async {
            let query_embedding = self.embedder.embed(query).await?;
            self.store
                .search_vector(&query_embedding, k)
                .await
                .map_err(|e| KildeError::RetrievalUnavailable(format!("vector search: {}", e)))
        };

        let (lexical, vector) = tokio::join!(lexical, vector);
        let (lexical, vector) = (lexical?, vector?);

        debug!(
            "Retrieved {} lexical and {} vector candidates",
            lexical.len(),
            vector.len()
        );
        Ok((lexical, vector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::SourceSpan;
    use crate::source::SourceKind;
    use crate::store::{ChunkRecord, IndexedSource, MemorySearchStore};
    use async_trait::async_trait;
    use chrono::Utc;

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    struct FailingStore;

    #[async_trait]
    impl SearchStore for FailingStore {
        async fn insert_or_update(&self, _record: &ChunkRecord) -> Result<()> {
            unreachable!()
        }
        async fn delete(&self, _chunk_id: &str) -> Result<usize> {
            unreachable!()
        }
        async fn search_lexical(&self, _query: &str, _k: usize) -> Result<Vec<ScoredChunk>> {
            Err(KildeError::Store("connection refused".to_string()))
        }
        async fn search_vector(
            &self,
            _query_embedding: &[f32],
            _k: usize,
        ) -> Result<Vec<ScoredChunk>> {
            Err(KildeError::Store("connection refused".to_string()))
        }
        async fn count(&self, _kind: Option<SourceKind>) -> Result<usize> {
            unreachable!()
        }
        async fn active_generation(&self, _kind: SourceKind) -> Result<u64> {
            unreachable!()
        }
        async fn begin_generation(&self, _kind: SourceKind) -> Result<u64> {
            unreachable!()
        }
        async fn activate_generation(&self, _kind: SourceKind, _generation: u64) -> Result<()> {
            unreachable!()
        }
        async fn source_chunk_ids(&self, _source_id: &str) -> Result<Vec<String>> {
            unreachable!()
        }
        async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
            unreachable!()
        }
    }

    fn record(source_id: &str, text: &str, embedding: Vec<f32>) -> ChunkRecord {
        ChunkRecord {
            chunk_id: crate::chunking::chunk_id(source_id, 0),
            kind: SourceKind::Pdf,
            source_id: source_id.to_string(),
            ordinal: 0,
            text: text.to_string(),
            span: SourceSpan::Pages { first: 1, last: 1 },
            embedding,
            pdf_reference: None,
            generation: 0,
            indexed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_retrieve_returns_both_lists() {
        let store = Arc::new(MemorySearchStore::new());
        store
            .insert_or_update(&record("lex", "the sky is blue", vec![0.0, 1.0, 0.0]))
            .await
            .unwrap();
        store
            .insert_or_update(&record("vec", "unrelated words", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();

        let retriever = HybridRetriever::new(store, Arc::new(StubEmbedder));
        let (lexical, vector) = retriever.retrieve("sky", 5).await.unwrap();

        assert_eq!(lexical.len(), 1);
        assert_eq!(lexical[0].record.source_id, "lex");
        // Vector search returns both, nearest first.
        assert_eq!(vector.len(), 2);
        assert_eq!(vector[0].record.source_id, "vec");
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_retrieval_unavailable() {
        let retriever = HybridRetriever::new(Arc::new(FailingStore), Arc::new(StubEmbedder));
        let err = retriever.retrieve("anything", 5).await.unwrap_err();
        assert!(matches!(err, KildeError::RetrievalUnavailable(_)));
    }
}
