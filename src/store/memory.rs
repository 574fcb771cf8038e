//! In-memory search store implementation.
//!
//! Useful for testing and small corpora. Lexical scoring is a plain term
//! frequency over the query terms, standing in for the SQLite store's BM25.

use super::{
    cosine_similarity, query_terms, rank_and_truncate, ChunkRecord, IndexedSource, ScoredChunk,
    SearchStore,
};
use crate::error::Result;
use crate::source::SourceKind;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory search store.
pub struct MemorySearchStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    records: Vec<ChunkRecord>,
    active: HashMap<SourceKind, u64>,
    reserved: HashMap<SourceKind, u64>,
}

impl Inner {
    fn active_for(&self, kind: SourceKind) -> u64 {
        self.active.get(&kind).copied().unwrap_or(0)
    }

    fn is_active(&self, record: &ChunkRecord) -> bool {
        record.generation == self.active_for(record.kind)
    }
}

impl MemorySearchStore {
    /// Create a new in-memory search store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for MemorySearchStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchStore for MemorySearchStore {
    async fn insert_or_update(&self, record: &ChunkRecord) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner
            .records
            .retain(|r| !(r.chunk_id == record.chunk_id && r.generation == record.generation));
        inner.records.push(record.clone());
        Ok(())
    }

    async fn delete(&self, chunk_id: &str) -> Result<usize> {
        let mut inner = self.inner.write().unwrap();
        let active: HashMap<SourceKind, u64> = inner.active.clone();
        let initial_len = inner.records.len();
        inner.records.retain(|r| {
            !(r.chunk_id == chunk_id
                && r.generation == active.get(&r.kind).copied().unwrap_or(0))
        });
        Ok(initial_len - inner.records.len())
    }

    async fn search_lexical(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let terms = query_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let inner = self.inner.read().unwrap();
        let results: Vec<ScoredChunk> = inner
            .records
            .iter()
            .filter(|r| inner.is_active(r))
            .filter_map(|record| {
                let text_terms = query_terms(&record.text);
                let score: usize = terms
                    .iter()
                    .map(|term| text_terms.iter().filter(|t| *t == term).count())
                    .sum();
                (score > 0).then(|| ScoredChunk {
                    record: record.clone(),
                    score: score as f32,
                })
            })
            .collect();

        Ok(rank_and_truncate(results, k))
    }

    async fn search_vector(&self, query_embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let inner = self.inner.read().unwrap();
        let results: Vec<ScoredChunk> = inner
            .records
            .iter()
            .filter(|r| inner.is_active(r))
            .map(|record| ScoredChunk {
                score: cosine_similarity(query_embedding, &record.embedding),
                record: record.clone(),
            })
            .collect();

        Ok(rank_and_truncate(results, k))
    }

    async fn count(&self, kind: Option<SourceKind>) -> Result<usize> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .records
            .iter()
            .filter(|r| inner.is_active(r))
            .filter(|r| kind.map_or(true, |k| r.kind == k))
            .count())
    }

    async fn active_generation(&self, kind: SourceKind) -> Result<u64> {
        Ok(self.inner.read().unwrap().active_for(kind))
    }

    async fn begin_generation(&self, kind: SourceKind) -> Result<u64> {
        let mut inner = self.inner.write().unwrap();
        let next = inner
            .active_for(kind)
            .max(inner.reserved.get(&kind).copied().unwrap_or(0))
            + 1;
        inner.reserved.insert(kind, next);
        Ok(next)
    }

    async fn activate_generation(&self, kind: SourceKind, generation: u64) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.active.insert(kind, generation);
        inner
            .records
            .retain(|r| r.kind != kind || r.generation == generation);
        Ok(())
    }

    async fn source_chunk_ids(&self, source_id: &str) -> Result<Vec<String>> {
        let inner = self.inner.read().unwrap();
        let mut ids: Vec<String> = inner
            .records
            .iter()
            .filter(|r| inner.is_active(r) && r.source_id == source_id)
            .map(|r| r.chunk_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let inner = self.inner.read().unwrap();
        let mut sources: HashMap<String, IndexedSource> = HashMap::new();

        for record in inner.records.iter().filter(|r| inner.is_active(r)) {
            let entry = sources
                .entry(record.source_id.clone())
                .or_insert_with(|| IndexedSource {
                    source_id: record.source_id.clone(),
                    kind: record.kind,
                    chunk_count: 0,
                    pdf_reference: record.pdf_reference.clone(),
                    indexed_at: record.indexed_at,
                });

            entry.chunk_count += 1;
            if record.indexed_at > entry.indexed_at {
                entry.indexed_at = record.indexed_at;
            }
        }

        let mut result: Vec<IndexedSource> = sources.into_values().collect();
        result.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::SourceSpan;
    use chrono::Utc;

    fn record(kind: SourceKind, source_id: &str, ordinal: u32, text: &str, generation: u64) -> ChunkRecord {
        ChunkRecord {
            chunk_id: crate::chunking::chunk_id(source_id, ordinal),
            kind,
            source_id: source_id.to_string(),
            ordinal,
            text: text.to_string(),
            span: SourceSpan::Pages { first: 1, last: 1 },
            embedding: vec![1.0, 0.0, 0.0],
            pdf_reference: None,
            generation,
            indexed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_lexical_search_scores_term_frequency() {
        let store = MemorySearchStore::new();
        store
            .insert_or_update(&record(SourceKind::Pdf, "a", 0, "the sky is blue, the sky glows", 0))
            .await
            .unwrap();
        store
            .insert_or_update(&record(SourceKind::Pdf, "b", 0, "grass is green", 0))
            .await
            .unwrap();

        let results = store.search_lexical("sky color", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.source_id, "a");
        assert_eq!(results[0].score, 2.0);
    }

    #[tokio::test]
    async fn test_vector_search_ranks_by_similarity() {
        let store = MemorySearchStore::new();
        let mut close = record(SourceKind::Pdf, "a", 0, "x", 0);
        close.embedding = vec![1.0, 0.0, 0.0];
        let mut far = record(SourceKind::Pdf, "b", 0, "y", 0);
        far.embedding = vec![0.0, 1.0, 0.0];
        store.insert_or_update(&close).await.unwrap();
        store.insert_or_update(&far).await.unwrap();

        let results = store.search_vector(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results[0].record.source_id, "a");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_generation_swap_is_all_or_nothing() {
        let store = MemorySearchStore::new();
        store
            .insert_or_update(&record(SourceKind::Pdf, "old", 0, "old text", 0))
            .await
            .unwrap();
        store
            .insert_or_update(&record(SourceKind::Pdf, "old", 1, "more old text", 0))
            .await
            .unwrap();

        let generation = store.begin_generation(SourceKind::Pdf).await.unwrap();
        assert_eq!(generation, 1);
        store
            .insert_or_update(&record(SourceKind::Pdf, "new", 0, "new text", generation))
            .await
            .unwrap();

        // Mid-rebuild reads still see the fully-old generation.
        assert_eq!(store.count(Some(SourceKind::Pdf)).await.unwrap(), 2);
        let results = store.search_lexical("text", 10).await.unwrap();
        assert!(results.iter().all(|r| r.record.source_id == "old"));

        store
            .activate_generation(SourceKind::Pdf, generation)
            .await
            .unwrap();

        // After the swap, only the fully-new generation is visible.
        assert_eq!(store.count(Some(SourceKind::Pdf)).await.unwrap(), 1);
        let results = store.search_lexical("text", 10).await.unwrap();
        assert!(results.iter().all(|r| r.record.source_id == "new"));
    }

    #[tokio::test]
    async fn test_rebuild_leaves_other_domain_untouched(){
        let store = MemorySearchStore::new();
        store
            .insert_or_update(&record(SourceKind::Video, "vid", 0, "spoken words", 0))
            .await
            .unwrap();

        let generation = store.begin_generation(SourceKind::Pdf).await.unwrap();
        store
            .insert_or_update(&record(SourceKind::Pdf, "doc", 0, "page text", generation))
            .await
            .unwrap();
        store
            .activate_generation(SourceKind::Pdf, generation)
            .await
            .unwrap();

        assert_eq!(store.count(Some(SourceKind::Video)).await.unwrap(), 1);
        assert_eq!(store.count(Some(SourceKind::Pdf)).await.unwrap(), 1);
        assert_eq!(store.count(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_and_source_chunk_ids() {
        let store = MemorySearchStore::new();
        store
            .insert_or_update(&record(SourceKind::Pdf, "doc", 0, "a", 0))
            .await
            .unwrap();
        store
            .insert_or_update(&record(SourceKind::Pdf, "doc", 1, "b", 0))
            .await
            .unwrap();

        assert_eq!(
            store.source_chunk_ids("doc").await.unwrap(),
            vec!["doc#0000", "doc#0001"]
        );

        assert_eq!(store.delete("doc#0000").await.unwrap(), 1);
        assert_eq!(store.source_chunk_ids("doc").await.unwrap(), vec!["doc#0001"]);
    }

    #[tokio::test]
    async fn test_list_sources() {
        let store = MemorySearchStore::new();
        store
            .insert_or_update(&record(SourceKind::Pdf, "doc", 0, "a", 0))
            .await
            .unwrap();
        store
            .insert_or_update(&record(SourceKind::Pdf, "doc", 1, "b", 0))
            .await
            .unwrap();
        let mut video = record(SourceKind::Video, "vid", 0, "c", 0);
        video.pdf_reference = Some("doc".to_string());
        store.insert_or_update(&video).await.unwrap();

        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].source_id, "doc");
        assert_eq!(sources[0].chunk_count, 2);
        assert_eq!(sources[1].pdf_reference.as_deref(), Some("doc"));
    }
}
