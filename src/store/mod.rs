//! Search store abstraction for Kilde.
//!
//! Provides a trait-based interface over the combined lexical + vector index.
//! Writes go through generations: a rebuild populates a fresh generation and
//! activates it with a single swap, so readers never observe a half-built
//! index.

mod memory;
mod sqlite;

pub use memory::MemorySearchStore;
pub use sqlite::SqliteSearchStore;

use crate::chunking::{Chunk, SourceSpan};
use crate::error::Result;
use crate::source::SourceKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chunk as stored in the search index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Deterministic chunk id, `{source_id}#{ordinal:04}`.
    pub chunk_id: String,
    /// Corpus this chunk belongs to.
    pub kind: SourceKind,
    /// Source document id.
    pub source_id: String,
    /// Position of this chunk within its source.
    pub ordinal: u32,
    /// Chunk text.
    pub text: String,
    /// Covering page or time range.
    pub span: SourceSpan,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// PDF source id a video source discusses, carried for stats.
    pub pdf_reference: Option<String>,
    /// Index generation this record belongs to.
    pub generation: u64,
    /// When this record was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl ChunkRecord {
    /// Build a record from a chunk and its embedding.
    pub fn from_chunk(
        chunk: &Chunk,
        embedding: Vec<f32>,
        pdf_reference: Option<String>,
        generation: u64,
    ) -> Self {
        Self {
            chunk_id: chunk.chunk_id.clone(),
            kind: chunk.kind,
            source_id: chunk.source_id.clone(),
            ordinal: chunk.ordinal,
            text: chunk.text.clone(),
            span: chunk.span.clone(),
            embedding,
            pdf_reference,
            generation,
            indexed_at: Utc::now(),
        }
    }
}

/// A search result with its raw score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The matched record.
    pub record: ChunkRecord,
    /// Raw score: BM25-style for lexical, cosine similarity for vector.
    /// Higher is better on both sides; the scales are not comparable.
    pub score: f32,
}

/// Summary information about an indexed source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedSource {
    /// Source document id.
    pub source_id: String,
    /// Corpus the source belongs to.
    pub kind: SourceKind,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// PDF source id a video source discusses, when known.
    pub pdf_reference: Option<String>,
    /// When the source was last indexed.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for search store implementations.
///
/// All reads (searches, counts, listings) cover only the active generation of
/// each domain. The indexing pipeline is the sole writer.
#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Store a record, replacing any record with the same chunk id in the
    /// same generation.
    async fn insert_or_update(&self, record: &ChunkRecord) -> Result<()>;

    /// Delete a chunk from its domain's active generation.
    async fn delete(&self, chunk_id: &str) -> Result<usize>;

    /// Term-based search over chunk text, up to `k` results ranked by
    /// descending lexical score, ties by chunk id ascending.
    async fn search_lexical(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>>;

    /// Nearest-neighbor search over chunk embeddings, up to `k` results
    /// ranked by descending similarity, ties by chunk id ascending.
    async fn search_vector(&self, query_embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    /// Count indexed chunks, optionally restricted to one domain.
    async fn count(&self, kind: Option<SourceKind>) -> Result<usize>;

    /// The domain's currently active generation.
    async fn active_generation(&self, kind: SourceKind) -> Result<u64>;

    /// Reserve a fresh generation for a rebuild. Records inserted into it
    /// stay invisible to readers until [`activate_generation`] runs.
    ///
    /// [`activate_generation`]: SearchStore::activate_generation
    async fn begin_generation(&self, kind: SourceKind) -> Result<u64>;

    /// Atomically make `generation` the domain's active generation and prune
    /// all other generations of that domain.
    async fn activate_generation(&self, kind: SourceKind, generation: u64) -> Result<()>;

    /// Chunk ids currently indexed for one source, in id order.
    async fn source_chunk_ids(&self, source_id: &str) -> Result<Vec<String>>;

    /// List all indexed sources.
    async fn list_sources(&self) -> Result<Vec<IndexedSource>>;
}

/// Cosine similarity between two vectors. Mismatched lengths and zero
/// vectors score 0.0 rather than erroring; they can only come from a
/// misconfigured embedder and should rank last, not kill the query.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut sq_a, mut sq_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        sq_a += x * x;
        sq_b += y * y;
    }

    let denom = (sq_a * sq_b).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

/// Rank results by descending score, ties by chunk id ascending, keep `k`.
pub(crate) fn rank_and_truncate(mut results: Vec<ScoredChunk>, k: usize) -> Vec<ScoredChunk> {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.record.chunk_id.cmp(&b.record.chunk_id))
    });
    results.truncate(k);
    results
}

/// Split a query into lowercase alphanumeric terms.
pub(crate) fn query_terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}
