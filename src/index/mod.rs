//! Indexing pipeline: embed chunks and push them into the search store.
//!
//! The indexer is the sole writer to the store. A rebuild populates a fresh
//! generation and activates it with one swap; incremental runs upsert into
//! the active generation and remove stale chunks of re-indexed sources in
//! the same pass.

use crate::chunking::Chunk;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::source::SourceKind;
use crate::store::{ChunkRecord, SearchStore};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// How an index run treats existing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Upsert into the active generation, removing stale chunks per source.
    Incremental,
    /// Build a fresh generation and atomically swap it in.
    Rebuild,
}

/// Chunks produced from one source document.
#[derive(Debug)]
pub struct SourceChunks {
    pub source_id: String,
    /// PDF source id a video discusses, carried into the index for stats.
    pub pdf_reference: Option<String>,
    pub chunks: Vec<Chunk>,
}

/// Outcome of indexing one domain.
#[derive(Debug, Default)]
pub struct DomainReport {
    /// Chunks successfully embedded and stored.
    pub indexed: usize,
    /// Chunks dropped by a per-chunk failure (embedding or storage).
    pub failed: usize,
    /// Stale chunks removed from re-indexed sources (incremental only).
    pub stale_removed: usize,
}

/// Embeds and stores chunks for one domain at a time.
pub struct Indexer {
    store: Arc<dyn SearchStore>,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    concurrency: usize,
}

impl Indexer {
    pub fn new(
        store: Arc<dyn SearchStore>,
        embedder: Arc<dyn Embedder>,
        batch_size: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            batch_size: batch_size.max(1),
            concurrency: concurrency.max(1),
        }
    }

    /// Index all chunks of one domain.
    ///
    /// A chunk whose embedding batch or store write fails is recorded and
    /// skipped; the run itself keeps going. In rebuild mode the new
    /// generation only becomes visible once every surviving chunk is in.
    #[instrument(skip(self, sources), fields(domain = %kind, sources = sources.len()))]
    pub async fn index_domain(
        &self,
        kind: SourceKind,
        sources: Vec<SourceChunks>,
        mode: IndexMode,
    ) -> Result<DomainReport> {
        let generation = match mode {
            IndexMode::Rebuild => self.store.begin_generation(kind).await?,
            IndexMode::Incremental => self.store.active_generation(kind).await?,
        };

        let mut report = DomainReport::default();
        let mut fresh_ids: Vec<(String, HashSet<String>)> = Vec::new();

        for source in &sources {
            fresh_ids.push((
                source.source_id.clone(),
                source.chunks.iter().map(|c| c.chunk_id.clone()).collect(),
            ));
        }

        // Embed in bounded-concurrency batches; a failed batch drops only
        // its own chunks.
        let flat: Vec<(&Chunk, Option<&str>)> = sources
            .iter()
            .flat_map(|s| {
                s.chunks
                    .iter()
                    .map(move |c| (c, s.pdf_reference.as_deref()))
            })
            .collect();

        let batches: Vec<Vec<(&Chunk, Option<&str>)>> =
            flat.chunks(self.batch_size).map(|b| b.to_vec()).collect();

        let embedded: Vec<(Vec<(&Chunk, Option<&str>)>, Result<Vec<Vec<f32>>>)> =
            stream::iter(batches)
                .map(|batch| async {
                    let texts: Vec<String> = batch.iter().map(|(c, _)| c.text.clone()).collect();
                    let result = self.embedder.embed_batch(&texts).await;
                    (batch, result)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        for (batch, result) in embedded {
            match result {
                Ok(embeddings) => {
                    for ((chunk, pdf_reference), embedding) in batch.into_iter().zip(embeddings) {
                        let record = ChunkRecord::from_chunk(
                            chunk,
                            embedding,
                            pdf_reference.map(String::from),
                            generation,
                        );
                        match self.store.insert_or_update(&record).await {
                            Ok(()) => report.indexed += 1,
                            Err(e) => {
                                warn!("Failed to store chunk {}: {}", chunk.chunk_id, e);
                                report.failed += 1;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("Embedding batch of {} chunks failed: {}", batch.len(), e);
                    report.failed += batch.len();
                }
            }
        }

        match mode {
            IndexMode::Rebuild => {
                self.store.activate_generation(kind, generation).await?;
            }
            IndexMode::Incremental => {
                for (source_id, fresh) in &fresh_ids {
                    let existing = self.store.source_chunk_ids(source_id).await?;
                    for stale in existing.iter().filter(|id| !fresh.contains(*id)) {
                        report.stale_removed += self.store.delete(stale).await?;
                    }
                }
            }
        }

        info!(
            "Indexed {} {} chunks ({} failed, {} stale removed)",
            report.indexed, kind, report.failed, report.stale_removed
        );
        Ok(report)
    }
}
