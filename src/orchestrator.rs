//! Pipeline orchestrator for Kilde.
//!
//! Coordinates the index build (read, chunk, embed, store) and query serving
//! (retrieve, fuse, assemble, generate). The two pipelines are independent;
//! the store's generation swap is the only synchronization point between a
//! rebuild and concurrent queries.

use crate::chunking::{PdfChunker, TranscriptChunker};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{KildeError, Result};
use crate::generation::{Generator, OpenAIGenerator};
use crate::index::{DomainReport, IndexMode, Indexer, SourceChunks};
use crate::rag::{AnswerEngine, ContextAssembler, QueryOutcome};
use crate::retrieval::{fuse, FusionWeights, HybridRetriever};
use crate::source::{self, SourceKind};
use crate::store::{IndexedSource, MemorySearchStore, SearchStore, SqliteSearchStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// The main orchestrator for the Kilde pipelines.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    store: Arc<dyn SearchStore>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
}

impl Orchestrator {
    /// Create a new orchestrator with default components.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let store: Arc<dyn SearchStore> = match settings.store.provider.as_str() {
            "memory" => Arc::new(MemorySearchStore::new()),
            "sqlite" => Arc::new(SqliteSearchStore::new(&settings.sqlite_path())?),
            other => {
                return Err(KildeError::Config(format!(
                    "unknown store provider: {}",
                    other
                )))
            }
        };

        let embedder = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
            settings.embedding.batch_size,
        ));

        let generator = Arc::new(OpenAIGenerator::new(
            &settings.rag.model,
            &prompts.rag.system,
        ));

        Ok(Self {
            settings,
            prompts,
            store,
            embedder,
            generator,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        store: Arc<dyn SearchStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            settings,
            prompts,
            store,
            embedder,
            generator,
        }
    }

    /// Get a reference to the search store.
    pub fn store(&self) -> Arc<dyn SearchStore> {
        self.store.clone()
    }

    /// Get a reference to the embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Build or update the index from the configured corpus directories.
    ///
    /// A malformed source is recorded and skipped; it never aborts the run.
    #[instrument(skip(self))]
    pub async fn build_index(&self, mode: IndexMode) -> Result<BuildReport> {
        let manifest = source::discover(&self.settings.pdf_dir(), &self.settings.transcript_dir())?;
        if manifest.is_empty() {
            warn!("No source files found in the configured corpus directories");
        }

        let mut failed_sources = Vec::new();

        let pdf_chunker = PdfChunker::new(
            self.settings.chunking.pdf_max_chars,
            self.settings.chunking.pdf_overlap_chars,
        );
        let mut pdf_sources = Vec::new();
        for path in &manifest.pdfs {
            match source::read_pdf_pages(path) {
                Ok(doc) => {
                    let chunks = pdf_chunker.chunk(&doc);
                    pdf_sources.push(SourceChunks {
                        source_id: doc.pdf_id,
                        pdf_reference: None,
                        chunks,
                    });
                }
                Err(e) => record_failed_source(path, e, &mut failed_sources),
            }
        }

        let transcript_chunker = TranscriptChunker::new(
            self.settings.chunking.transcript_max_words,
            self.settings.chunking.transcript_max_seconds,
        );
        let mut video_sources = Vec::new();
        for path in &manifest.transcripts {
            let chunked = source::read_transcript(path)
                .and_then(|transcript| {
                    transcript_chunker
                        .chunk(&transcript)
                        .map(|chunks| (transcript, chunks))
                });
            match chunked {
                Ok((transcript, chunks)) => video_sources.push(SourceChunks {
                    source_id: transcript.video_id,
                    pdf_reference: transcript.pdf_reference,
                    chunks,
                }),
                Err(e) => record_failed_source(path, e, &mut failed_sources),
            }
        }

        let indexer = Indexer::new(
            self.store.clone(),
            self.embedder.clone(),
            self.settings.embedding.batch_size,
            self.settings.embedding.concurrency,
        );

        let pdf = indexer
            .index_domain(SourceKind::Pdf, pdf_sources, mode)
            .await?;
        let video = indexer
            .index_domain(SourceKind::Video, video_sources, mode)
            .await?;

        let report = BuildReport {
            pdf,
            video,
            failed_sources,
        };
        info!(
            "Index build complete: {} chunks indexed, {} failed, {} sources skipped",
            report.total_indexed(),
            report.total_failed(),
            report.failed_sources.len()
        );
        Ok(report)
    }

    /// Answer a question over the indexed corpus.
    ///
    /// The combined retrieval + generation latency is bounded by the
    /// configured query timeout; on expiry the in-flight calls are dropped
    /// and [`KildeError::Timeout`] surfaces. No partial answer is returned.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn answer_question(&self, question: &str) -> Result<QueryOutcome> {
        if question.trim().is_empty() {
            return Err(KildeError::InvalidInput("question cannot be empty".to_string()));
        }

        let timeout_seconds = self.settings.rag.query_timeout_seconds;
        match tokio::time::timeout(
            Duration::from_secs(timeout_seconds),
            self.answer_inner(question),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(KildeError::Timeout(timeout_seconds)),
        }
    }

    async fn answer_inner(&self, question: &str) -> Result<QueryOutcome> {
        let retrieval = &self.settings.retrieval;

        let retriever = HybridRetriever::new(self.store.clone(), self.embedder.clone());
        let (lexical, vector) = retriever.retrieve(question, retrieval.max_results).await?;

        let ranked = fuse(
            lexical,
            vector,
            &FusionWeights {
                lexical: retrieval.lexical_weight,
                vector: retrieval.vector_weight,
            },
            retrieval.relevance_threshold,
            retrieval.max_results,
        );

        if ranked.is_empty() {
            info!("No candidates above the relevance threshold");
            return Ok(QueryOutcome::no_relevant_results());
        }

        let context =
            ContextAssembler::new(self.settings.rag.context_budget_chars).assemble(&ranked);
        if context.is_empty() {
            info!("No candidate fit the context budget");
            return Ok(QueryOutcome::no_relevant_results());
        }

        let engine = AnswerEngine::new(self.generator.clone(), self.prompts.clone());
        let answer = engine.answer(question, &context).await?;
        Ok(QueryOutcome::Answered(answer))
    }

    /// Current index statistics: chunk counts per domain and the indexed
    /// sources behind them.
    pub async fn index_stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            pdf_chunks: self.store.count(Some(SourceKind::Pdf)).await?,
            video_chunks: self.store.count(Some(SourceKind::Video)).await?,
            sources: self.store.list_sources().await?,
        })
    }
}

fn record_failed_source(path: &Path, error: KildeError, failed: &mut Vec<FailedSource>) {
    warn!("Skipping source {:?}: {}", path, error);
    failed.push(FailedSource {
        path: path.display().to_string(),
        reason: error.to_string(),
    });
}

/// A source file skipped during an index build.
#[derive(Debug)]
pub struct FailedSource {
    pub path: String,
    pub reason: String,
}

/// Result of an index build across both domains.
#[derive(Debug)]
pub struct BuildReport {
    pub pdf: DomainReport,
    pub video: DomainReport,
    /// Sources skipped whole (unreadable or malformed).
    pub failed_sources: Vec<FailedSource>,
}

impl BuildReport {
    pub fn total_indexed(&self) -> usize {
        self.pdf.indexed + self.video.indexed
    }

    pub fn total_failed(&self) -> usize {
        self.pdf.failed + self.video.failed
    }
}

/// Index statistics per domain, plus the indexed sources.
#[derive(Debug)]
pub struct IndexStats {
    pub pdf_chunks: usize,
    pub video_chunks: usize,
    pub sources: Vec<IndexedSource>,
}
