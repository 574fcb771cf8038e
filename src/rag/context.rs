//! Context assembly under a character budget.

use super::Citation;
use crate::chunking::SourceSpan;
use crate::retrieval::RankedChunk;
use tracing::debug;

/// A chunk selected into the context for one query.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    pub chunk_id: String,
    pub source_id: String,
    pub span: SourceSpan,
    pub text: String,
    pub fused_score: f32,
}

/// The assembled context for one query. Immutable once assembled.
#[derive(Debug, Clone)]
pub struct Context {
    /// Rendered excerpt blocks, ready to embed in a prompt.
    text: String,
    /// Selected chunks in ranked order.
    pub chunks: Vec<ContextChunk>,
    /// Citation map mirroring the chunk order.
    pub citations: Vec<Citation>,
    /// Characters consumed, including citation markers and separators.
    pub total_chars: usize,
}

impl Context {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The context text for the generation prompt.
    pub fn prompt_text(&self) -> &str {
        &self.text
    }
}

/// Packs ranked candidates into a context bounded by a character budget.
///
/// Chunks are taken in ranked order. A chunk whose rendered block does not
/// fit the remaining budget is skipped whole, never truncated mid-chunk, and
/// iteration continues with later candidates, so a single oversized
/// top-ranked chunk cannot starve the context.
pub struct ContextAssembler {
    budget_chars: usize,
}

impl ContextAssembler {
    pub fn new(budget_chars: usize) -> Self {
        Self { budget_chars }
    }

    pub fn assemble(&self, ranked: &[RankedChunk]) -> Context {
        let mut text = String::new();
        let mut chunks = Vec::new();
        let mut citations = Vec::new();
        let mut total_chars = 0usize;

        for ranked_chunk in ranked {
            let marker = chunks.len() + 1;
            let block = format_block(marker, ranked_chunk);

            let separator_chars = if chunks.is_empty() { 0 } else { SEPARATOR.chars().count() };
            let block_chars = block.chars().count() + separator_chars;

            if total_chars + block_chars > self.budget_chars {
                debug!(
                    "Skipping chunk {} ({} chars over budget)",
                    ranked_chunk.candidate.chunk_id,
                    total_chars + block_chars - self.budget_chars
                );
                continue;
            }

            if !chunks.is_empty() {
                text.push_str(SEPARATOR);
            }
            text.push_str(&block);
            total_chars += block_chars;

            let record = &ranked_chunk.record;
            chunks.push(ContextChunk {
                chunk_id: record.chunk_id.clone(),
                source_id: record.source_id.clone(),
                span: record.span.clone(),
                text: record.text.clone(),
                fused_score: ranked_chunk.candidate.fused_score,
            });
            citations.push(Citation {
                marker,
                chunk_id: record.chunk_id.clone(),
                source_id: record.source_id.clone(),
                span: record.span.clone(),
            });
        }

        debug!(
            "Assembled context: {} chunks, {} of {} chars",
            chunks.len(),
            total_chars,
            self.budget_chars
        );

        Context {
            text,
            chunks,
            citations,
            total_chars,
        }
    }
}

const SEPARATOR: &str = "\n\n";

/// One numbered excerpt block with its provenance line.
fn format_block(marker: usize, ranked: &RankedChunk) -> String {
    let record = &ranked.record;
    format!(
        "[{}] {} ({})\n{}",
        marker,
        record.source_id,
        record.span.format(),
        record.text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::SearchCandidate;
    use crate::source::SourceKind;
    use crate::store::ChunkRecord;
    use chrono::Utc;

    fn ranked(chunk_id: &str, text: &str, fused_score: f32) -> RankedChunk {
        RankedChunk {
            candidate: SearchCandidate {
                chunk_id: chunk_id.to_string(),
                lexical_score: Some(1.0),
                vector_score: None,
                fused_score,
            },
            record: ChunkRecord {
                chunk_id: chunk_id.to_string(),
                kind: SourceKind::Pdf,
                source_id: chunk_id.split('#').next().unwrap_or(chunk_id).to_string(),
                ordinal: 0,
                text: text.to_string(),
                span: SourceSpan::Pages { first: 1, last: 1 },
                embedding: vec![],
                pdf_reference: None,
                generation: 0,
                indexed_at: Utc::now(),
            },
        }
    }

    #[test]
    fn test_assembles_in_ranked_order_with_citations() {
        let assembler = ContextAssembler::new(10_000);
        let context = assembler.assemble(&[
            ranked("a#0000", "First excerpt.", 0.9),
            ranked("b#0000", "Second excerpt.", 0.7),
        ]);

        assert_eq!(context.chunks.len(), 2);
        assert_eq!(context.citations.len(), 2);
        assert_eq!(context.citations[0].marker, 1);
        assert_eq!(context.citations[0].chunk_id, "a#0000");
        assert_eq!(context.citations[1].marker, 2);
        assert!(context.prompt_text().starts_with("[1] a (p. 1)\nFirst excerpt."));
        assert!(context.prompt_text().contains("[2] b (p. 1)\nSecond excerpt."));
    }

    #[test]
    fn test_never_exceeds_budget() {
        let assembler = ContextAssembler::new(60);
        let context = assembler.assemble(&[
            ranked("a#0000", "A fairly long first excerpt of text.", 0.9),
            ranked("b#0000", "Another excerpt that will not fit.", 0.8),
        ]);

        assert!(context.total_chars <= 60);
        assert_eq!(context.chunks.len(), 1);
        assert_eq!(context.prompt_text().chars().count(), context.total_chars);
    }

    #[test]
    fn test_oversized_top_candidate_is_skipped_whole() {
        let assembler = ContextAssembler::new(40);
        let huge = "x".repeat(500);
        let context = assembler.assemble(&[
            ranked("a#0000", &huge, 0.9),
            ranked("b#0000", "Short one.", 0.5),
        ]);

        // The oversized rank-1 chunk is dropped, not truncated; the shorter
        // lower-ranked chunk still makes it in, as citation [1].
        assert_eq!(context.chunks.len(), 1);
        assert_eq!(context.chunks[0].chunk_id, "b#0000");
        assert_eq!(context.citations[0].marker, 1);
        assert!(context.total_chars <= 40);
        assert!(!context.prompt_text().contains("xxx"));
    }

    #[test]
    fn test_empty_candidates_yield_empty_context() {
        let context = ContextAssembler::new(100).assemble(&[]);
        assert!(context.is_empty());
        assert_eq!(context.total_chars, 0);
        assert_eq!(context.prompt_text(), "");
    }
}
