//! Weighted-score fusion of lexical and vector result lists.
//!
//! Raw BM25 and cosine-similarity magnitudes live on incomparable scales, so
//! each list is min-max normalized to [0, 1] over its own candidates before
//! the weighted combination. A list whose scores are all equal (including a
//! single-candidate list) normalizes to 1.0 for every member.

use crate::store::{ChunkRecord, ScoredChunk};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Relative weights of the two retrieval strategies.
#[derive(Debug, Clone, Copy)]
pub struct FusionWeights {
    pub lexical: f32,
    pub vector: f32,
}

/// Per-query fusion outcome for one chunk. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SearchCandidate {
    pub chunk_id: String,
    /// Raw lexical score, when the lexical list returned this chunk.
    pub lexical_score: Option<f32>,
    /// Raw vector score, when the vector list returned this chunk.
    pub vector_score: Option<f32>,
    /// Weighted combination of the normalized scores.
    pub fused_score: f32,
}

/// A fused candidate together with its stored record.
#[derive(Debug, Clone)]
pub struct RankedChunk {
    pub candidate: SearchCandidate,
    pub record: ChunkRecord,
}

/// Merge two ranked lists into one, filter by relevance, and rank.
///
/// A chunk present in only one list contributes 0 for the missing normalized
/// score; absence from a strategy is informative, not neutral. Candidates
/// whose fused score falls strictly below `threshold` are discarded (the
/// bound is inclusive: exactly-equal survives). Survivors are ranked by
/// fused score descending, ties by chunk id ascending, and truncated to
/// `max_results`. An empty return means "nothing relevant"; there is no
/// unfiltered fallback.
pub fn fuse(
    lexical: Vec<ScoredChunk>,
    vector: Vec<ScoredChunk>,
    weights: &FusionWeights,
    threshold: f32,
    max_results: usize,
) -> Vec<RankedChunk> {
    let lexical_norms = normalized(&lexical);
    let vector_norms = normalized(&vector);

    struct Entry {
        record: ChunkRecord,
        lexical: Option<(f32, f32)>,
        vector: Option<(f32, f32)>,
    }

    let mut merged: BTreeMap<String, Entry> = BTreeMap::new();

    for (scored, norm) in lexical.into_iter().zip(lexical_norms) {
        merged.insert(
            scored.record.chunk_id.clone(),
            Entry {
                record: scored.record,
                lexical: Some((scored.score, norm)),
                vector: None,
            },
        );
    }

    for (scored, norm) in vector.into_iter().zip(vector_norms) {
        merged
            .entry(scored.record.chunk_id.clone())
            .and_modify(|entry| entry.vector = Some((scored.score, norm)))
            .or_insert(Entry {
                record: scored.record,
                lexical: None,
                vector: Some((scored.score, norm)),
            });
    }

    let total = merged.len();
    let mut ranked: Vec<RankedChunk> = merged
        .into_iter()
        .filter_map(|(chunk_id, entry)| {
            let norm_lexical = entry.lexical.map(|(_, n)| n).unwrap_or(0.0);
            let norm_vector = entry.vector.map(|(_, n)| n).unwrap_or(0.0);
            let fused_score = weights.lexical * norm_lexical + weights.vector * norm_vector;

            (fused_score >= threshold).then(|| RankedChunk {
                candidate: SearchCandidate {
                    chunk_id,
                    lexical_score: entry.lexical.map(|(raw, _)| raw),
                    vector_score: entry.vector.map(|(raw, _)| raw),
                    fused_score,
                },
                record: entry.record,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.candidate
            .fused_score
            .partial_cmp(&a.candidate.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.candidate.chunk_id.cmp(&b.candidate.chunk_id))
    });
    ranked.truncate(max_results);

    debug!(
        "Fused {} candidates, {} above threshold",
        total,
        ranked.len()
    );
    ranked
}

/// Min-max normalize a list's scores to [0, 1] over its own candidates.
fn normalized(list: &[ScoredChunk]) -> Vec<f32> {
    if list.is_empty() {
        return Vec::new();
    }

    let min = list.iter().map(|s| s.score).fold(f32::INFINITY, f32::min);
    let max = list
        .iter()
        .map(|s| s.score)
        .fold(f32::NEG_INFINITY, f32::max);

    if (max - min).abs() < f32::EPSILON {
        return vec![1.0; list.len()];
    }

    list.iter().map(|s| (s.score - min) / (max - min)).collect()
}
