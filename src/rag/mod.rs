//! Grounded question answering over retrieved chunks.
//!
//! Retrieval finds candidates, the assembler packs them into a budgeted
//! context, and the answer engine turns context plus question into prose
//! with citations attached in context order.

mod answer;
pub mod context;

pub use answer::AnswerEngine;
pub use context::{Context, ContextAssembler, ContextChunk};

use crate::chunking::SourceSpan;
use serde::Serialize;

/// Where an answer statement can be traced back to.
#[derive(Debug, Clone, Serialize)]
pub struct Citation {
    /// Number of the excerpt in the assembled context, 1-based.
    pub marker: usize,
    pub chunk_id: String,
    pub source_id: String,
    pub span: SourceSpan,
}

impl Citation {
    /// Compact display form, e.g. `[2] physics_ch1 (p. 3-5)`.
    pub fn format(&self) -> String {
        format!("[{}] {} ({})", self.marker, self.source_id, self.span.format())
    }
}

/// A generated answer with its supporting citations.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    /// Citations in the order their chunks appeared in the context.
    pub citations: Vec<Citation>,
}

/// Outcome of one query.
///
/// "Nothing above the relevance threshold" is a distinguished outcome, not an
/// error, and deliberately never falls back to unfiltered results.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Answered(Answer),
    NoRelevantResults { message: String },
}

impl QueryOutcome {
    /// The standard no-results outcome with a rephrase suggestion.
    pub fn no_relevant_results() -> Self {
        Self::NoRelevantResults {
            message: "No indexed material was relevant enough to answer this question. \
                      Try rephrasing it, or ask about a topic the indexed documents cover."
                .to_string(),
        }
    }
}
