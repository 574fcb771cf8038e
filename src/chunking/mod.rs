//! Chunking: turning source material into fixed-identity, indexable chunks.
//!
//! Chunk identity is a pure function of `(source_id, ordinal)`, so chunking
//! the same source material twice yields byte-identical chunks and ids.
//! Chunkers never perform I/O; reading happens in [`crate::source`] and
//! writing in [`crate::index`].

mod pdf;
mod transcript;

pub use pdf::PdfChunker;
pub use transcript::TranscriptChunker;

use crate::source::SourceKind;
use serde::{Deserialize, Serialize};

/// Where a chunk sits inside its source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceSpan {
    /// Covering page range of a PDF chunk (1-based, inclusive).
    Pages { first: u32, last: u32 },
    /// Covering time range of a transcript chunk, in seconds.
    Time { start_seconds: f64, end_seconds: f64 },
}

impl SourceSpan {
    /// Compact form for citations, e.g. `p. 3-5` or `00:12-01:40`.
    pub fn format(&self) -> String {
        match self {
            SourceSpan::Pages { first, last } => {
                if first == last {
                    format!("p. {}", first)
                } else {
                    format!("p. {}-{}", first, last)
                }
            }
            SourceSpan::Time {
                start_seconds,
                end_seconds,
            } => format!(
                "{}-{}",
                format_timestamp(*start_seconds),
                format_timestamp(*end_seconds)
            ),
        }
    }
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// An indexable unit of text with stable identity and provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic id: `{source_id}#{ordinal:04}`.
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
    /// Embedding vector, populated by the indexing pipeline.
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Create a chunk with its id derived from `(source_id, ordinal)`.
    pub fn new(
        kind: SourceKind,
        source_id: impl Into<String>,
        ordinal: u32,
        text: String,
        span: SourceSpan,
    ) -> Self {
        let source_id = source_id.into();
        Self {
            chunk_id: chunk_id(&source_id, ordinal),
            kind,
            source_id,
            ordinal,
            text,
            span,
            embedding: None,
        }
    }
}

/// Derive a chunk id from its source id and ordinal.
///
/// The ordinal is zero-padded so that lexicographic order on ids within one
/// source follows chunk order.
pub fn chunk_id(source_id: &str, ordinal: u32) -> String {
    format!("{}#{:04}", source_id, ordinal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_deterministic() {
        assert_eq!(chunk_id("physics_ch1", 0), "physics_ch1#0000");
        assert_eq!(chunk_id("physics_ch1", 42), "physics_ch1#0042");
        assert_eq!(chunk_id("physics_ch1", 42), chunk_id("physics_ch1", 42));
    }

    #[test]
    fn test_chunk_id_ordering_follows_ordinals() {
        let ids: Vec<String> = (0..12).map(|i| chunk_id("v", i)).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_span_format() {
        assert_eq!(SourceSpan::Pages { first: 3, last: 3 }.format(), "p. 3");
        assert_eq!(SourceSpan::Pages { first: 3, last: 5 }.format(), "p. 3-5");
        assert_eq!(
            SourceSpan::Time {
                start_seconds: 12.0,
                end_seconds: 100.0
            }
            .format(),
            "00:12-01:40"
        );
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(65.0), "01:05");
        assert_eq!(format_timestamp(3665.0), "01:01:05");
    }
}
