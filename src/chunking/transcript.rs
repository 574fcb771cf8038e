//! Transcript chunking: word- and time-bounded aggregation of the word stream.

use super::{Chunk, SourceSpan};
use crate::error::{KildeError, Result};
use crate::source::{SourceKind, TranscriptFile, VideoWord};

/// Aggregates consecutive transcript words into chunks bounded by a maximum
/// word count or a maximum time span, whichever is reached first.
///
/// Word order is semantically meaningful, so a transcript with non-monotonic
/// timestamps is rejected with [`KildeError::MalformedSource`] instead of
/// being re-sorted.
pub struct TranscriptChunker {
    max_words: usize,
    max_seconds: f64,
}

impl TranscriptChunker {
    pub fn new(max_words: usize, max_seconds: f64) -> Self {
        Self {
            max_words: max_words.max(1),
            max_seconds,
        }
    }

    /// Split a transcript into chunks. Deterministic: the same word stream
    /// always yields the same chunk set, ids included.
    pub fn chunk(&self, transcript: &TranscriptFile) -> Result<Vec<Chunk>> {
        for pair in transcript.words.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(KildeError::malformed(
                    &transcript.video_id,
                    format!(
                        "non-monotonic timestamp {} after {} at word {}",
                        pair[1].timestamp, pair[0].timestamp, pair[1].id
                    ),
                ));
            }
        }

        let mut chunks = Vec::new();
        let mut current: Vec<&VideoWord> = Vec::new();

        for word in &transcript.words {
            if let Some(first) = current.first() {
                let words_full = current.len() >= self.max_words;
                let span_full = word.timestamp - first.timestamp > self.max_seconds;
                if words_full || span_full {
                    self.flush(&mut current, transcript, &mut chunks);
                }
            }
            current.push(word);
        }
        self.flush(&mut current, transcript, &mut chunks);

        Ok(chunks)
    }

    fn flush(&self, current: &mut Vec<&VideoWord>, transcript: &TranscriptFile, out: &mut Vec<Chunk>) {
        let (Some(first), Some(last)) = (current.first(), current.last()) else {
            return;
        };

        let text = current
            .iter()
            .map(|w| w.word.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();

        if !text.is_empty() {
            out.push(Chunk::new(
                SourceKind::Video,
                &transcript.video_id,
                out.len() as u32,
                text,
                SourceSpan::Time {
                    start_seconds: first.timestamp,
                    end_seconds: last.timestamp,
                },
            ));
        }

        current.clear();
    }
}
