//! PDF chunking: character-bounded segments with sentence-aware splits.

use super::{Chunk, SourceSpan};
use crate::source::{PdfDocument, SourceKind};
use regex::Regex;
use std::ops::Range;
use tracing::debug;

/// Splits page-indexed PDF text into chunks bounded by a maximum character
/// length, with a configurable overlap between consecutive chunks.
///
/// When a sentence boundary exists within the bound, the split lands on the
/// last such boundary instead of mid-sentence. A single sentence longer than
/// the bound is hard-split.
pub struct PdfChunker {
    max_chars: usize,
    overlap_chars: usize,
    sentence_end: Regex,
}

impl PdfChunker {
    pub fn new(max_chars: usize, overlap_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
            overlap_chars,
            // Sentence punctuation, optional closing quote/bracket, whitespace.
            sentence_end: Regex::new(r#"[.!?]["')\]]*\s"#).expect("valid sentence regex"),
        }
    }

    /// Split a PDF into chunks. Deterministic: the same document always yields
    /// the same chunk set, ids included. Empty pages are skipped.
    pub fn chunk(&self, pdf: &PdfDocument) -> Vec<Chunk> {
        let (full, page_spans) = concat_pages(pdf);
        if full.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut ordinal = 0u32;
        let mut start = 0usize;

        while start < full.len() {
            let end = self.segment_end(&full, start);
            let text = full[start..end].trim();

            if !text.is_empty() {
                let first = page_at(&page_spans, start);
                let last = page_at(&page_spans, end.saturating_sub(1));
                chunks.push(Chunk::new(
                    SourceKind::Pdf,
                    &pdf.pdf_id,
                    ordinal,
                    text.to_string(),
                    SourceSpan::Pages { first, last },
                ));
                ordinal += 1;
            }

            if end >= full.len() {
                break;
            }

            let mut next = prev_char_boundary(&full, end.saturating_sub(self.overlap_chars));
            if next <= start {
                next = end;
            }
            start = next;
        }

        chunks
    }

    /// End offset of the segment starting at `start`: the last sentence
    /// boundary within the character bound, or the bound itself.
    fn segment_end(&self, full: &str, start: usize) -> usize {
        if full.len() - start <= self.max_chars {
            return full.len();
        }

        let hard_end = prev_char_boundary(full, start + self.max_chars);
        if hard_end <= start {
            // A single multi-byte char wider than the bound; take it whole.
            return next_char_boundary(full, start + 1);
        }

        match self.sentence_end.find_iter(&full[start..hard_end]).last() {
            Some(m) if m.end() > 0 => start + m.end(),
            _ => hard_end,
        }
    }
}

/// Concatenate non-empty pages, recording the byte range each page occupies.
fn concat_pages(pdf: &PdfDocument) -> (String, Vec<(Range<usize>, u32)>) {
    let mut full = String::new();
    let mut spans = Vec::new();

    for page in &pdf.pages {
        let text = page.text.trim();
        if text.is_empty() {
            debug!(pdf_id = %pdf.pdf_id, page = page.number, "skipping empty page");
            continue;
        }
        if !full.is_empty() {
            full.push('\n');
        }
        let start = full.len();
        full.push_str(text);
        spans.push((start..full.len(), page.number));
    }

    (full, spans)
}

/// Page number covering a byte offset. Offsets inside the joining newline
/// resolve to the preceding page.
fn page_at(spans: &[(Range<usize>, u32)], offset: usize) -> u32 {
    spans
        .iter()
        .rev()
        .find(|(range, _)| offset >= range.start)
        .map(|(_, number)| *number)
        .unwrap_or(1)
}

fn prev_char_boundary(text: &str, mut i: usize) -> usize {
    i = i.min(text.len());
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn next_char_boundary(text: &str, mut i: usize) -> usize {
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i.min(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PdfPage;

    fn doc(pages: Vec<(u32, &str)>) -> PdfDocument {
        PdfDocument {
            pdf_id: "doc".to_string(),
            title: None,
            pages: pages
                .into_iter()
                .map(|(number, text)| PdfPage {
                    number,
                    text: text.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_short_document_single_chunk() {
        let chunker = PdfChunker::new(200, 20);
        let chunks = chunker.chunk(&doc(vec![(1, "The sky is blue. Water is wet.")]));

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, "doc#0000");
        assert_eq!(chunks[0].text, "The sky is blue. Water is wet.");
        assert_eq!(chunks[0].span, SourceSpan::Pages { first: 1, last: 1 });
    }

    #[test]
    fn test_splits_on_sentence_boundary() {
        let chunker = PdfChunker::new(40, 0);
        let chunks = chunker.chunk(&doc(vec![(
            1,
            "First sentence here. Second sentence goes on for a while longer.",
        )]));

        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].text, "First sentence here.");
        assert!(chunks[1].text.starts_with("Second sentence"));
    }

    #[test]
    fn test_hard_split_without_boundary() {
        let chunker = PdfChunker::new(10, 0);
        let chunks = chunker.chunk(&doc(vec![(1, "abcdefghijklmnopqrstuvwxyz")]));

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].text, "abcdefghij");
    }

    #[test]
    fn test_overlap_repeats_tail() {
        let chunker = PdfChunker::new(10, 4);
        let chunks = chunker.chunk(&doc(vec![(1, "abcdefghijklmnopqrst")]));

        assert_eq!(chunks[0].text, "abcdefghij");
        assert!(chunks[1].text.starts_with("ghij"));
    }

    #[test]
    fn test_empty_pages_skipped_and_ranges_tracked() {
        let chunker = PdfChunker::new(2000, 0);
        let chunks = chunker.chunk(&doc(vec![
            (1, "Page one text."),
            (2, "   "),
            (3, "Page three text."),
        ]));

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].span, SourceSpan::Pages { first: 1, last: 3 });
    }

    #[test]
    fn test_chunking_is_idempotent() {
        let chunker = PdfChunker::new(50, 10);
        let document = doc(vec![
            (1, "One sentence. Another sentence that is a bit longer than the first."),
            (2, "A third page with more text to split across chunks."),
        ]);

        let first = chunker.chunk(&document);
        let second = chunker.chunk(&document);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_all_empty_pages() {
        let chunker = PdfChunker::new(100, 10);
        assert!(chunker.chunk(&doc(vec![(1, ""), (2, "  ")])).is_empty());
    }
}
