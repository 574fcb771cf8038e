//! PDF extraction file reader.
//!
//! A PDF enters the pipeline as a page-indexed text extraction produced by an
//! external extractor tool.

use crate::error::{KildeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Text content of a single PDF page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfPage {
    /// 1-based page number.
    pub number: u32,
    /// Extracted text for the page. May be empty for figure-only pages.
    pub text: String,
}

/// A full PDF extraction: the source id plus its pages in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfDocument {
    /// Stable source id, e.g. the original filename without extension.
    pub pdf_id: String,
    /// Human-readable title, when the extractor provides one.
    #[serde(default)]
    pub title: Option<String>,
    /// Pages in document order.
    pub pages: Vec<PdfPage>,
}

/// Read a page-indexed extraction file.
///
/// Fails with [`KildeError::MalformedSource`] when the file is not valid JSON
/// for this shape, when the id is empty, or when page numbers are not strictly
/// increasing.
pub fn read_pdf_pages(path: &Path) -> Result<PdfDocument> {
    let source_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let content = std::fs::read_to_string(path)?;
    let doc: PdfDocument = serde_json::from_str(&content)
        .map_err(|e| KildeError::malformed(&source_id, format!("invalid extraction file: {}", e)))?;

    if doc.pdf_id.trim().is_empty() {
        return Err(KildeError::malformed(&source_id, "empty pdf_id"));
    }

    let mut prev = 0u32;
    for page in &doc.pages {
        if page.number <= prev {
            return Err(KildeError::malformed(
                &doc.pdf_id,
                format!("page numbers not strictly increasing at page {}", page.number),
            ));
        }
        prev = page.number;
    }

    Ok(doc)
}
