//! Source material readers for PDF documents and video transcripts.
//!
//! PDF text extraction itself happens outside this crate; Kilde consumes
//! page-indexed extraction files. Transcripts arrive as ordered word streams
//! with per-word timestamps.

mod pdf;
mod transcript;

pub use pdf::{read_pdf_pages, PdfDocument, PdfPage};
pub use transcript::{read_transcript, TranscriptFile, VideoWord};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which corpus a source (and its chunks) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Video,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Pdf => write!(f, "pdf"),
            SourceKind::Video => write!(f, "video"),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(SourceKind::Pdf),
            "video" => Ok(SourceKind::Video),
            _ => Err(format!("Unknown source kind: {}", s)),
        }
    }
}

/// Source files discovered in a corpus directory.
#[derive(Debug, Default)]
pub struct CorpusManifest {
    /// Page-text extraction files, one per PDF.
    pub pdfs: Vec<PathBuf>,
    /// Transcript word-stream files, one per video.
    pub transcripts: Vec<PathBuf>,
}

impl CorpusManifest {
    pub fn is_empty(&self) -> bool {
        self.pdfs.is_empty() && self.transcripts.is_empty()
    }
}

/// List the `.json` source files under the configured PDF and transcript
/// directories. Missing directories yield an empty list for that side, not an
/// error, so a PDF-only or video-only corpus works.
pub fn discover(pdf_dir: &Path, transcript_dir: &Path) -> Result<CorpusManifest> {
    Ok(CorpusManifest {
        pdfs: list_json_files(pdf_dir)?,
        transcripts: list_json_files(transcript_dir)?,
    })
}

fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();

    // Deterministic build order regardless of directory iteration order.
    files.sort();
    Ok(files)
}
