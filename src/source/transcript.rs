//! Video transcript reader.
//!
//! A transcript is an ordered stream of words with timestamps. Word order is
//! semantically meaningful, so ordering problems are surfaced to the caller
//! instead of being repaired here.

use crate::error::{KildeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single transcribed word with its timestamp in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoWord {
    /// Position of the word in the transcript stream.
    pub id: u32,
    /// Seconds from the start of the video.
    pub timestamp: f64,
    /// The word text.
    pub word: String,
}

/// A complete transcript file for one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptFile {
    /// Stable video source id.
    pub video_id: String,
    /// PDF source id this video discusses, when known.
    #[serde(default)]
    pub pdf_reference: Option<String>,
    /// Words in spoken order.
    pub words: Vec<VideoWord>,
}

/// Read a transcript word-stream file.
///
/// Parse failures and an empty video id are [`KildeError::MalformedSource`].
/// Timestamp monotonicity is checked later by the chunker, which owns that
/// invariant.
pub fn read_transcript(path: &Path) -> Result<TranscriptFile> {
    let source_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let content = std::fs::read_to_string(path)?;
    let transcript: TranscriptFile = serde_json::from_str(&content)
        .map_err(|e| KildeError::malformed(&source_id, format!("invalid transcript file: {}", e)))?;

    if transcript.video_id.trim().is_empty() {
        return Err(KildeError::malformed(&source_id, "empty video_id"));
    }

    Ok(transcript)
}
