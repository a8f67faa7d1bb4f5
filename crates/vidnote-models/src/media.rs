//! Media artifact payloads: fetch metadata and transcription sidecars.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Descriptive metadata returned by the media fetcher and cached as the
/// per-item metadata sidecar.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FetchMetadata {
    /// Video title
    #[serde(default)]
    pub title: String,

    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail: String,

    /// Duration in seconds, when the extractor reports one
    #[serde(default)]
    pub duration: f64,

    /// Video description
    #[serde(default)]
    pub description: String,
}

/// One timed segment of a transcription.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptSegment {
    /// Segment start in seconds
    pub start: f64,
    /// Segment end in seconds
    pub end: f64,
    /// Segment text
    pub text: String,
}

/// Transcription result, cached as the per-item transcription sidecar.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Transcription {
    /// Full transcript text
    pub text: String,

    /// Timed segments
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,

    /// Detected language tag
    #[serde(default = "unknown_language")]
    pub language: String,
}

fn unknown_language() -> String {
    "unknown".to_string()
}

impl Transcription {
    /// Build a plain-text transcription with no segment timing.
    pub fn from_text(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            segments: Vec::new(),
            language: language.into(),
        }
    }
}
