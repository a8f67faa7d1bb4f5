//! Pipeline error types.
//!
//! `TranscribeError` is the typed rendition of the transcription stage's
//! failure modes; the orchestrator keys the corrupted-cache cleanup off
//! `triggers_cache_cleanup`, not message text.

use thiserror::Error;

use vidnote_engines::EngineError;
use vidnote_models::ItemId;
use vidnote_store::StoreError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Failure modes of the transcription stage.
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// Structural audio check failed; not transient, never retried.
    #[error("Audio validation failed: {0}")]
    Validation(String),

    /// Engine succeeded but produced no text. A content property of the
    /// audio, not a fault; retrying cannot help.
    #[error(
        "Transcription returned empty text - the audio contains no speech content. \
         This often happens with music videos, silent videos, sound-effects-only \
         audio, or very short clips. Try a video with spoken narration."
    )]
    EmptyContent,

    /// Mono repair failed after a malformed-audio fault.
    #[error(
        "Audio cannot be transcribed: the file appears corrupted or empty \
         (size: {file_size} bytes). Common causes: silent videos, very short \
         videos, or an audio track with no narration."
    )]
    Corrupted { file_size: u64 },

    /// Mono repair succeeded but the re-encoded file failed validation.
    #[error("Re-encoded audio still invalid: {0}")]
    RepairRejected(String),

    /// Malformed-audio fault on the final attempt.
    #[error(
        "No detectable speech content (file size: {file_size} bytes). This happens \
         with silent videos, music videos, very short videos, or videos with no \
         audio track."
    )]
    NoSpeech { file_size: u64 },

    /// Attempt budget exhausted on transient faults.
    #[error("Transcription failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: EngineError,
    },

    /// Transcription sidecar could not be written.
    #[error("Failed to cache transcription: {0}")]
    Cache(#[from] StoreError),
}

impl TranscribeError {
    /// Whether this failure indicates a corrupted/invalid cached audio file
    /// that must be deleted so the next attempt re-downloads cleanly.
    pub fn triggers_cache_cleanup(&self) -> bool {
        matches!(
            self,
            TranscribeError::Validation(_)
                | TranscribeError::Corrupted { .. }
                | TranscribeError::RepairRejected(_)
        )
    }
}

/// Terminal pipeline failure, recorded on the item record.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Download failed: {0}")]
    Download(String),

    #[error("Transcription failed: {0}")]
    Transcribe(#[from] TranscribeError),

    #[error("Summary generation failed: {0}")]
    Summary(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Item not found: {0}")]
    MissingItem(ItemId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_classification() {
        assert!(TranscribeError::Validation("too small".into()).triggers_cache_cleanup());
        assert!(TranscribeError::Corrupted { file_size: 12 }.triggers_cache_cleanup());
        assert!(TranscribeError::RepairRejected("still bad".into()).triggers_cache_cleanup());

        assert!(!TranscribeError::EmptyContent.triggers_cache_cleanup());
        assert!(!TranscribeError::NoSpeech { file_size: 12 }.triggers_cache_cleanup());
        assert!(!TranscribeError::Exhausted {
            attempts: 3,
            source: EngineError::Timeout(60),
        }
        .triggers_cache_cleanup());
    }

    #[test]
    fn test_wrapped_messages() {
        let err = PipelineError::Download("yt-dlp failed: 403".into());
        assert_eq!(err.to_string(), "Download failed: yt-dlp failed: 403");

        let err = PipelineError::Transcribe(TranscribeError::Validation(
            "Audio file too small (500 bytes)".into(),
        ));
        assert!(err
            .to_string()
            .starts_with("Transcription failed: Audio validation failed:"));
    }
}
