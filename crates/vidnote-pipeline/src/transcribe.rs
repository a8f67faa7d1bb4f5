//! Transcription stage: validation, bounded retries, mono repair, caching.

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use vidnote_engines::{EngineError, SpeechEngine};
use vidnote_media::AudioValidator;
use vidnote_models::Transcription;
use vidnote_store::ArtifactStore;

use crate::error::TranscribeError;

/// Runs the speech engine against validated audio, with the recovery policy
/// for malformed media.
pub struct Transcriber {
    speech: Arc<dyn SpeechEngine>,
    validator: Arc<dyn AudioValidator>,
    artifacts: ArtifactStore,
    attempts: u32,
}

impl Transcriber {
    pub fn new(
        speech: Arc<dyn SpeechEngine>,
        validator: Arc<dyn AudioValidator>,
        artifacts: ArtifactStore,
        attempts: u32,
    ) -> Self {
        Self {
            speech,
            validator,
            artifacts,
            attempts: attempts.max(1),
        }
    }

    /// Transcribe the audio for `media_key`, consulting and populating the
    /// per-item transcription cache.
    ///
    /// Retry policy, per attempt:
    /// - validation failure: immediate abort, not transient
    /// - malformed-audio fault: one mono repair, then re-validate and retry;
    ///   a failed repair aborts immediately
    /// - empty transcript: terminal, a content property of the audio
    /// - anything else: retry until the attempt budget runs out
    pub async fn transcribe(
        &self,
        media_key: &str,
        audio_path: &Path,
    ) -> Result<Transcription, TranscribeError> {
        // Cached transcript short-circuits the engine entirely, unless the
        // cached payload is empty, in which case we re-run.
        if let Some(cached) = self.artifacts.load_transcription(media_key).await {
            if !cached.text.trim().is_empty() {
                info!(media_key = %media_key, "transcription cache hit");
                metrics::counter!("vidnote_transcription_cache_hits_total").increment(1);
                return Ok(cached);
            }
            warn!(media_key = %media_key, "cached transcription is empty, re-running");
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let verdict = self.validator.validate(audio_path).await;
            if !verdict.ok {
                return Err(TranscribeError::Validation(verdict.reason));
            }

            info!(
                media_key = %media_key,
                attempt,
                attempts = self.attempts,
                "transcribing audio"
            );

            match self.speech.transcribe(audio_path).await {
                Ok(transcription) => {
                    if transcription.text.trim().is_empty() {
                        return Err(TranscribeError::EmptyContent);
                    }

                    self.artifacts
                        .save_transcription(media_key, &transcription)
                        .await?;

                    info!(
                        media_key = %media_key,
                        chars = transcription.text.len(),
                        language = %transcription.language,
                        "transcription complete"
                    );
                    return Ok(transcription);
                }

                Err(EngineError::MalformedAudio(detail)) if attempt < self.attempts => {
                    warn!(
                        media_key = %media_key,
                        attempt,
                        detail = %detail,
                        "malformed audio reported, attempting mono repair"
                    );

                    if !self.validator.repair_mono(audio_path).await {
                        return Err(TranscribeError::Corrupted {
                            file_size: file_size(audio_path).await,
                        });
                    }

                    let verdict = self.validator.validate(audio_path).await;
                    if !verdict.ok {
                        return Err(TranscribeError::RepairRejected(verdict.reason));
                    }
                    // Repaired and re-validated; the retry consumes this
                    // attempt.
                }

                Err(EngineError::MalformedAudio(_)) => {
                    return Err(TranscribeError::NoSpeech {
                        file_size: file_size(audio_path).await,
                    });
                }

                Err(e) if attempt < self.attempts => {
                    warn!(
                        media_key = %media_key,
                        attempt,
                        error = %e,
                        "transcription attempt failed, retrying"
                    );
                }

                Err(e) => {
                    return Err(TranscribeError::Exhausted {
                        attempts: self.attempts,
                        source: e,
                    });
                }
            }
        }
    }
}

async fn file_size(path: &Path) -> u64 {
    tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
}
