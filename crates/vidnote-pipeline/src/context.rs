//! Shared pipeline dependencies.
//!
//! Every collaborator is an explicitly constructed, injected dependency
//! owned by the process and passed to runs through this context; nothing in
//! the pipeline reaches for ambient global state.

use std::sync::Arc;

use vidnote_engines::{SpeechEngine, TextGenerator};
use vidnote_media::{AudioValidator, MediaFetcher};
use vidnote_store::{ArtifactStore, RecordStore};

use crate::config::PipelineConfig;
use crate::progress::TaskRegistry;
use crate::transcribe::Transcriber;

/// Dependencies shared by all pipeline runs.
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub store: Arc<dyn RecordStore>,
    pub artifacts: ArtifactStore,
    pub registry: Arc<TaskRegistry>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub validator: Arc<dyn AudioValidator>,
    pub speech: Arc<dyn SpeechEngine>,
    pub generator: Arc<dyn TextGenerator>,
}

impl PipelineContext {
    /// Build the transcription stage for this context.
    pub fn transcriber(&self) -> Transcriber {
        Transcriber::new(
            Arc::clone(&self.speech),
            Arc::clone(&self.validator),
            self.artifacts.clone(),
            self.config.transcribe_attempts,
        )
    }
}
