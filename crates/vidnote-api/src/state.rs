//! Application state.

use std::sync::Arc;

use vidnote_engines::{HttpSpeechEngine, OllamaGenerator};
use vidnote_media::{FfprobeValidator, YtDlpFetcher};
use vidnote_pipeline::{PipelineConfig, PipelineContext, TaskRegistry};
use vidnote_store::{ArtifactStore, MemoryStore};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<PipelineContext>,
}

impl AppState {
    /// Create new application state, wiring every pipeline collaborator.
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let pipeline_config = PipelineConfig::from_env();
        let artifacts = ArtifactStore::new(&pipeline_config.data_dir)?;

        let pipeline = Arc::new(PipelineContext {
            config: pipeline_config,
            store: Arc::new(MemoryStore::new()),
            artifacts,
            registry: Arc::new(TaskRegistry::new()),
            fetcher: Arc::new(YtDlpFetcher::new()),
            validator: Arc::new(FfprobeValidator::new()),
            speech: Arc::new(HttpSpeechEngine::from_env()?),
            generator: Arc::new(OllamaGenerator::from_env()?),
        });

        Ok(Self { config, pipeline })
    }
}
