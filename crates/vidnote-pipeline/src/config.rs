//! Pipeline configuration.

use std::path::PathBuf;

/// Configuration for pipeline runs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory for cached artifacts (`downloads/`, `transcriptions/`)
    pub data_dir: PathBuf,
    /// Attempt budget for the transcription stage
    pub transcribe_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            transcribe_attempts: 3,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            transcribe_attempts: std::env::var("TRANSCRIBE_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n >= 1)
                .unwrap_or(3),
        }
    }
}
