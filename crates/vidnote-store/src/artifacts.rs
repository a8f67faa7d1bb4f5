//! Per-item cached artifacts on the local filesystem.
//!
//! Each media key owns three independently cacheable, independently
//! invalidatable files:
//!
//! - `{downloads}/{key}.mp3`: the audio blob
//! - `{downloads}/{key}_metadata.json`: fetch metadata sidecar
//! - `{transcriptions}/{key}_transcription.json`: transcription sidecar
//!
//! The corrupted-cache recovery path removes the first two and deliberately
//! leaves the transcription sidecar alone.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use vidnote_models::{FetchMetadata, Transcription};

use crate::error::{StoreError, StoreResult};

/// Filesystem layout for cached per-item artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    downloads_dir: PathBuf,
    transcriptions_dir: PathBuf,
}

impl ArtifactStore {
    /// Create the store rooted at `data_dir`, creating the subdirectories.
    pub fn new(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let data_dir = data_dir.as_ref();
        let downloads_dir = data_dir.join("downloads");
        let transcriptions_dir = data_dir.join("transcriptions");
        std::fs::create_dir_all(&downloads_dir)?;
        std::fs::create_dir_all(&transcriptions_dir)?;
        Ok(Self {
            downloads_dir,
            transcriptions_dir,
        })
    }

    /// Path of the audio blob for `key`.
    pub fn audio_path(&self, key: &str) -> PathBuf {
        self.downloads_dir.join(format!("{}.mp3", key))
    }

    /// Path of the fetch-metadata sidecar for `key`.
    pub fn metadata_path(&self, key: &str) -> PathBuf {
        self.downloads_dir.join(format!("{}_metadata.json", key))
    }

    /// Path of the transcription sidecar for `key`.
    pub fn transcription_path(&self, key: &str) -> PathBuf {
        self.transcriptions_dir
            .join(format!("{}_transcription.json", key))
    }

    /// Load the cached fetch metadata, if present and readable.
    pub async fn load_metadata(&self, key: &str) -> Option<FetchMetadata> {
        let bytes = tokio::fs::read(self.metadata_path(key)).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Load the cached transcription, if present and readable. A corrupt
    /// sidecar is a cache miss, not an error.
    pub async fn load_transcription(&self, key: &str) -> Option<Transcription> {
        let path = self.transcription_path(key);
        let bytes = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(transcription) => Some(transcription),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable transcription sidecar");
                None
            }
        }
    }

    /// Write the transcription sidecar for `key`.
    pub async fn save_transcription(
        &self,
        key: &str,
        transcription: &Transcription,
    ) -> StoreResult<()> {
        let bytes = serde_json::to_vec(transcription)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        tokio::fs::write(self.transcription_path(key), bytes).await?;
        Ok(())
    }

    /// Remove the audio blob. Missing file is not an error.
    pub async fn remove_audio(&self, key: &str) -> StoreResult<()> {
        remove_if_present(&self.audio_path(key)).await
    }

    /// Remove the fetch-metadata sidecar. Missing file is not an error.
    pub async fn remove_metadata(&self, key: &str) -> StoreResult<()> {
        remove_if_present(&self.metadata_path(key)).await
    }

    /// Remove the transcription sidecar. Missing file is not an error.
    pub async fn remove_transcription(&self, key: &str) -> StoreResult<()> {
        remove_if_present(&self.transcription_path(key)).await
    }

    /// Remove every artifact for `key`. Used by the item delete operation.
    pub async fn remove_all(&self, key: &str) -> StoreResult<()> {
        self.remove_audio(key).await?;
        self.remove_metadata(key).await?;
        self.remove_transcription(key).await?;
        Ok(())
    }
}

async fn remove_if_present(path: &Path) -> StoreResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "removed cached artifact");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
