//! Audio fetching via yt-dlp.
//!
//! The fetcher is idempotent per media key: when both the audio blob and the
//! metadata sidecar already exist on disk, the cached pair is returned
//! without touching the network. A corrupted sidecar is treated as a cache
//! miss and the fetch runs again.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use vidnote_models::FetchMetadata;

use crate::error::{MediaError, MediaResult};

/// Resolves a source URL into a local audio file plus descriptive metadata.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download audio for `url` to `audio_path`, writing the metadata
    /// sidecar to `metadata_path`. Returns the metadata.
    async fn fetch(
        &self,
        url: &str,
        audio_path: &Path,
        metadata_path: &Path,
    ) -> MediaResult<FetchMetadata>;
}

/// yt-dlp backed fetcher.
#[derive(Debug, Clone, Default)]
pub struct YtDlpFetcher;

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self
    }

    /// Query video metadata without downloading (`yt-dlp -J`).
    async fn probe_metadata(&self, url: &str) -> MediaResult<FetchMetadata> {
        let output = Command::new("yt-dlp")
            .args(["-J", "--no-playlist", "--no-warnings"])
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp -J stderr: {}", stderr);
            return Err(MediaError::metadata_failed(
                stderr.lines().last().unwrap_or("Unknown error").to_string(),
            ));
        }

        parse_info_json(&output.stdout)
    }

    /// Download the best audio track as mp3 (`yt-dlp -x`).
    async fn download_audio(&self, url: &str, audio_path: &Path) -> MediaResult<()> {
        if let Some(parent) = audio_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // yt-dlp picks the container before extraction, so the output
        // template uses %(ext)s and the mp3 postprocessor lands on the
        // final path.
        let template = audio_path.with_extension("%(ext)s");
        let template_str = template.to_string_lossy();

        let output = Command::new("yt-dlp")
            .args([
                "-f",
                "bestaudio/best",
                "-x",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "192K",
                "--no-playlist",
                "-o",
            ])
            .arg(template_str.as_ref())
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);
            return Err(MediaError::download_failed(format!(
                "yt-dlp failed: {}",
                stderr.lines().last().unwrap_or("Unknown error")
            )));
        }

        if !audio_path.exists() {
            return Err(MediaError::download_failed("Output file not created"));
        }

        Ok(())
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(
        &self,
        url: &str,
        audio_path: &Path,
        metadata_path: &Path,
    ) -> MediaResult<FetchMetadata> {
        // Cache hit: both artifacts already on disk.
        if audio_path.exists() && metadata_path.exists() {
            match read_metadata_sidecar(metadata_path).await {
                Some(metadata) => {
                    info!(audio = %audio_path.display(), "using cached audio and metadata");
                    return Ok(metadata);
                }
                None => {
                    warn!(
                        sidecar = %metadata_path.display(),
                        "metadata sidecar unreadable, refetching"
                    );
                }
            }
        }

        which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

        info!(url = %url, "fetching audio with yt-dlp");

        let metadata = self.probe_metadata(url).await?;
        write_metadata_sidecar(metadata_path, &metadata).await?;

        self.download_audio(url, audio_path).await?;

        let size = audio_path.metadata()?.len();
        info!(
            audio = %audio_path.display(),
            size_kb = size / 1024,
            title = %metadata.title,
            "audio fetch complete"
        );

        Ok(metadata)
    }
}

/// Parse the fields we keep from a yt-dlp info JSON dump.
fn parse_info_json(stdout: &[u8]) -> MediaResult<FetchMetadata> {
    #[derive(serde::Deserialize)]
    struct InfoJson {
        title: Option<String>,
        thumbnail: Option<String>,
        duration: Option<f64>,
        description: Option<String>,
    }

    let info: InfoJson = serde_json::from_slice(stdout)?;
    Ok(FetchMetadata {
        title: info.title.unwrap_or_else(|| "Untitled".to_string()),
        thumbnail: info.thumbnail.unwrap_or_default(),
        duration: info.duration.unwrap_or(0.0),
        description: info.description.unwrap_or_default(),
    })
}

/// Read a metadata sidecar, treating any failure as a cache miss.
pub async fn read_metadata_sidecar(path: &Path) -> Option<FetchMetadata> {
    let bytes = tokio::fs::read(path).await.ok()?;
    serde_json::from_slice(&bytes).ok()
}

async fn write_metadata_sidecar(path: &Path, metadata: &FetchMetadata) -> MediaResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec(metadata)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}
