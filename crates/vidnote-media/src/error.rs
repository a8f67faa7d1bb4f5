//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while fetching or probing media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    #[error("ffprobe not found in PATH")]
    FfprobeNotFound,

    #[error("ffmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("Invalid source URL: {0}")]
    InvalidUrl(String),

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("Metadata extraction failed: {message}")]
    MetadataFailed { message: String },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// Create a metadata extraction failure error.
    pub fn metadata_failed(message: impl Into<String>) -> Self {
        Self::MetadataFailed {
            message: message.into(),
        }
    }
}
