//! Item records: one submitted video URL and its processing state.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::category::CategoryId;

/// Step labels shown to clients. These strings are part of the wire
/// contract; the frontend renders them verbatim.
pub mod step {
    pub const QUEUED: &str = "Waiting to start...";
    pub const DOWNLOADING: &str = "Downloading audio...";
    pub const TRANSCRIBING: &str = "Transcribing audio...";
    pub const SUMMARIZING: &str = "Generating summary...";
    pub const CATEGORIZING: &str = "Categorizing video...";
    pub const COMPLETE: &str = "Complete";
    pub const ERROR: &str = "Error";
}

/// Unique identifier for an item record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Generate a new random item ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Item processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Submitted, run not yet started
    #[default]
    Queued,
    /// Pipeline run in progress
    Processing,
    /// Run finished successfully
    Completed,
    /// Run failed
    Error,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Queued => "queued",
            ItemStatus::Processing => "processing",
            ItemStatus::Completed => "completed",
            ItemStatus::Error => "error",
        }
    }

    /// Whether the status is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Error)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Durable record for one submitted item.
///
/// Mutated exclusively by the pipeline run that owns the item while that run
/// is active; read-only to every other actor until the run reaches a
/// terminal state.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ItemRecord {
    /// Unique item ID
    pub id: ItemId,

    /// Original source URL (unique across all records)
    pub source_url: String,

    /// Normalized media identifier derived from the URL; keys all cached
    /// artifacts (audio blob, metadata sidecar, transcription sidecar)
    pub media_key: String,

    /// Video title (placeholder until the fetch stage resolves it)
    pub title: String,

    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail_url: String,

    /// Path of the cached transcription sidecar, once transcribed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_path: Option<String>,

    /// Generated summary text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Processing status
    #[serde(default)]
    pub status: ItemStatus,

    /// Human-readable current step label
    pub current_step: String,

    /// Overall progress, 0-100
    pub progress: u8,

    /// Error message (set whenever status is `error`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Assigned category, if categorization succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ItemRecord {
    /// Create a new queued record for a freshly submitted URL.
    pub fn new(
        source_url: impl Into<String>,
        media_key: impl Into<String>,
        title: impl Into<String>,
        thumbnail_url: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ItemId::new(),
            source_url: source_url.into(),
            media_key: media_key.into(),
            title: title.into(),
            thumbnail_url: thumbnail_url.into(),
            transcript_path: None,
            summary: None,
            status: ItemStatus::Queued,
            current_step: step::QUEUED.to_string(),
            progress: 0,
            error_message: None,
            category_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a stage transition to the record.
    pub fn set_progress(&mut self, status: ItemStatus, current_step: &str, progress: u8) {
        self.status = status;
        self.current_step = current_step.to_string();
        self.progress = progress.min(100);
        self.updated_at = Utc::now();
    }

    /// Mark the record completed.
    pub fn complete(&mut self) {
        self.set_progress(ItemStatus::Completed, step::COMPLETE, 100);
    }

    /// Mark the record failed with a terminal error message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.set_progress(ItemStatus::Error, step::ERROR, 0);
        self.error_message = Some(message.into());
    }
}
