//! Progress broadcast message types.
//!
//! Two feeds carry these messages: an all-items feed and a per-item feed.
//! Both are emitted on every stage transition of a pipeline run.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::item::{ItemId, ItemStatus};

/// Latest known progress of one active run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressSnapshot {
    /// Item status
    pub status: ItemStatus,
    /// Human-readable step label
    pub current_step: String,
    /// Overall progress, 0-100
    pub progress: u8,
}

impl ProgressSnapshot {
    pub fn new(status: ItemStatus, current_step: impl Into<String>, progress: u8) -> Self {
        Self {
            status,
            current_step: current_step.into(),
            progress: progress.min(100),
        }
    }
}

/// A snapshot paired with the item it belongs to; the flat payload of the
/// per-item feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ItemProgress {
    /// Item ID
    pub item_id: ItemId,
    /// Item status
    pub status: ItemStatus,
    /// Human-readable step label
    pub current_step: String,
    /// Overall progress, 0-100
    pub progress: u8,
}

impl ItemProgress {
    pub fn new(item_id: ItemId, snapshot: &ProgressSnapshot) -> Self {
        Self {
            item_id,
            status: snapshot.status,
            current_step: snapshot.current_step.clone(),
            progress: snapshot.progress,
        }
    }
}

/// WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// All-items feed: item id plus the full snapshot as a nested payload
    AllUpdates { item_id: ItemId, data: ItemProgress },

    /// Per-item feed: the flat snapshot
    ItemProgress {
        item_id: ItemId,
        status: ItemStatus,
        current_step: String,
        progress: u8,
    },
}

impl WsMessage {
    /// Build an all-items feed message.
    pub fn all_updates(item_id: ItemId, snapshot: &ProgressSnapshot) -> Self {
        WsMessage::AllUpdates {
            item_id: item_id.clone(),
            data: ItemProgress::new(item_id, snapshot),
        }
    }

    /// Build a per-item feed message.
    pub fn item_progress(item_id: ItemId, snapshot: &ProgressSnapshot) -> Self {
        WsMessage::ItemProgress {
            item_id,
            status: snapshot.status,
            current_step: snapshot.current_step.clone(),
            progress: snapshot.progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::step;

    fn snapshot() -> ProgressSnapshot {
        ProgressSnapshot::new(ItemStatus::Processing, step::TRANSCRIBING, 35)
    }

    #[test]
    fn test_all_updates_serialization() {
        let msg = WsMessage::all_updates(ItemId::from("abc"), &snapshot());
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"all_updates\""));
        assert!(json.contains("\"item_id\":\"abc\""));
        assert!(json.contains("\"data\":{"));
        assert!(json.contains("\"progress\":35"));
    }

    #[test]
    fn test_item_progress_serialization() {
        let msg = WsMessage::item_progress(ItemId::from("abc"), &snapshot());
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"item_progress\""));
        assert!(json.contains("\"status\":\"processing\""));
        assert!(json.contains("\"current_step\":\"Transcribing audio...\""));
    }

    #[test]
    fn test_snapshot_clamps_progress() {
        let snap = ProgressSnapshot::new(ItemStatus::Completed, step::COMPLETE, 150);
        assert_eq!(snap.progress, 100);
    }
}
