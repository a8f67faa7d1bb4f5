//! Task registry and progress broadcast.
//!
//! In-memory map of currently-running items to their latest progress
//! snapshot, plus a broadcast channel every subscriber taps. An entry exists
//! only while a run is active; absence means "no active run" and says
//! nothing about history, which only the durable record holds.

use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use vidnote_models::{step, ItemId, ItemStatus, ProgressSnapshot};

/// One progress update, delivered to every subscriber.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub item_id: ItemId,
    pub snapshot: ProgressSnapshot,
}

/// Registry of active runs with progress broadcasting.
pub struct TaskRegistry {
    runs: RwLock<HashMap<ItemId, ProgressSnapshot>>,
    events: broadcast::Sender<ProgressEvent>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            runs: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Register an item at submission time, before its run task is spawned,
    /// so no progress event can be lost to a subscriber racing the start.
    pub async fn register(&self, item_id: &ItemId) {
        let mut runs = self.runs.write().await;
        runs.entry(item_id.clone())
            .or_insert_with(|| ProgressSnapshot::new(ItemStatus::Queued, step::QUEUED, 0));
    }

    /// Update an item's snapshot and broadcast it. `status` is always
    /// applied; omitted `step`/`progress` leave the previous values.
    pub async fn set_status(
        &self,
        item_id: &ItemId,
        status: ItemStatus,
        step: Option<&str>,
        progress: Option<u8>,
    ) {
        let snapshot = {
            let mut runs = self.runs.write().await;
            let entry = runs
                .entry(item_id.clone())
                .or_insert_with(|| ProgressSnapshot::new(status, step::QUEUED, 0));
            entry.status = status;
            if let Some(step) = step {
                entry.current_step = step.to_string();
            }
            if let Some(progress) = progress {
                entry.progress = progress.min(100);
            }
            entry.clone()
        };

        debug!(
            item_id = %item_id,
            status = %snapshot.status,
            progress = snapshot.progress,
            "progress update"
        );

        // No subscribers is fine.
        let _ = self.events.send(ProgressEvent {
            item_id: item_id.clone(),
            snapshot,
        });
    }

    /// Remove an item's run handle. Called exactly once per run, at
    /// terminal state.
    pub async fn remove(&self, item_id: &ItemId) {
        self.runs.write().await.remove(item_id);
    }

    /// Latest snapshot for an active run.
    pub async fn snapshot(&self, item_id: &ItemId) -> Option<ProgressSnapshot> {
        self.runs.read().await.get(item_id).cloned()
    }

    /// Whether a run is currently active for this item.
    pub async fn is_active(&self, item_id: &ItemId) -> bool {
        self.runs.read().await.contains_key(item_id)
    }

    /// Number of active runs.
    pub async fn active_count(&self) -> usize {
        self.runs.read().await.len()
    }

    /// Subscribe to all progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_remove() {
        let registry = TaskRegistry::new();
        let id = ItemId::from("a");

        registry.register(&id).await;
        assert!(registry.is_active(&id).await);
        assert_eq!(registry.active_count().await, 1);

        let snap = registry.snapshot(&id).await.unwrap();
        assert_eq!(snap.status, ItemStatus::Queued);
        assert_eq!(snap.progress, 0);

        registry.remove(&id).await;
        assert!(!registry.is_active(&id).await);
    }

    #[tokio::test]
    async fn test_omitted_fields_keep_previous_values() {
        let registry = TaskRegistry::new();
        let id = ItemId::from("a");
        registry.register(&id).await;

        registry
            .set_status(&id, ItemStatus::Processing, Some(step::DOWNLOADING), Some(5))
            .await;
        registry
            .set_status(&id, ItemStatus::Processing, None, None)
            .await;

        let snap = registry.snapshot(&id).await.unwrap();
        assert_eq!(snap.current_step, step::DOWNLOADING);
        assert_eq!(snap.progress, 5);
    }

    #[tokio::test]
    async fn test_subscribers_receive_updates() {
        let registry = TaskRegistry::new();
        let id = ItemId::from("a");
        registry.register(&id).await;

        let mut rx = registry.subscribe();
        registry
            .set_status(&id, ItemStatus::Processing, Some(step::TRANSCRIBING), Some(35))
            .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.item_id, id);
        assert_eq!(event.snapshot.progress, 35);
        assert_eq!(event.snapshot.current_step, step::TRANSCRIBING);
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let registry = std::sync::Arc::new(TaskRegistry::new());
        let mut rx = registry.subscribe();

        let mut handles = Vec::new();
        for i in 0..8 {
            let registry = std::sync::Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let id = ItemId::from(format!("item-{}", i));
                registry.register(&id).await;
                registry
                    .set_status(&id, ItemStatus::Processing, Some(step::DOWNLOADING), Some(5))
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for _ in 0..8 {
            rx.recv().await.unwrap();
        }
        assert_eq!(registry.active_count().await, 8);
    }
}
