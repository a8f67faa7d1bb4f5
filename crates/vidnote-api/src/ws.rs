//! WebSocket progress feeds.
//!
//! Two subscription topics over one broadcast stream: `/ws/updates` carries
//! every item's transitions, `/ws/items/:item_id` carries one item's. Both
//! are fed by the task registry; this module only fans out.

use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, warn};

use vidnote_models::{ItemId, ProgressSnapshot, WsMessage};
use vidnote_pipeline::ProgressEvent;
use vidnote_store::RecordStore;

use crate::metrics;
use crate::state::AppState;

/// Global counter for open WebSocket connections.
static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

/// Bounded send buffer per connection; a slow client gets backpressure, not
/// unbounded memory.
const WS_SEND_BUFFER_SIZE: usize = 32;

const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// `GET /ws/updates`: all-items feed.
pub async fn ws_all_updates(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| track_connection(handle_feed(socket, state, None)))
}

/// `GET /ws/items/:item_id`: per-item feed. Replays the current snapshot on
/// connect so late subscribers are not blind until the next transition.
pub async fn ws_item_progress(
    ws: WebSocketUpgrade,
    Path(item_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let item_id = ItemId::from(item_id);
    ws.on_upgrade(move |socket| track_connection(handle_feed(socket, state, Some(item_id))))
}

async fn track_connection<F: Future<Output = ()>>(feed: F) {
    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);

    feed.await;

    let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
    metrics::set_ws_active_connections(count);
}

/// Serve one connection, forwarding registry events (optionally filtered to
/// one item) until the client goes away.
async fn handle_feed(socket: WebSocket, state: AppState, filter: Option<ItemId>) {
    let (ws_sender, mut receiver) = socket.split();

    // Bounded channel plus a dedicated send task gives us backpressure.
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);
    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Subscribe before replaying the snapshot so no transition can fall in
    // the gap.
    let mut events = state.pipeline.registry.subscribe();

    if let Some(item_id) = &filter {
        if let Some(snapshot) = current_snapshot(&state, item_id).await {
            let msg = WsMessage::item_progress(item_id.clone(), &snapshot);
            if !send_json(&tx, &msg).await {
                drop(tx);
                let _ = send_task.await;
                return;
            }
        }
    }

    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // first tick completes immediately

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(msg) = feed_message(&event, filter.as_ref()) {
                        if !send_json(&tx, &msg).await {
                            break;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "WebSocket subscriber lagged behind progress feed");
                }
                Err(RecvError::Closed) => break,
            },

            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {} // pings/pongs/client chatter
            },

            _ = heartbeat.tick() => {
                if tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    drop(tx);
    let _ = send_task.await;
    debug!("WebSocket feed closed");
}

/// Build the outbound message for an event, honoring the per-item filter.
fn feed_message(event: &ProgressEvent, filter: Option<&ItemId>) -> Option<WsMessage> {
    match filter {
        None => Some(WsMessage::all_updates(event.item_id.clone(), &event.snapshot)),
        Some(id) if *id == event.item_id => {
            Some(WsMessage::item_progress(event.item_id.clone(), &event.snapshot))
        }
        Some(_) => None,
    }
}

/// Current snapshot for an item: the live registry entry when a run is
/// active, otherwise the durable record's state.
async fn current_snapshot(state: &AppState, item_id: &ItemId) -> Option<ProgressSnapshot> {
    if let Some(snapshot) = state.pipeline.registry.snapshot(item_id).await {
        return Some(snapshot);
    }
    state
        .pipeline
        .store
        .get_item(item_id)
        .await
        .ok()
        .flatten()
        .map(|record| ProgressSnapshot::new(record.status, record.current_step, record.progress))
}

/// Send a message, applying backpressure when the buffer is full. Returns
/// `false` once the connection is gone.
async fn send_json(tx: &mpsc::Sender<Message>, msg: &WsMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(_) => return false,
    };
    match tx.try_send(Message::Text(json.clone())) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            debug!("WebSocket send buffer full, applying backpressure");
            tx.send(Message::Text(json)).await.is_ok()
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidnote_models::{step, ItemStatus};

    fn event(id: &str) -> ProgressEvent {
        ProgressEvent {
            item_id: ItemId::from(id),
            snapshot: ProgressSnapshot::new(ItemStatus::Processing, step::DOWNLOADING, 5),
        }
    }

    #[test]
    fn test_all_feed_passes_everything() {
        assert!(feed_message(&event("a"), None).is_some());
        assert!(feed_message(&event("b"), None).is_some());
    }

    #[test]
    fn test_item_feed_filters() {
        let id = ItemId::from("a");
        assert!(feed_message(&event("a"), Some(&id)).is_some());
        assert!(feed_message(&event("b"), Some(&id)).is_none());
    }
}
