//! Aggregate stats handler.

use axum::extract::State;
use axum::Json;

use vidnote_store::{RecordStore, StoreStats};

use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /api/stats`
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StoreStats>> {
    let stats = state.pipeline.store.stats().await?;
    Ok(Json(stats))
}
