//! Item handlers: submission, listing, deletion.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use vidnote_models::{CategoryId, ItemId, ItemRecord};
use vidnote_pipeline::{submit, Submission};
use vidnote_store::RecordStore;

use crate::error::{ApiError, ApiResult};
use crate::handlers::categories::{category_view, CategoryView};
use crate::state::AppState;

/// Item response shape, with the resolved category embedded.
#[derive(Debug, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub record: ItemRecord,
    pub category: Option<CategoryView>,
}

async fn item_view(state: &AppState, record: ItemRecord) -> ApiResult<ItemView> {
    let category = match &record.category_id {
        Some(id) => match state.pipeline.store.get_category(id).await? {
            Some(category) => Some(category_view(state, category).await?),
            None => None,
        },
        None => None,
    };
    Ok(ItemView { record, category })
}

#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    #[serde(default)]
    pub category_id: Option<String>,
}

/// `GET /api/items`
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ListItemsQuery>,
) -> ApiResult<Json<Vec<ItemView>>> {
    let category_id = query.category_id.map(CategoryId::from);
    let records = state
        .pipeline
        .store
        .list_items(category_id.as_ref())
        .await?;

    let mut views = Vec::with_capacity(records.len());
    for record in records {
        views.push(item_view(&state, record).await?);
    }
    Ok(Json(views))
}

/// `GET /api/items/:item_id`
pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> ApiResult<Json<ItemView>> {
    let id = ItemId::from(item_id);
    let record = state
        .pipeline
        .store
        .get_item(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("item {}", id)))?;
    Ok(Json(item_view(&state, record).await?))
}

#[derive(Debug, Deserialize)]
pub struct SubmitItemsRequest {
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitItemsResponse {
    pub items: Vec<ItemView>,
}

/// `POST /api/items`
///
/// Accepts a list of source URLs. Known URLs return their existing record;
/// new URLs get a queued record and a pipeline run spawned for them. The
/// response never waits on any pipeline stage.
pub async fn submit_items(
    State(state): State<AppState>,
    Json(request): Json<SubmitItemsRequest>,
) -> ApiResult<(StatusCode, Json<SubmitItemsResponse>)> {
    if request.urls.is_empty() {
        return Err(ApiError::bad_request("No URLs provided"));
    }

    let mut items = Vec::new();
    for url in &request.urls {
        match submit(&state.pipeline, url).await? {
            Some(Submission::Existing(record)) | Some(Submission::Started(record)) => {
                items.push(item_view(&state, record).await?);
            }
            None => {}
        }
    }

    Ok((StatusCode::CREATED, Json(SubmitItemsResponse { items })))
}

/// `DELETE /api/items/:item_id`
///
/// Removes the durable record and every cached stage artifact for the item.
pub async fn delete_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = ItemId::from(item_id);
    let record = state
        .pipeline
        .store
        .get_item(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("item {}", id)))?;

    state.pipeline.store.delete_item(&id).await?;

    if let Err(e) = state.pipeline.artifacts.remove_all(&record.media_key).await {
        warn!(
            item_id = %id,
            media_key = %record.media_key,
            error = %e,
            "failed to remove cached artifacts for deleted item"
        );
    }

    Ok(Json(json!({ "message": "Item deleted successfully" })))
}
