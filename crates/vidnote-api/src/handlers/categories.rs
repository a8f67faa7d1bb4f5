//! Category handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vidnote_models::CategoryRecord;
use vidnote_store::RecordStore;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Default color for manually created categories.
const DEFAULT_COLOR: &str = "#3B82F6";

/// Category response shape, with the number of items it holds.
#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub item_count: usize,
}

pub async fn category_view(state: &AppState, record: CategoryRecord) -> ApiResult<CategoryView> {
    let item_count = state
        .pipeline
        .store
        .count_items_in_category(&record.id)
        .await?;
    Ok(CategoryView {
        id: record.id.to_string(),
        name: record.name,
        description: record.description,
        color: record.color,
        created_at: record.created_at,
        item_count,
    })
}

/// `GET /api/categories`
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<CategoryView>>> {
    let records = state.pipeline.store.list_categories().await?;
    let mut views = Vec::with_capacity(records.len());
    for record in records {
        views.push(category_view(&state, record).await?);
    }
    Ok(Json(views))
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// `POST /api/categories`
///
/// Idempotent by name: an existing category is returned unchanged.
pub async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<CategoryView>)> {
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("Category name is required"));
    }

    if let Some(existing) = state.pipeline.store.find_category_by_name(&name).await? {
        return Ok((StatusCode::OK, Json(category_view(&state, existing).await?)));
    }

    let record = CategoryRecord::new(
        name,
        request.description,
        request.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
    );
    state.pipeline.store.insert_category(record.clone()).await?;

    Ok((
        StatusCode::CREATED,
        Json(category_view(&state, record).await?),
    ))
}
