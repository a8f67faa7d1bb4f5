//! API routes.

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::categories::{create_category, list_categories};
use crate::handlers::health::{health, ready};
use crate::handlers::items::{delete_item, get_item, list_items, submit_items};
use crate::handlers::stats::get_stats;
use crate::state::AppState;
use crate::ws::{ws_all_updates, ws_item_progress};

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let api_routes = Router::new()
        .route("/items", get(list_items).post(submit_items))
        .route("/items/:item_id", get(get_item).delete(delete_item))
        .route("/categories", get(list_categories).post(create_category))
        .route("/stats", get(get_stats));

    let ws_routes = Router::new()
        .route("/ws/updates", get(ws_all_updates))
        .route("/ws/items/:item_id", get(ws_item_progress));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|origin| origin == "*") {
        layer.allow_origin(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(parsed))
    }
}
