//! HTTP surface: health probe, latest-report polling and the WS stream.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ws::ws_stream;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/report", get(latest_report))
        .route("/ws", get(ws_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "session_id": state.config.session_id,
        "subscribers": state.active_connections(),
    }))
}

/// The last published report, for clients that poll instead of
/// subscribing. 404 until the first window closes.
async fn latest_report(State(state): State<AppState>) -> impl IntoResponse {
    match state.latest_report().await {
        Some(report) => (StatusCode::OK, Json(json!({ "tools": report }))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No report published yet" })),
        ),
    }
}
