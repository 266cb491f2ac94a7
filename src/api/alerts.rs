use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use super::error_response;
use crate::AppState;

/// GET /api/alerts  (newest first)
pub async fn list_alerts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({ "alerts": state.engine.alerts().list() }))
}

/// POST /api/alerts/:id/acknowledge
pub async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.engine.alerts().acknowledge(&id) {
        Ok(alert) => Json(alert).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/alerts/acknowledge-all
pub async fn acknowledge_all(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let count = state.engine.alerts().acknowledge_all();
    Json(serde_json::json!({
        "message": "All alerts acknowledged",
        "acknowledged": count,
    }))
}
