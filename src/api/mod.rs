pub mod alerts;
pub mod devices;
pub mod realtime;
pub mod stats;
pub mod ws_handler;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::error::MonitorError;
use crate::AppState;

/// Map an engine error onto the `{ "error": ... }` body the dashboard expects.
pub fn error_response(e: MonitorError) -> Response {
    let status = match &e {
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        MonitorError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // WebSocket
        .route("/ws", get(ws_handler::ws_handler))
        // Live sampling
        .route("/api/realtime", get(realtime::realtime))
        .route("/api/interfaces", get(realtime::interfaces))
        .route("/api/scan-lan", get(realtime::scan_lan))
        .route("/api/ping/:id", post(realtime::ping_device))
        // Inventory
        .route("/api/devices", get(devices::list_devices).post(devices::add_device))
        .route("/api/devices/poll", post(devices::poll_devices))
        .route(
            "/api/devices/:id",
            put(devices::update_device).delete(devices::delete_device),
        )
        // Alerts
        .route("/api/alerts", get(alerts::list_alerts))
        .route("/api/alerts/acknowledge-all", post(alerts::acknowledge_all))
        .route("/api/alerts/:id/acknowledge", post(alerts::acknowledge_alert))
        // Dashboard summary
        .route("/api/stats", get(stats::get_stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
