use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error_response;
use crate::engine::LOCAL_ADDRESS;
use crate::sampling::Sample;
use crate::AppState;

#[derive(Deserialize)]
pub struct TargetQuery {
    pub target: Option<String>,
}

impl TargetQuery {
    fn address(&self) -> &str {
        self.target
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(LOCAL_ADDRESS)
    }
}

/// Wire shape of a one-off sample, as the dashboard reads it.
#[derive(Debug, Serialize)]
pub struct RealtimeReading {
    pub status: &'static str,
    pub cpu_usage: f64,
    pub ram_total: f64,
    pub ram_used: f64,
    pub ram_usage_percent: f64,
    pub net_in_mbps: f64,
    pub net_out_mbps: f64,
}

impl From<Sample> for RealtimeReading {
    fn from(sample: Sample) -> Self {
        RealtimeReading {
            status: if sample.reachable { "Online" } else { "Offline" },
            cpu_usage: sample.cpu_percent,
            ram_total: sample.mem_total_gb,
            ram_used: sample.mem_used_gb,
            ram_usage_percent: sample.mem_percent,
            net_in_mbps: sample.rx_mbps,
            net_out_mbps: sample.tx_mbps,
        }
    }
}

/// GET /api/realtime?target=
pub async fn realtime(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TargetQuery>,
) -> impl IntoResponse {
    let sample = state.engine.sample(query.address()).await;
    Json(RealtimeReading::from(sample))
}

/// GET /api/interfaces?target=
pub async fn interfaces(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TargetQuery>,
) -> impl IntoResponse {
    match state.engine.interfaces(query.address()).await {
        Ok(interfaces) => Json(serde_json::json!({ "interfaces": interfaces })).into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// GET /api/scan-lan
pub async fn scan_lan(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.engine.scan_and_reconcile().await {
        Ok(_) => Json(serde_json::json!({ "devices": state.engine.inventory().list() })).into_response(),
        Err(e) => {
            tracing::warn!("LAN scan failed: {}", e);
            error_response(e)
        }
    }
}

/// POST /api/ping/:id
pub async fn ping_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.engine.ping_device(&id).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e),
    }
}
