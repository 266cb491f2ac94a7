use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::error_response;
use crate::inventory::{Category, DeviceUpdate, NewDevice};
use crate::AppState;

const DEFAULT_VENDOR: &str = "Unknown";

fn default_category() -> Category {
    Category::Server
}

fn default_vendor() -> String {
    DEFAULT_VENDOR.to_string()
}

#[derive(Deserialize)]
pub struct AddDeviceRequest {
    pub name: String,
    pub ip: String,
    #[serde(rename = "type", default = "default_category")]
    pub category: Category,
    #[serde(default = "default_vendor")]
    pub vendor: String,
}

#[derive(Deserialize)]
pub struct UpdateDeviceRequest {
    pub name: Option<String>,
    pub ip: Option<String>,
    #[serde(rename = "type")]
    pub category: Option<Category>,
    pub vendor: Option<String>,
}

/// GET /api/devices
pub async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({ "devices": state.engine.inventory().list() }))
}

/// POST /api/devices  (manual add)
pub async fn add_device(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddDeviceRequest>,
) -> impl IntoResponse {
    let device = state.engine.add_device(NewDevice {
        name: req.name,
        ip: req.ip.trim().to_string(),
        category: req.category,
        vendor: req.vendor,
    });
    Json(device)
}

/// PUT /api/devices/:id
pub async fn update_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDeviceRequest>,
) -> impl IntoResponse {
    let update = DeviceUpdate {
        name: req.name,
        ip: req.ip.map(|ip| ip.trim().to_string()),
        category: req.category,
        vendor: req.vendor,
    };
    match state.engine.update_device(&id, update) {
        Ok(device) => Json(device).into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/devices/:id
pub async fn delete_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.engine.remove_device(&id) {
        Ok(_) => Json(serde_json::json!({ "message": "Device deleted" })).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/devices/poll  (one sampling cycle, on demand)
pub async fn poll_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.run_cycle().await)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    use crate::api::test_support::{app, app_with, send};
    use crate::testing::{FakeScanner, FakeWalker};

    #[tokio::test]
    async fn add_list_update_delete() {
        let (app, state) = app();

        let (status, created) = send(
            &app,
            "POST",
            "/api/devices",
            Some(json!({ "name": "core", "ip": "10.0.0.1", "type": "router", "vendor": "Cisco" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["type"], "router");
        assert_eq!(created["status"], "online");
        let id = created["id"].as_str().unwrap().to_string();

        let (_, listed) = send(&app, "GET", "/api/devices", None).await;
        assert_eq!(listed["devices"].as_array().unwrap().len(), 1);

        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/api/devices/{}", id),
            Some(json!({ "name": "core-1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "core-1");
        assert_eq!(updated["vendor"], "Cisco");

        let (status, _) = send(&app, "DELETE", &format!("/api/devices/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.engine.inventory().len(), 0);

        let messages: Vec<String> = state
            .engine
            .alerts()
            .list()
            .into_iter()
            .map(|a| a.message)
            .collect();
        assert_eq!(
            messages,
            vec!["Device removed from monitoring", "Device added to monitoring"]
        );
    }

    #[tokio::test]
    async fn defaults_apply_to_minimal_add() {
        let (app, _) = app();
        let (_, created) = send(
            &app,
            "POST",
            "/api/devices",
            Some(json!({ "name": "box", "ip": "10.0.0.2" })),
        )
        .await;
        assert_eq!(created["type"], "server");
        assert_eq!(created["vendor"], "Unknown");
        assert_eq!(created["uptime"], "0d 0h 0m");
    }

    #[tokio::test]
    async fn unknown_device_is_404() {
        let (app, _) = app();
        let (status, body) = send(&app, "DELETE", "/api/devices/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("missing"));

        let (status, _) = send(
            &app,
            "PUT",
            "/api/devices/missing",
            Some(json!({ "name": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn poll_runs_a_cycle() {
        let walker = Arc::new(FakeWalker::default());
        walker.set_unreachable("10.0.0.9", true);
        let (app, state) = app_with(walker, FakeScanner::default());
        send(
            &app,
            "POST",
            "/api/devices",
            Some(json!({ "name": "nas", "ip": "10.0.0.9" })),
        )
        .await;

        let (status, report) = send(&app, "POST", "/api/devices/poll", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["sampled"], 1);
        assert_eq!(report["reachable"], 0);
        assert_eq!(report["alerts"], 1);
        assert_eq!(state.engine.inventory().list()[0].status.as_str(), "offline");
    }
}
