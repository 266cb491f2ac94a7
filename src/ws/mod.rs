use serde::Serialize;

use crate::alerts::Alert;
use crate::discovery::merge::ReconcileSummary;
use crate::inventory::DeviceStatus;

/// All WebSocket events sent to connected dashboard clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsEvent {
    /// A new alert entered the log
    AlertRaised { alert: Alert },
    /// A device's status changed as a result of sampling
    DeviceStatusChanged {
        device_id: String,
        name: String,
        ip: String,
        from: DeviceStatus,
        to: DeviceStatus,
    },
    /// A LAN scan finished and was merged into the inventory
    ScanCompleted {
        #[serde(flatten)]
        summary: ReconcileSummary,
    },
    /// A sampling cycle finished
    CycleCompleted { sampled: usize, reachable: usize, alerts: usize },
}
