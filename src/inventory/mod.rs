use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::discovery::{merge, DiscoveryResult};
use crate::error::{MonitorError, Result};

// ─── Device ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Router,
    Switch,
    Server,
    Firewall,
    /// Wireless access point
    Ap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Online,
    Offline,
    Warning,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub mac: Option<String>,
    #[serde(rename = "type")]
    pub category: Category,
    pub status: DeviceStatus,
    pub vendor: String,
    pub uptime: String,
    pub cpu_load: u8,
    pub memory_usage: u8,
    pub last_response: u32,
}

pub const UNKNOWN_UPTIME: &str = "0d 0h 0m";

impl Device {
    pub fn new(name: String, ip: String, category: Category, vendor: String) -> Self {
        Device {
            id: Uuid::new_v4().to_string(),
            name,
            ip,
            mac: None,
            category,
            status: DeviceStatus::Online,
            vendor,
            uptime: UNKNOWN_UPTIME.into(),
            cpu_load: 0,
            memory_usage: 0,
            last_response: 0,
        }
    }

    /// Label used as the source of alerts about this device.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.ip)
    }
}

/// Operator-supplied fields for an explicit add.
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub name: String,
    pub ip: String,
    pub category: Category,
    pub vendor: String,
}

/// Operator edit; `None` leaves the field as it is.
#[derive(Debug, Clone, Default)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub ip: Option<String>,
    pub category: Option<Category>,
    pub vendor: Option<String>,
}

// ─── Inventory store ────────────────────────────────────────────────────────

/// Every known device, in insertion order, behind one writer lock.
///
/// Discovery reconciliation, state-machine updates and CRUD edits all take
/// the same write lock, so a scan can never interleave with a delete.
#[derive(Debug, Default)]
pub struct Inventory {
    devices: RwLock<Vec<Device>>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, new: NewDevice) -> Device {
        let device = Device::new(new.name, new.ip, new.category, new.vendor);
        self.insert(device.clone());
        device
    }

    pub fn insert(&self, device: Device) {
        self.devices.write().push(device);
    }

    pub fn list(&self) -> Vec<Device> {
        self.devices.read().clone()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn get(&self, id: &str) -> Result<Device> {
        self.devices
            .read()
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| MonitorError::DeviceNotFound(id.to_string()))
    }

    #[cfg(test)]
    pub fn find_by_ip(&self, ip: &str) -> Option<Device> {
        self.devices.read().iter().find(|d| d.ip == ip).cloned()
    }

    pub fn update(&self, id: &str, update: DeviceUpdate) -> Result<Device> {
        let (device, ()) = self.modify(id, |device| {
            if let Some(name) = update.name {
                device.name = name;
            }
            if let Some(ip) = update.ip {
                device.ip = ip;
            }
            if let Some(category) = update.category {
                device.category = category;
            }
            if let Some(vendor) = update.vendor {
                device.vendor = vendor;
            }
        })?;
        Ok(device)
    }

    pub fn delete(&self, id: &str) -> Result<Device> {
        let mut devices = self.devices.write();
        let pos = devices
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| MonitorError::DeviceNotFound(id.to_string()))?;
        Ok(devices.remove(pos))
    }

    /// Apply `f` to one device under the write lock. Returns the updated
    /// device together with whatever `f` produced.
    pub fn modify<T, F>(&self, id: &str, f: F) -> Result<(Device, T)>
    where
        F: FnOnce(&mut Device) -> T,
    {
        let mut devices = self.devices.write();
        let device = devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| MonitorError::DeviceNotFound(id.to_string()))?;
        let output = f(device);
        Ok((device.clone(), output))
    }

    /// Merge a scan result set into the inventory in one critical section.
    pub fn reconcile(&self, results: &[DiscoveryResult]) -> merge::ReconcileSummary {
        let mut devices = self.devices.write();
        merge::reconcile(&mut devices, results)
    }
}
