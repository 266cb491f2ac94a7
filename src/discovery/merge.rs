use serde::Serialize;
use std::collections::HashSet;

use super::{oui, DiscoveryResult};
use crate::inventory::{Category, Device, DeviceStatus};
use crate::sampling::is_loopback;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub created: usize,
    pub refreshed: usize,
    pub marked_offline: usize,
}

/// Merge one scan's results into `devices`, matching by address.
///
/// Seen devices go online and take the scanned hardware address; unseen
/// ones go offline, except loopback which is never scanned. Nothing else
/// an operator may have edited is touched. No alerts are raised here.
pub fn reconcile(devices: &mut Vec<Device>, results: &[DiscoveryResult]) -> ReconcileSummary {
    let mut summary = ReconcileSummary::default();

    for result in results {
        let hardware_id = Some(result.hardware_id.clone()).filter(|mac| !mac.is_empty());

        // Duplicate addresses in one scan: the later result's hardware id wins.
        if let Some(existing) = devices.iter_mut().find(|d| d.ip == result.address) {
            existing.status = DeviceStatus::Online;
            existing.mac = hardware_id;
            summary.refreshed += 1;
            continue;
        }

        devices.push(discovered_device(result, hardware_id));
        summary.created += 1;
    }

    let seen: HashSet<&str> = results.iter().map(|r| r.address.as_str()).collect();
    for device in devices.iter_mut() {
        if seen.contains(device.ip.as_str()) || is_loopback(&device.ip) {
            continue;
        }
        if device.status != DeviceStatus::Offline {
            summary.marked_offline += 1;
        }
        device.status = DeviceStatus::Offline;
    }

    summary
}

fn discovered_device(result: &DiscoveryResult, hardware_id: Option<String>) -> Device {
    let (category, vendor) = match hardware_id.as_deref() {
        Some(mac) => (oui::category_for(mac), oui::vendor_for(mac)),
        None => (Category::Server, oui::UNKNOWN_VENDOR),
    };
    let last_octet = result.address.rsplit('.').next().unwrap_or(&result.address);

    let mut device = Device::new(
        format!("device-{}", last_octet),
        result.address.clone(),
        category,
        vendor.to_string(),
    );
    device.mac = hardware_id;
    device
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(address: &str, mac: &str) -> DiscoveryResult {
        DiscoveryResult {
            address: address.into(),
            hardware_id: mac.into(),
            name: "Unknown".into(),
        }
    }

    fn localhost() -> Device {
        Device::new("localhost".into(), "127.0.0.1".into(), Category::Server, "Local Machine".into())
    }

    #[test]
    fn new_address_creates_classified_device() {
        let mut devices = Vec::new();
        let summary = reconcile(&mut devices, &[found("10.0.0.9", "FC:EC:DA:11:22:33")]);

        assert_eq!(summary.created, 1);
        assert_eq!(devices.len(), 1);
        let device = &devices[0];
        assert_eq!(device.name, "device-9");
        assert_eq!(device.category, Category::Ap);
        assert_eq!(device.vendor, "Ubiquiti");
        assert_eq!(device.status, DeviceStatus::Online);
        assert_eq!(device.mac.as_deref(), Some("FC:EC:DA:11:22:33"));
        assert_eq!(device.cpu_load, 0);
    }

    #[test]
    fn existing_device_keeps_operator_edits() {
        let mut edited = Device::new("core-router".into(), "10.0.0.1".into(), Category::Router, "Juniper".into());
        edited.status = DeviceStatus::Offline;
        edited.mac = Some("00:00:00:00:00:01".into());
        let mut devices = vec![edited];

        let summary = reconcile(&mut devices, &[found("10.0.0.1", "00:1A:2B:00:00:01")]);

        assert_eq!(summary, ReconcileSummary { created: 0, refreshed: 1, marked_offline: 0 });
        let device = &devices[0];
        assert_eq!(device.status, DeviceStatus::Online);
        assert_eq!(device.mac.as_deref(), Some("00:1A:2B:00:00:01"));
        assert_eq!(device.name, "core-router");
        assert_eq!(device.category, Category::Router);
        assert_eq!(device.vendor, "Juniper");
    }

    #[test]
    fn missing_devices_go_offline_except_loopback() {
        let absent = Device::new("printer".into(), "10.0.0.20".into(), Category::Server, "HP".into());
        let mut devices = vec![localhost(), absent];

        let summary = reconcile(&mut devices, &[found("10.0.0.9", "AA:BB:CC:00:00:01")]);

        assert_eq!(summary.marked_offline, 1);
        assert_eq!(devices[0].status, DeviceStatus::Online);
        assert_eq!(devices[1].status, DeviceStatus::Offline);
        assert_eq!(devices[2].status, DeviceStatus::Online);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let results = [
            found("10.0.0.9", "FC:EC:DA:11:22:33"),
            found("10.0.0.10", "D4:BE:D9:00:00:10"),
        ];
        let mut devices = vec![localhost()];

        reconcile(&mut devices, &results);
        let once = devices.clone();
        let second = reconcile(&mut devices, &results);

        assert_eq!(devices, once);
        assert_eq!(second.created, 0);
        assert_eq!(second.marked_offline, 0);
    }

    #[test]
    fn duplicate_address_in_one_scan_is_last_write_wins() {
        let mut devices = Vec::new();
        let summary = reconcile(
            &mut devices,
            &[found("10.0.0.5", "FC:EC:DA:00:00:01"), found("10.0.0.5", "D4:BE:D9:00:00:02")],
        );

        assert_eq!(summary.created, 1);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].mac.as_deref(), Some("D4:BE:D9:00:00:02"));
    }

    #[test]
    fn missing_hardware_id_defaults_to_unknown_server() {
        let mut devices = Vec::new();
        reconcile(&mut devices, &[found("192.168.1.77", "")]);
        assert_eq!(devices[0].category, Category::Server);
        assert_eq!(devices[0].vendor, "Unknown");
        assert_eq!(devices[0].mac, None);
    }
}
