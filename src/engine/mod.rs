use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

pub mod state;

use crate::alerts::{tags, Alert, AlertLog, AlertRequest, Severity};
use crate::discovery::merge::ReconcileSummary;
use crate::discovery::{DiscoveryResult, LanScanner};
use crate::error::{MonitorError, Result};
use crate::inventory::{Category, Device, DeviceStatus, DeviceUpdate, Inventory, NewDevice};
use crate::ping::{self, PingOutcome};
use crate::sampling::cache::CacheKey;
use crate::sampling::remote::InterfaceInfo;
use crate::sampling::snmp::WalkError;
use crate::sampling::{Sample, SampleTarget, Sampler};
use crate::ws::WsEvent;
use state::{advance, Thresholds};

pub const LOCAL_ADDRESS: &str = "127.0.0.1";
const SYSTEM_SOURCE: &str = "NMS System";

/// Counts for one sampling pass over the inventory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub sampled: usize,
    pub reachable: usize,
    pub alerts: usize,
}

/// Dashboard summary, computed on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub warning: usize,
    pub critical_alerts: usize,
    pub avg_latency: u32,
}

/// Result of sampling one device and reacting to it.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub device: Device,
    pub reachable: bool,
    pub alerts: usize,
}

/// Telemetry sampling and reconciliation engine.
///
/// Owns the stores it mutates; every write to the inventory or the alert
/// log goes through their own single lock.
pub struct Engine {
    inventory: Arc<Inventory>,
    alerts: Arc<AlertLog>,
    sampler: Sampler,
    scanner: Arc<dyn LanScanner>,
    thresholds: Thresholds,
    event_tx: broadcast::Sender<WsEvent>,
}

impl Engine {
    pub fn new(
        inventory: Arc<Inventory>,
        alerts: Arc<AlertLog>,
        sampler: Sampler,
        scanner: Arc<dyn LanScanner>,
        thresholds: Thresholds,
        event_tx: broadcast::Sender<WsEvent>,
    ) -> Self {
        Engine {
            inventory,
            alerts,
            sampler,
            scanner,
            thresholds,
            event_tx,
        }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn alerts(&self) -> &AlertLog {
        &self.alerts
    }

    #[cfg(test)]
    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WsEvent> {
        self.event_tx.subscribe()
    }

    /// Seed the inventory with this host and note that monitoring started.
    pub fn bootstrap(&self) {
        let mut localhost = Device::new(
            "localhost".into(),
            LOCAL_ADDRESS.into(),
            Category::Server,
            "Local Machine".into(),
        );
        localhost.last_response = 1;
        self.inventory.insert(localhost);

        self.record_alert(
            AlertRequest::new(Severity::Info, SYSTEM_SOURCE, "Network Monitoring System started")
                .tagged(tags::LIFECYCLE),
        );
    }

    // ─── Sampling ────────────────────────────────────────────────────────────

    pub async fn sample(&self, address: &str) -> Sample {
        self.sampler.sample(&SampleTarget::for_address(address)).await
    }

    /// Sample one device and run its state machine.
    /// `None` when the device was deleted while its sample was in flight.
    pub async fn poll_device(&self, device: &Device) -> Option<PollOutcome> {
        let sample = self.sample(&device.ip).await;
        self.react(&device.id, &sample)
    }

    /// Feed a sample into the device's state machine and record the alerts
    /// it emits. The transition is computed against the stored device under
    /// the inventory lock, so concurrent samples of one device cannot both
    /// see the same "before" status.
    pub fn react(&self, device_id: &str, sample: &Sample) -> Option<PollOutcome> {
        let (device, (previous, transition)) = self
            .inventory
            .modify(device_id, |device| {
                let previous = device.status;
                let transition = advance(device, sample, &self.thresholds);
                transition.apply_to(device);
                (previous, transition)
            })
            .ok()?;

        tracing::debug!(
            "Sampled {} ({}): {} cpu={}% mem={}%",
            device.name,
            device.ip,
            device.status.as_str(),
            device.cpu_load,
            device.memory_usage
        );

        if previous != device.status {
            let _ = self.event_tx.send(WsEvent::DeviceStatusChanged {
                device_id: device.id.clone(),
                name: device.name.clone(),
                ip: device.ip.clone(),
                from: previous,
                to: device.status,
            });
        }

        let alerts = transition.alerts.len();
        for request in transition.alerts {
            self.record_alert(request);
        }

        Some(PollOutcome {
            device,
            reachable: sample.reachable,
            alerts,
        })
    }

    /// Sample every device concurrently, then fold the results.
    pub async fn run_cycle(&self) -> CycleReport {
        let devices = self.inventory.list();
        let outcomes = join_all(devices.iter().map(|d| self.poll_device(d))).await;

        let report = outcomes
            .into_iter()
            .flatten()
            .fold(CycleReport::default(), |mut report, outcome| {
                report.sampled += 1;
                report.reachable += usize::from(outcome.reachable);
                report.alerts += outcome.alerts;
                report
            });

        tracing::debug!(
            "Cycle complete: {}/{} reachable, {} alert(s)",
            report.reachable,
            report.sampled,
            report.alerts
        );
        let _ = self.event_tx.send(WsEvent::CycleCompleted {
            sampled: report.sampled,
            reachable: report.reachable,
            alerts: report.alerts,
        });
        report
    }

    pub async fn interfaces(&self, address: &str) -> std::result::Result<Vec<InterfaceInfo>, WalkError> {
        self.sampler.remote().interfaces(address).await
    }

    // ─── Discovery ───────────────────────────────────────────────────────────

    pub fn reconcile(&self, results: &[DiscoveryResult]) -> ReconcileSummary {
        let summary = self.inventory.reconcile(results);
        tracing::info!(
            "Discovery merged: {} new, {} refreshed, {} marked offline",
            summary.created,
            summary.refreshed,
            summary.marked_offline
        );
        let _ = self.event_tx.send(WsEvent::ScanCompleted { summary });
        summary
    }

    pub async fn scan_and_reconcile(&self) -> Result<ReconcileSummary> {
        let scanner = self.scanner.clone();
        let results = tokio::task::spawn_blocking(move || scanner.scan())
            .await
            .map_err(|e| MonitorError::scan(format!("scan task failed: {}", e)))??;
        Ok(self.reconcile(&results))
    }

    // ─── Inventory edits ─────────────────────────────────────────────────────

    pub fn add_device(&self, new: NewDevice) -> Device {
        let device = self.inventory.create(new);
        tracing::info!("Device {} ({}) added", device.name, device.ip);
        self.record_alert(
            AlertRequest::new(Severity::Info, device.label(), "Device added to monitoring")
                .tagged(tags::LIFECYCLE),
        );
        device
    }

    pub fn update_device(&self, id: &str, update: DeviceUpdate) -> Result<Device> {
        let before = self.inventory.get(id)?;
        let device = self.inventory.update(id, update)?;
        if before.ip != device.ip {
            self.sampler.cache().forget(&CacheKey::Remote(before.ip));
        }
        Ok(device)
    }

    pub fn remove_device(&self, id: &str) -> Result<Device> {
        let device = self.inventory.delete(id)?;
        self.sampler.cache().forget(&CacheKey::Remote(device.ip.clone()));
        tracing::info!("Device {} ({}) removed", device.name, device.ip);
        self.record_alert(
            AlertRequest::new(Severity::Info, device.label(), "Device removed from monitoring")
                .tagged(tags::LIFECYCLE),
        );
        Ok(device)
    }

    pub async fn ping_device(&self, id: &str) -> Result<PingOutcome> {
        let device = self.inventory.get(id)?;
        let outcome = ping::ping(&device.ip).await?;
        if outcome.success {
            // Deleted meanwhile is fine; the ping result still stands.
            let _ = self.inventory.modify(id, |d| d.last_response = 2);
        }
        Ok(outcome)
    }

    // ─── Alerts & stats ──────────────────────────────────────────────────────

    pub fn record_alert(&self, request: AlertRequest) -> Alert {
        let alert = self.alerts.record(request);
        let _ = self.event_tx.send(WsEvent::AlertRaised {
            alert: alert.clone(),
        });
        alert
    }

    pub fn stats(&self) -> Stats {
        let devices = self.inventory.list();
        let count = |status: DeviceStatus| devices.iter().filter(|d| d.status == status).count();

        let responding: Vec<u32> = devices
            .iter()
            .filter(|d| d.status != DeviceStatus::Offline)
            .map(|d| d.last_response)
            .collect();
        let sum: u64 = responding.iter().map(|&r| u64::from(r)).sum();
        let avg_latency = mean_half_even(sum, responding.len() as u64);

        Stats {
            total: devices.len(),
            online: count(DeviceStatus::Online),
            offline: count(DeviceStatus::Offline),
            warning: count(DeviceStatus::Warning),
            critical_alerts: self.alerts.unacknowledged_critical(),
            avg_latency,
        }
    }
}

/// Integer mean, ties rounded to the even neighbour (0.5 → 0, 1.5 → 2).
fn mean_half_even(sum: u64, count: u64) -> u32 {
    if count == 0 {
        return 0;
    }
    let (quotient, remainder) = (sum / count, sum % count);
    let rounded = match (2 * remainder).cmp(&count) {
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => quotient + quotient % 2,
        std::cmp::Ordering::Less => quotient,
    };
    u32::try_from(rounded).unwrap_or(u32::MAX)
}
