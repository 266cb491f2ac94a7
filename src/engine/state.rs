use crate::alerts::{tags, AlertRequest, Severity};
use crate::inventory::{Device, DeviceStatus};
use crate::sampling::Sample;

/// Percentages above which a reachable device is put in `warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub cpu_percent: u8,
    pub memory_percent: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            cpu_percent: 80,
            memory_percent: 85,
        }
    }
}

/// What one sample does to a device: its new derived fields and the alerts
/// to record.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub status: DeviceStatus,
    pub cpu_load: u8,
    pub memory_usage: u8,
    pub last_response: u32,
    /// `None` leaves the device's uptime text as it is.
    pub uptime: Option<String>,
    pub alerts: Vec<AlertRequest>,
}

impl Transition {
    /// Write the sampled fields onto `device`. Name, address, category and
    /// vendor are never touched.
    pub fn apply_to(&self, device: &mut Device) {
        device.status = self.status;
        device.cpu_load = self.cpu_load;
        device.memory_usage = self.memory_usage;
        device.last_response = self.last_response;
        if let Some(uptime) = &self.uptime {
            device.uptime = uptime.clone();
        }
    }
}

/// Compute a device's next status from a fresh sample.
///
/// Unreachable alerts fire only on the transition into `offline`; the CPU
/// and memory warnings fire on every sample that is over threshold.
pub fn advance(device: &Device, sample: &Sample, thresholds: &Thresholds) -> Transition {
    let source = device.label();

    if !sample.reachable {
        let mut alerts = Vec::new();
        if device.status != DeviceStatus::Offline {
            alerts.push(
                AlertRequest::new(
                    Severity::Critical,
                    source,
                    "Device unreachable - connection/protocol timeout",
                )
                .tagged(tags::UNREACHABLE),
            );
        }
        return Transition {
            status: DeviceStatus::Offline,
            cpu_load: 0,
            memory_usage: 0,
            last_response: device.last_response,
            uptime: None,
            alerts,
        };
    }

    let cpu_load = percent(sample.cpu_percent);
    let memory_usage = percent(sample.mem_percent);
    let mut status = DeviceStatus::Online;
    let mut alerts = Vec::new();

    if cpu_load > thresholds.cpu_percent {
        status = DeviceStatus::Warning;
        alerts.push(
            AlertRequest::new(
                Severity::Warning,
                source.clone(),
                format!("High CPU utilization ({}%)", cpu_load),
            )
            .tagged(tags::HIGH_CPU),
        );
    }
    if memory_usage > thresholds.memory_percent {
        status = DeviceStatus::Warning;
        alerts.push(
            AlertRequest::new(
                Severity::Warning,
                source,
                format!("High memory usage ({}%)", memory_usage),
            )
            .tagged(tags::HIGH_MEMORY),
        );
    }

    Transition {
        status,
        cpu_load,
        memory_usage,
        last_response: 1,
        uptime: sample.uptime_secs.map(format_uptime),
        alerts,
    }
}

/// Whole-percent value stored on the device, truncated and clamped to 0–100.
fn percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 100.0) as u8
}

pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    format!("{}d {}h {}m", days, hours, minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Category;

    fn device() -> Device {
        Device::new("core".into(), "10.0.0.1".into(), Category::Router, "Cisco".into())
    }

    fn reachable(cpu: f64, mem: f64) -> Sample {
        Sample {
            reachable: true,
            cpu_percent: cpu,
            mem_percent: mem,
            ..Sample::default()
        }
    }

    /// Feed `samples` through the state machine the way the engine does.
    fn run(device: &mut Device, samples: &[Sample]) -> Vec<AlertRequest> {
        let mut raised = Vec::new();
        for sample in samples {
            let transition = advance(device, sample, &Thresholds::default());
            transition.apply_to(device);
            raised.extend(transition.alerts);
        }
        raised
    }

    #[test]
    fn healthy_sample_keeps_device_online() {
        let t = advance(&device(), &reachable(35.7, 40.2), &Thresholds::default());
        assert_eq!(t.status, DeviceStatus::Online);
        assert_eq!(t.cpu_load, 35);
        assert_eq!(t.memory_usage, 40);
        assert_eq!(t.last_response, 1);
        assert!(t.alerts.is_empty());
    }

    #[test]
    fn unreachable_alert_is_transition_gated() {
        let mut d = device();
        let alerts = run(&mut d, &vec![Sample::unreachable(); 5]);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[0].source, "core (10.0.0.1)");
        assert_eq!(alerts[0].tag.as_deref(), Some(tags::UNREACHABLE));
        assert_eq!(d.status, DeviceStatus::Offline);
    }

    #[test]
    fn recovery_then_outage_alerts_again() {
        let mut d = device();
        let alerts = run(
            &mut d,
            &[Sample::unreachable(), reachable(10.0, 10.0), Sample::unreachable()],
        );
        assert_eq!(alerts.len(), 2);
    }

    #[test]
    fn high_cpu_realerts_every_cycle() {
        let mut d = device();
        let alerts = run(&mut d, &vec![reachable(95.0, 10.0); 3]);

        assert_eq!(alerts.len(), 3);
        assert!(alerts.iter().all(|a| a.message == "High CPU utilization (95%)"));
        assert!(alerts.iter().all(|a| a.severity == Severity::Warning));
        assert_eq!(d.status, DeviceStatus::Warning);
    }

    #[test]
    fn cpu_and_memory_checks_are_independent() {
        let t = advance(&device(), &reachable(90.0, 92.0), &Thresholds::default());
        assert_eq!(t.status, DeviceStatus::Warning);
        assert_eq!(t.alerts.len(), 2);
        assert_eq!(t.alerts[1].message, "High memory usage (92%)");
        assert_eq!(t.alerts[1].tag.as_deref(), Some(tags::HIGH_MEMORY));
    }

    #[test]
    fn thresholds_are_strictly_greater_than() {
        let t = advance(&device(), &reachable(80.9, 85.0), &Thresholds::default());
        assert_eq!(t.status, DeviceStatus::Online);
        assert!(t.alerts.is_empty());
    }

    #[test]
    fn warning_recovers_to_online() {
        let mut d = device();
        run(&mut d, &[reachable(99.0, 10.0), reachable(5.0, 10.0)]);
        assert_eq!(d.status, DeviceStatus::Online);
    }

    #[test]
    fn sampling_leaves_operator_fields_alone() {
        let mut d = device();
        let mut sample = reachable(50.0, 50.0);
        sample.uptime_secs = Some(2 * 86_400 + 3 * 3_600 + 4 * 60 + 5);
        run(&mut d, &[sample]);

        assert_eq!(d.name, "core");
        assert_eq!(d.category, Category::Router);
        assert_eq!(d.vendor, "Cisco");
        assert_eq!(d.uptime, "2d 3h 4m");
    }

    #[test]
    fn offline_sample_zeroes_load_and_keeps_uptime() {
        let mut d = device();
        d.cpu_load = 60;
        d.memory_usage = 70;
        d.uptime = "1d 0h 0m".into();
        run(&mut d, &[Sample::unreachable()]);

        assert_eq!(d.cpu_load, 0);
        assert_eq!(d.memory_usage, 0);
        assert_eq!(d.uptime, "1d 0h 0m");
    }
}
