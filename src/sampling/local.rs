use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use sysinfo::{Networks, System};

use super::cache::{CacheKey, SamplingCache};
use super::rate::round_to;
use super::Sample;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Raw counters read from the OS in one pass.
#[derive(Debug, Clone, Default, PartialEq)]
struct LocalReading {
    cpu_percent: f64,
    mem_total: u64,
    mem_available: u64,
    rx_bytes: u64,
    tx_bytes: u64,
    uptime_secs: u64,
}

struct LocalState {
    system: System,
    networks: Networks,
}

/// Reads this host's CPU, memory and interface counters.
///
/// CPU usage is measured between consecutive refreshes, so the handles are
/// kept alive across samples. The very first reading reports 0%.
#[derive(Clone)]
pub struct LocalSource {
    state: Arc<Mutex<LocalState>>,
}

impl LocalSource {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        LocalSource {
            state: Arc::new(Mutex::new(LocalState {
                system,
                networks: Networks::new_with_refreshed_list(),
            })),
        }
    }

    /// The local host is always reachable to itself.
    pub async fn sample(&self, cache: &SamplingCache, now: Instant) -> Sample {
        let state = self.state.clone();
        // sysinfo walks /proc (or the platform equivalent); keep it off the runtime.
        let reading = tokio::task::spawn_blocking(move || read_counters(&mut *state.lock()))
            .await
            .unwrap_or_default();

        let (mem_total_gb, mem_used_gb, mem_percent) =
            memory_triple(reading.mem_total, reading.mem_available);
        let throughput = cache.advance(CacheKey::LocalNetwork, reading.rx_bytes, reading.tx_bytes, now);

        Sample {
            reachable: true,
            cpu_percent: round_to(reading.cpu_percent, 2),
            mem_total_gb,
            mem_used_gb,
            mem_percent,
            rx_mbps: throughput.rx_mbps,
            tx_mbps: throughput.tx_mbps,
            uptime_secs: Some(reading.uptime_secs),
        }
    }
}

impl Default for LocalSource {
    fn default() -> Self {
        Self::new()
    }
}

fn read_counters(state: &mut LocalState) -> LocalReading {
    state.system.refresh_cpu();
    state.system.refresh_memory();
    state.networks.refresh_list();
    state.networks.refresh();

    let (rx_bytes, tx_bytes) = state
        .networks
        .iter()
        .filter(|(name, _)| counts_toward_traffic(name))
        .fold((0u64, 0u64), |(rx, tx), (_, data)| {
            (
                rx.saturating_add(data.total_received()),
                tx.saturating_add(data.total_transmitted()),
            )
        });

    LocalReading {
        cpu_percent: f64::from(state.system.global_cpu_info().cpu_usage()),
        mem_total: state.system.total_memory(),
        mem_available: state.system.available_memory(),
        rx_bytes,
        tx_bytes,
        uptime_secs: System::uptime(),
    }
}

/// Total, used and percent of RAM. Used is `total - available` so page
/// cache the OS can reclaim does not count as used.
fn memory_triple(total: u64, available: u64) -> (f64, f64, f64) {
    if total == 0 {
        return (0.0, 0.0, 0.0);
    }
    let used = total.saturating_sub(available);
    (
        round_to(total as f64 / GIB, 2),
        round_to(used as f64 / GIB, 2),
        round_to(used as f64 / total as f64 * 100.0, 1),
    )
}

fn counts_toward_traffic(interface: &str) -> bool {
    !is_loopback_interface(interface) && interface_is_up(interface)
}

fn is_loopback_interface(interface: &str) -> bool {
    interface == "lo" || interface.to_lowercase().contains("loopback")
}

#[cfg(target_os = "linux")]
fn interface_is_up(interface: &str) -> bool {
    // Interfaces without an operstate file are assumed up.
    match std::fs::read_to_string(format!("/sys/class/net/{}/operstate", interface)) {
        Ok(state) => state.trim() != "down",
        Err(_) => true,
    }
}

#[cfg(not(target_os = "linux"))]
fn interface_is_up(_interface: &str) -> bool {
    true
}
