use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{MonitorError, Result};

pub mod merge;
pub mod oui;

/// Kernel neighbour table on Linux
const NEIGHBOUR_TABLE: &str = "/proc/net/arp";
/// UDP discard port; any datagram forces an ARP resolution of the target.
const DISCARD_PORT: u16 = 9;
const SETTLE_TIME: Duration = Duration::from_secs(3);
/// ATF_COM: the entry has a resolved hardware address
const FLAG_COMPLETE: u32 = 0x2;

pub const UNKNOWN_NAME: &str = "Unknown";

/// One host seen by a LAN scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub address: String,
    pub hardware_id: String,
    pub name: String,
}

/// Point-in-time LAN scan.
/// `scan()` blocks for the duration of the sweep; run it in `spawn_blocking`.
pub trait LanScanner: Send + Sync {
    fn scan(&self) -> Result<Vec<DiscoveryResult>>;
}

/// Scans the local /24 by forcing ARP resolution of every host address,
/// then reading the resolved entries from the kernel neighbour table.
pub struct ArpScanner {
    table_path: PathBuf,
    settle: Duration,
}

impl ArpScanner {
    pub fn new() -> Self {
        ArpScanner {
            table_path: PathBuf::from(NEIGHBOUR_TABLE),
            settle: SETTLE_TIME,
        }
    }

    fn local_ipv4() -> Result<Ipv4Addr> {
        match local_ip_address::local_ip() {
            Ok(IpAddr::V4(ip)) => Ok(ip),
            Ok(IpAddr::V6(ip)) => Err(MonitorError::scan(format!(
                "primary address {} is not IPv4",
                ip
            ))),
            Err(e) => Err(MonitorError::scan(format!("cannot determine local IP: {}", e))),
        }
    }

    /// Send one datagram to every other host of the /24 so the kernel
    /// resolves (and caches) their hardware addresses.
    fn prime(&self, local: Ipv4Addr) -> Result<()> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        let [a, b, c, _] = local.octets();

        for host in 1..=254u8 {
            let target = Ipv4Addr::new(a, b, c, host);
            if target == local {
                continue;
            }
            // Unreachable hosts are expected; only the ARP side effect matters.
            let _ = socket.send_to(&[0], (target, DISCARD_PORT));
        }
        Ok(())
    }
}

impl Default for ArpScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl LanScanner for ArpScanner {
    fn scan(&self) -> Result<Vec<DiscoveryResult>> {
        let local = Self::local_ipv4()?;
        tracing::info!("LAN scan: probing {}/24", network_of(local));

        self.prime(local)?;
        std::thread::sleep(self.settle);

        let table = std::fs::read_to_string(&self.table_path)?;
        let results = parse_neighbour_table(&table, local);
        tracing::info!("LAN scan: {} host(s) answered", results.len());
        Ok(results)
    }
}

fn network_of(ip: Ipv4Addr) -> Ipv4Addr {
    let [a, b, c, _] = ip.octets();
    Ipv4Addr::new(a, b, c, 0)
}

/// Resolved neighbour entries inside `local`'s /24.
///
/// ```text
/// IP address       HW type     Flags       HW address            Mask     Device
/// 192.168.1.1      0x1         0x2         aa:bb:cc:dd:ee:ff     *        eth0
/// ```
pub fn parse_neighbour_table(table: &str, local: Ipv4Addr) -> Vec<DiscoveryResult> {
    let network = network_of(local);

    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let (ip, flags, mac) = match fields.as_slice() {
                [ip, _hw_type, flags, mac, ..] => (ip, flags, mac),
                _ => return None,
            };

            let ip: Ipv4Addr = ip.parse().ok()?;
            let flags = u32::from_str_radix(flags.trim_start_matches("0x"), 16).ok()?;
            if flags & FLAG_COMPLETE == 0 || *mac == "00:00:00:00:00:00" {
                return None;
            }
            if network_of(ip) != network || ip == local {
                return None;
            }

            Some(DiscoveryResult {
                address: ip.to_string(),
                hardware_id: mac.to_ascii_uppercase(),
                name: UNKNOWN_NAME.to_string(),
            })
        })
        .collect()
}
