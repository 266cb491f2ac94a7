use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::cache::{CacheKey, SamplingCache, Throughput};
use super::rate::round_to;
use super::snmp::{oid, CounterRow, CounterValue, CounterWalker, WalkError};
use super::Sample;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Result of the processor-load query, the only reachability signal for a
/// remote target. An idle host is `Load(0.0)`, never `Unreachable`.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadReading {
    Load(f64),
    Unreachable(WalkError),
}

/// Physical memory totals in bytes, summed over all RAM storage rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RamTotals {
    pub total: u64,
    pub used: u64,
}

/// Octet counters summed over interfaces that are up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OctetTotals {
    pub rx: u64,
    pub tx: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceInfo {
    pub index: u32,
    pub name: String,
}

/// Samples other hosts over the counter-query protocol.
#[derive(Clone)]
pub struct RemoteSource {
    walker: Arc<dyn CounterWalker>,
    walk_timeout: Duration,
}

impl RemoteSource {
    pub fn new(walker: Arc<dyn CounterWalker>, walk_timeout: Duration) -> Self {
        RemoteSource {
            walker,
            walk_timeout,
        }
    }

    /// Walk one column on a blocking thread, bounded by the walk timeout.
    async fn walk(&self, target: &str, column: &'static [u32]) -> Result<Vec<CounterRow>, WalkError> {
        let walker = self.walker.clone();
        let target = target.to_string();
        let task = tokio::task::spawn_blocking(move || walker.walk(&target, column));

        match tokio::time::timeout(self.walk_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(WalkError::Protocol(format!("walk task failed: {}", e))),
            Err(_) => Err(WalkError::Timeout(self.walk_timeout)),
        }
    }

    pub async fn processor_load(&self, target: &str) -> LoadReading {
        match self.walk(target, oid::PROCESSOR_LOAD).await {
            Ok(rows) => LoadReading::Load(average_load(&rows)),
            Err(e) => LoadReading::Unreachable(e),
        }
    }

    /// Physical RAM totals. A failed or empty storage table reads as zero.
    pub async fn ram(&self, target: &str) -> RamTotals {
        let (types, units, sizes, used) = tokio::join!(
            self.walk(target, oid::STORAGE_TYPE),
            self.walk(target, oid::STORAGE_UNITS),
            self.walk(target, oid::STORAGE_SIZE),
            self.walk(target, oid::STORAGE_USED),
        );

        match (types, units, sizes, used) {
            (Ok(types), Ok(units), Ok(sizes), Ok(used)) => ram_totals(&types, &units, &sizes, &used),
            _ => {
                tracing::debug!("Storage table unavailable on {}, reporting zero memory", target);
                RamTotals::default()
            }
        }
    }

    /// Octets across up interfaces, or `None` when the interface table could
    /// not be read (so no bogus baseline gets recorded).
    pub async fn octets(&self, target: &str) -> Option<OctetTotals> {
        let (status, rx, tx) = tokio::join!(
            self.walk(target, oid::IF_OPER_STATUS),
            self.walk(target, oid::IF_IN_OCTETS),
            self.walk(target, oid::IF_OUT_OCTETS),
        );

        match (status, rx, tx) {
            (Ok(status), Ok(rx), Ok(tx)) => Some(octet_totals(&status, &rx, &tx)),
            _ => {
                tracing::debug!("Interface table unavailable on {}", target);
                None
            }
        }
    }

    pub async fn uptime_secs(&self, target: &str) -> Option<u64> {
        let rows = self.walk(target, oid::SYS_UPTIME).await.ok()?;
        // sysUpTime counts hundredths of a second.
        rows.iter().find_map(|row| row.value.as_u64()).map(|ticks| ticks / 100)
    }

    pub async fn interfaces(&self, target: &str) -> Result<Vec<InterfaceInfo>, WalkError> {
        let rows = self.walk(target, oid::IF_DESCR).await?;
        Ok(rows
            .into_iter()
            .map(|row| InterfaceInfo {
                index: row.index,
                name: match row.value {
                    CounterValue::Text(text) => decode_interface_name(&text),
                    other => format!("{:?}", other),
                },
            })
            .collect())
    }

    /// Processor load decides reachability; the other tables are only read
    /// once the target has answered.
    pub async fn sample(&self, target: &str, cache: &SamplingCache, now: Instant) -> Sample {
        let cpu_percent = match self.processor_load(target).await {
            LoadReading::Load(load) => load,
            LoadReading::Unreachable(e) => {
                tracing::warn!("Target {} unreachable: {}", target, e);
                return Sample::unreachable();
            }
        };

        let (ram, octets, uptime_secs) =
            tokio::join!(self.ram(target), self.octets(target), self.uptime_secs(target));

        let throughput = match octets {
            Some(o) => cache.advance(CacheKey::Remote(target.to_string()), o.rx, o.tx, now),
            None => Throughput::default(),
        };
        let (mem_total_gb, mem_used_gb, mem_percent) = memory_triple(ram);

        Sample {
            reachable: true,
            cpu_percent,
            mem_total_gb,
            mem_used_gb,
            mem_percent,
            rx_mbps: throughput.rx_mbps,
            tx_mbps: throughput.tx_mbps,
            uptime_secs,
        }
    }
}

/// Mean of all processor rows, rows that are not numbers skipped.
pub fn average_load(rows: &[CounterRow]) -> f64 {
    let loads: Vec<i64> = rows.iter().filter_map(|row| row.value.as_i64()).collect();
    if loads.is_empty() {
        return 0.0;
    }
    let sum: i64 = loads.iter().sum();
    round_to(sum as f64 / loads.len() as f64, 2)
}

pub fn ram_totals(
    types: &[CounterRow],
    units: &[CounterRow],
    sizes: &[CounterRow],
    used: &[CounterRow],
) -> RamTotals {
    let units = numeric_by_index(units);
    let sizes = numeric_by_index(sizes);
    let used = numeric_by_index(used);

    types
        .iter()
        .filter(|row| row.value.is_object_id(oid::STORAGE_RAM))
        .filter_map(|row| {
            let unit = units.get(&row.index)?;
            let size = sizes.get(&row.index)?;
            let used = used.get(&row.index)?;
            Some((size.saturating_mul(*unit), used.saturating_mul(*unit)))
        })
        .fold(RamTotals::default(), |acc, (size, used)| RamTotals {
            total: acc.total.saturating_add(size),
            used: acc.used.saturating_add(used),
        })
}

pub fn octet_totals(status: &[CounterRow], rx: &[CounterRow], tx: &[CounterRow]) -> OctetTotals {
    let rx = numeric_by_index(rx);
    let tx = numeric_by_index(tx);

    status
        .iter()
        .filter(|row| row.value.as_u64() == Some(oid::IF_STATUS_UP))
        .fold(OctetTotals::default(), |acc, row| OctetTotals {
            rx: acc.rx.saturating_add(rx.get(&row.index).copied().unwrap_or(0)),
            tx: acc.tx.saturating_add(tx.get(&row.index).copied().unwrap_or(0)),
        })
}

fn numeric_by_index(rows: &[CounterRow]) -> HashMap<u32, u64> {
    rows.iter()
        .filter_map(|row| row.value.as_u64().map(|v| (row.index, v)))
        .collect()
}

fn memory_triple(ram: RamTotals) -> (f64, f64, f64) {
    if ram.total == 0 {
        return (0.0, 0.0, 0.0);
    }
    (
        round_to(ram.total as f64 / GIB, 2),
        round_to(ram.used as f64 / GIB, 2),
        round_to(ram.used as f64 / ram.total as f64 * 100.0, 2),
    )
}

/// Agents hand back some interface names as `0x`-prefixed hex.
pub fn decode_interface_name(raw: &str) -> String {
    let Some(hex) = raw.strip_prefix("0x") else {
        return raw.to_string();
    };
    let bytes: Option<Vec<u8>> = (0..hex.len())
        .step_by(2)
        .map(|i| hex.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect();

    match bytes {
        Some(bytes) => String::from_utf8_lossy(&bytes)
            .trim_end_matches('\0')
            .to_string(),
        None => raw.to_string(),
    }
}
