use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Instant;

use super::rate::rate_mbps;

/// Which counter baseline a reading belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The host's own interfaces; one baseline whatever the target text.
    LocalNetwork,
    /// Interface octets of a remote target, keyed by its address.
    Remote(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub raw_rx: u64,
    pub raw_tx: u64,
    pub sampled_at: Instant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Throughput {
    pub rx_mbps: f64,
    pub tx_mbps: f64,
}

/// Baselines kept at most; ad-hoc targets would otherwise grow the map forever.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Last raw counters per baseline key.
///
/// Each `advance` reads and replaces one entry under a single lock, so two
/// samples of the same target can never interleave their read and write.
/// Once full, a new key evicts the least recently sampled one.
#[derive(Debug)]
pub struct SamplingCache {
    capacity: usize,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl SamplingCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        SamplingCache {
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record fresh counters for `key` and return the rate since the
    /// previous reading. The first reading for a key only sets the baseline.
    pub fn advance(&self, key: CacheKey, raw_rx: u64, raw_tx: u64, now: Instant) -> Throughput {
        let entry = CacheEntry {
            raw_rx,
            raw_tx,
            sampled_at: now,
        };
        let previous = {
            let mut entries = self.entries.lock();
            if !entries.contains_key(&key) && entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.sampled_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
            entries.insert(key, entry)
        };

        match previous {
            Some(prev) => {
                let elapsed = now.checked_duration_since(prev.sampled_at);
                Throughput {
                    rx_mbps: rate_mbps(prev.raw_rx, raw_rx, elapsed),
                    tx_mbps: rate_mbps(prev.raw_tx, raw_tx, elapsed),
                }
            }
            None => Throughput::default(),
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.lock().get(key).copied()
    }

    /// Drop the baseline of a target that is no longer monitored.
    pub fn forget(&self, key: &CacheKey) {
        self.entries.lock().remove(key);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl Default for SamplingCache {
    fn default() -> Self {
        Self::new()
    }
}
