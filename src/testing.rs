//! In-memory stand-ins for the network-facing seams.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::alerts::AlertLog;
use crate::discovery::{DiscoveryResult, LanScanner};
use crate::engine::state::Thresholds;
use crate::engine::Engine;
use crate::error::{MonitorError, Result};
use crate::inventory::Inventory;
use crate::sampling::cache::SamplingCache;
use crate::sampling::local::LocalSource;
use crate::sampling::remote::RemoteSource;
use crate::sampling::snmp::{oid, CounterRow, CounterValue, CounterWalker, WalkError};
use crate::sampling::Sampler;

/// Scripted counter tables keyed by target and column. Columns that were
/// never set walk as empty.
#[derive(Default)]
pub struct FakeWalker {
    columns: Mutex<HashMap<(String, Vec<u32>), Vec<CounterRow>>>,
    unreachable: Mutex<HashSet<String>>,
    failing_columns: Mutex<HashSet<(String, Vec<u32>)>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl FakeWalker {
    pub fn set_column(&self, target: &str, column: &[u32], rows: Vec<CounterRow>) {
        self.columns
            .lock()
            .insert((target.to_string(), column.to_vec()), rows);
    }

    pub fn set_unreachable(&self, target: &str, unreachable: bool) {
        let mut set = self.unreachable.lock();
        if unreachable {
            set.insert(target.to_string());
        } else {
            set.remove(target);
        }
    }

    /// Make one column on `target` fail while the rest still answer.
    pub fn fail_column(&self, target: &str, column: &[u32]) {
        self.failing_columns
            .lock()
            .insert((target.to_string(), column.to_vec()));
    }

    /// Every walk against `target` blocks this long before answering.
    pub fn set_delay(&self, target: &str, delay: Duration) {
        self.delays.lock().insert(target.to_string(), delay);
    }

    pub fn set_load(&self, target: &str, loads: &[i64]) {
        let rows = loads
            .iter()
            .enumerate()
            .map(|(i, load)| CounterRow::new(196_608 + i as u32, CounterValue::Integer(*load)))
            .collect();
        self.set_column(target, oid::PROCESSOR_LOAD, rows);
    }

    /// One physical-memory storage row at index 1.
    pub fn set_ram(&self, target: &str, units: i64, size: i64, used: i64) {
        let row = |value| vec![CounterRow::new(1, value)];
        self.set_column(target, oid::STORAGE_TYPE, row(CounterValue::ObjectId(oid::STORAGE_RAM.to_vec())));
        self.set_column(target, oid::STORAGE_UNITS, row(CounterValue::Integer(units)));
        self.set_column(target, oid::STORAGE_SIZE, row(CounterValue::Integer(size)));
        self.set_column(target, oid::STORAGE_USED, row(CounterValue::Integer(used)));
    }

    pub fn set_uptime(&self, target: &str, ticks: u64) {
        self.set_column(target, oid::SYS_UPTIME, vec![CounterRow::new(0, CounterValue::Unsigned(ticks))]);
    }

    /// Insert or replace one interface row across the status and octet columns.
    pub fn set_interface(&self, target: &str, index: u32, up: bool, rx: u64, tx: u64) {
        let status = if up { oid::IF_STATUS_UP as i64 } else { 2 };
        self.upsert(target, oid::IF_OPER_STATUS, CounterRow::new(index, CounterValue::Integer(status)));
        self.upsert(target, oid::IF_IN_OCTETS, CounterRow::new(index, CounterValue::Unsigned(rx)));
        self.upsert(target, oid::IF_OUT_OCTETS, CounterRow::new(index, CounterValue::Unsigned(tx)));
    }

    fn upsert(&self, target: &str, column: &[u32], row: CounterRow) {
        let mut columns = self.columns.lock();
        let rows = columns
            .entry((target.to_string(), column.to_vec()))
            .or_default();
        rows.retain(|r| r.index != row.index);
        rows.push(row);
        rows.sort_by_key(|r| r.index);
    }
}

impl CounterWalker for FakeWalker {
    fn walk(&self, target: &str, column: &[u32]) -> std::result::Result<Vec<CounterRow>, WalkError> {
        let delay = self.delays.lock().get(target).copied();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if self.unreachable.lock().contains(target) {
            return Err(WalkError::Timeout(Duration::from_millis(1)));
        }
        if self
            .failing_columns
            .lock()
            .contains(&(target.to_string(), column.to_vec()))
        {
            return Err(WalkError::Transport("column walk failed".into()));
        }
        Ok(self
            .columns
            .lock()
            .get(&(target.to_string(), column.to_vec()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Scanner that returns a fixed result set, or fails when asked to.
#[derive(Default)]
pub struct FakeScanner {
    results: Vec<DiscoveryResult>,
    fail: bool,
}

impl FakeScanner {
    pub fn with_results(results: Vec<DiscoveryResult>) -> Self {
        FakeScanner {
            results,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        FakeScanner {
            results: Vec::new(),
            fail: true,
        }
    }
}

impl LanScanner for FakeScanner {
    fn scan(&self) -> Result<Vec<DiscoveryResult>> {
        if self.fail {
            return Err(MonitorError::scan("no IPv4 interface"));
        }
        Ok(self.results.clone())
    }
}

pub fn test_engine(walker: Arc<FakeWalker>, scanner: Arc<dyn LanScanner>) -> Engine {
    let sampler = Sampler::new(
        LocalSource::default(),
        RemoteSource::new(walker, Duration::from_secs(2)),
        Arc::new(SamplingCache::new()),
    );
    let (event_tx, _) = broadcast::channel(64);
    Engine::new(
        Arc::new(Inventory::new()),
        Arc::new(AlertLog::default()),
        sampler,
        scanner,
        Thresholds::default(),
        event_tx,
    )
}
