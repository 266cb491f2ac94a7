use snmp::{ObjIdBuf, SyncSession, Value};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Well-known table columns queried on remote targets.
pub mod oid {
    /// hrProcessorLoad
    pub const PROCESSOR_LOAD: &[u32] = &[1, 3, 6, 1, 2, 1, 25, 3, 3, 1, 2];
    /// hrStorageType
    pub const STORAGE_TYPE: &[u32] = &[1, 3, 6, 1, 2, 1, 25, 2, 3, 1, 2];
    /// hrStorageAllocationUnits
    pub const STORAGE_UNITS: &[u32] = &[1, 3, 6, 1, 2, 1, 25, 2, 3, 1, 4];
    /// hrStorageSize
    pub const STORAGE_SIZE: &[u32] = &[1, 3, 6, 1, 2, 1, 25, 2, 3, 1, 5];
    /// hrStorageUsed
    pub const STORAGE_USED: &[u32] = &[1, 3, 6, 1, 2, 1, 25, 2, 3, 1, 6];
    /// hrStorageRam, the storage type of physical memory rows
    pub const STORAGE_RAM: &[u32] = &[1, 3, 6, 1, 2, 1, 25, 2, 1, 2];
    /// ifDescr
    pub const IF_DESCR: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 2];
    /// ifOperStatus
    pub const IF_OPER_STATUS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 8];
    /// ifInOctets
    pub const IF_IN_OCTETS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 10];
    /// ifOutOctets
    pub const IF_OUT_OCTETS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 16];
    /// sysUpTime
    pub const SYS_UPTIME: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 3];

    /// ifOperStatus value for an interface that is up
    pub const IF_STATUS_UP: u64 = 1;
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalkError {
    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// A value read from a counter table, detached from the wire buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum CounterValue {
    Integer(i64),
    Unsigned(u64),
    ObjectId(Vec<u32>),
    Text(String),
    Other,
}

impl CounterValue {
    /// Numeric view of the value. Text is accepted when it parses cleanly;
    /// anything else is a malformed row for numeric columns.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CounterValue::Integer(v) => Some(*v),
            CounterValue::Unsigned(v) => i64::try_from(*v).ok(),
            CounterValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            CounterValue::Integer(v) => u64::try_from(*v).ok(),
            CounterValue::Unsigned(v) => Some(*v),
            CounterValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_object_id(&self, expected: &[u32]) -> bool {
        match self {
            CounterValue::ObjectId(id) => id == expected,
            _ => false,
        }
    }

    fn from_wire(value: &Value<'_>) -> Self {
        match value {
            Value::Integer(v) => CounterValue::Integer(*v),
            Value::Counter32(v) | Value::Unsigned32(v) | Value::Timeticks(v) => {
                CounterValue::Unsigned(u64::from(*v))
            }
            Value::Counter64(v) => CounterValue::Unsigned(*v),
            Value::OctetString(bytes) => {
                CounterValue::Text(String::from_utf8_lossy(bytes).into_owned())
            }
            Value::ObjectIdentifier(id) => {
                let mut buf = [0u32; 128];
                match id.read_name(&mut buf) {
                    Ok(name) => CounterValue::ObjectId(name.to_vec()),
                    Err(_) => CounterValue::Other,
                }
            }
            _ => CounterValue::Other,
        }
    }
}

/// One row of a walked column: the row index and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterRow {
    pub index: u32,
    pub value: CounterValue,
}

impl CounterRow {
    pub fn new(index: u32, value: CounterValue) -> Self {
        CounterRow { index, value }
    }
}

/// Transport for remote counter tables.
/// `walk()` blocks on the network; only call it from `spawn_blocking`.
pub trait CounterWalker: Send + Sync {
    /// Return every row under `column` on `target`. An error means the
    /// target gave no usable answer at all; an agent-side error after some
    /// rows ends the walk with what was collected.
    fn walk(&self, target: &str, column: &[u32]) -> Result<Vec<CounterRow>, WalkError>;
}

/// SNMPv2c column walker over UDP
pub struct SnmpWalker {
    community: Vec<u8>,
    port: u16,
    timeout: Duration,
    walk_budget: Duration,
}

impl SnmpWalker {
    /// `timeout` bounds each request; `walk_budget` bounds the whole walk so
    /// the blocking thread is released even if the caller stopped waiting.
    pub fn new(community: &str, port: u16, timeout: Duration, walk_budget: Duration) -> Self {
        SnmpWalker {
            community: community.as_bytes().to_vec(),
            port,
            timeout,
            walk_budget,
        }
    }
}

impl CounterWalker for SnmpWalker {
    fn walk(&self, target: &str, column: &[u32]) -> Result<Vec<CounterRow>, WalkError> {
        let deadline = Instant::now() + self.walk_budget;
        let mut session = SyncSession::new(
            (target, self.port),
            &self.community,
            Some(self.timeout),
            0,
        )
        .map_err(|e| WalkError::Transport(e.to_string()))?;

        let mut rows = Vec::new();
        let mut cursor = column.to_vec();

        loop {
            if Instant::now() >= deadline {
                if rows.is_empty() {
                    return Err(WalkError::Timeout(self.walk_budget));
                }
                tracing::debug!("SNMP walk on {} hit its deadline after {} row(s)", target, rows.len());
                break;
            }

            let pdu = match session.getnext(&cursor) {
                Ok(pdu) => pdu,
                Err(e) if rows.is_empty() => {
                    return Err(WalkError::Transport(format!("{:?}", e)));
                }
                Err(e) => {
                    tracing::debug!("SNMP walk on {} cut short: {:?}", target, e);
                    break;
                }
            };

            if pdu.error_status != 0 {
                tracing::debug!(
                    "SNMP agent {} returned error status {}",
                    target,
                    pdu.error_status
                );
                break;
            }

            let mut answered = false;
            let mut next = None;
            // Exception values (endOfMibView and friends) do not decode, so
            // the varbind iterator simply ends on them.
            for (name, value) in pdu.varbinds {
                answered = true;
                let mut buf: ObjIdBuf = [0u32; 128];
                let Ok(name) = name.read_name(&mut buf) else {
                    break;
                };
                let in_column = name.len() > column.len() && name.starts_with(column);
                // GET-NEXT must move forward; anything else would never end.
                if !in_column || name <= cursor.as_slice() {
                    break;
                }

                if let Some(&index) = name.last() {
                    rows.push(CounterRow::new(index, CounterValue::from_wire(&value)));
                }
                next = Some(name.to_vec());
            }

            if !answered && rows.is_empty() {
                return Err(WalkError::Protocol("empty response".to_string()));
            }
            match next {
                Some(name) => cursor = name,
                None => break,
            }
        }

        Ok(rows)
    }
}
