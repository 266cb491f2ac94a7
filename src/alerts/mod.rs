use chrono::Local;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use crate::error::{MonitorError, Result};

pub const DEFAULT_CAPACITY: usize = 100;

/// Protocol identifiers attached to alerts, by condition.
pub mod tags {
    pub const UNREACHABLE: &str = "1.3.6.1.4.1.9.9.43.1.1.6.1.3";
    pub const HIGH_CPU: &str = "1.3.6.1.4.1.9.2.1.56";
    pub const HIGH_MEMORY: &str = "1.3.6.1.4.1.9.9.48.1.1.1.6";
    pub const LIFECYCLE: &str = "1.3.6.1.6.3.1.1.5.4";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub timestamp: String,
    pub severity: Severity,
    pub source: String,
    pub message: String,
    pub acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
}

/// An alert the engine wants recorded; the log assigns id and time.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRequest {
    pub severity: Severity,
    pub source: String,
    pub message: String,
    pub tag: Option<String>,
}

impl AlertRequest {
    pub fn new(severity: Severity, source: impl Into<String>, message: impl Into<String>) -> Self {
        AlertRequest {
            severity,
            source: source.into(),
            message: message.into(),
            tag: None,
        }
    }

    pub fn tagged(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }
}

/// Bounded alert history, newest first. Oldest entries are evicted once
/// the capacity is exceeded; nothing is ever removed individually.
#[derive(Debug)]
pub struct AlertLog {
    capacity: usize,
    entries: Mutex<VecDeque<Alert>>,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        AlertLog {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(&self, request: AlertRequest) -> Alert {
        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            severity: request.severity,
            source: request.source,
            message: request.message,
            acknowledged: false,
            oid: request.tag,
        };

        let mut entries = self.entries.lock();
        entries.push_front(alert.clone());
        entries.truncate(self.capacity);
        alert
    }

    pub fn acknowledge(&self, id: &str) -> Result<Alert> {
        let mut entries = self.entries.lock();
        let alert = entries
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| MonitorError::AlertNotFound(id.to_string()))?;
        alert.acknowledged = true;
        Ok(alert.clone())
    }

    /// Returns how many alerts were newly acknowledged.
    pub fn acknowledge_all(&self) -> usize {
        let mut entries = self.entries.lock();
        let mut flipped = 0;
        for alert in entries.iter_mut().filter(|a| !a.acknowledged) {
            alert.acknowledged = true;
            flipped += 1;
        }
        flipped
    }

    pub fn list(&self) -> Vec<Alert> {
        self.entries.lock().iter().cloned().collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn unacknowledged_critical(&self) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|a| a.severity == Severity::Critical && !a.acknowledged)
            .count()
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(i: usize) -> AlertRequest {
        AlertRequest::new(Severity::Info, "test", format!("alert {}", i))
    }

    #[test]
    fn log_is_bounded_and_newest_first() {
        let log = AlertLog::default();
        for i in 0..150 {
            log.record(note(i));
        }

        let alerts = log.list();
        assert_eq!(alerts.len(), 100);
        assert_eq!(alerts[0].message, "alert 149");
        assert_eq!(alerts[99].message, "alert 50");
    }

    #[test]
    fn record_fills_in_id_time_and_tag() {
        let log = AlertLog::default();
        let alert = log.record(
            AlertRequest::new(Severity::Critical, "core (10.0.0.1)", "down").tagged(tags::UNREACHABLE),
        );

        assert!(!alert.id.is_empty());
        assert_eq!(alert.timestamp.len(), "2024-01-01 00:00:00".len());
        assert!(!alert.acknowledged);
        assert_eq!(alert.oid.as_deref(), Some(tags::UNREACHABLE));
        assert_eq!(log.unacknowledged_critical(), 1);
    }

    #[test]
    fn acknowledge_flips_flag_in_place() {
        let log = AlertLog::default();
        let alert = log.record(AlertRequest::new(Severity::Critical, "x", "down"));

        let acked = log.acknowledge(&alert.id).unwrap();
        assert!(acked.acknowledged);
        assert!(log.list()[0].acknowledged);
        assert_eq!(log.unacknowledged_critical(), 0);
    }

    #[test]
    fn acknowledging_unknown_alert_is_not_found() {
        let log = AlertLog::default();
        log.record(note(1));
        assert!(matches!(
            log.acknowledge("nope"),
            Err(MonitorError::AlertNotFound(_))
        ));
    }

    #[test]
    fn acknowledge_all_counts_newly_acknowledged() {
        let log = AlertLog::new(10);
        let first = log.record(note(1));
        log.record(note(2));
        log.record(note(3));
        log.acknowledge(&first.id).unwrap();

        assert_eq!(log.acknowledge_all(), 2);
        assert!(log.list().iter().all(|a| a.acknowledged));
        assert_eq!(log.acknowledge_all(), 0);
    }

    #[test]
    fn alert_serializes_without_empty_oid() {
        let log = AlertLog::default();
        let alert = log.record(AlertRequest::new(Severity::Warning, "x", "hot"));
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["severity"], "warning");
        assert!(json.get("oid").is_none());
    }
}
