use std::io;
use thiserror::Error;

/// Failures the monitoring core surfaces to its callers.
///
/// Unreachable targets are not errors: they come back as an offline
/// sample. Only lookups, bad input and scan setup problems end up here.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Alert not found: {0}")]
    AlertNotFound(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("LAN scan failed: {0}")]
    Scan(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    pub fn scan<S: Into<String>>(msg: S) -> Self {
        MonitorError::Scan(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            MonitorError::DeviceNotFound(_) | MonitorError::AlertNotFound(_)
        )
    }
}
