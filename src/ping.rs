use serde::Serialize;
use std::io;
use std::time::Duration;
use tokio::process::Command;
use which::which;

use crate::error::{MonitorError, Result};

const ECHO_COUNT: &str = "4";
const PING_TIMEOUT: Duration = Duration::from_secs(10);
const OUTPUT_LINES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PingOutcome {
    pub success: bool,
    pub output: Vec<String>,
}

/// Run the system `ping` against `address` and keep the summary lines.
pub async fn ping(address: &str) -> Result<PingOutcome> {
    if !is_valid_target(address) {
        return Err(MonitorError::InvalidAddress(address.to_string()));
    }

    let binary = which("ping").map_err(|_| {
        MonitorError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            "ping binary not found in PATH",
        ))
    })?;
    let count_flag = if cfg!(windows) { "-n" } else { "-c" };

    let output = Command::new(binary)
        .args([count_flag, ECHO_COUNT, address])
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(PING_TIMEOUT, output).await {
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            Ok(PingOutcome {
                success: output.status.success(),
                output: last_lines(&stdout, OUTPUT_LINES),
            })
        }
        Ok(Err(e)) => Err(e.into()),
        Err(_) => {
            tracing::debug!("ping {} timed out after {:?}", address, PING_TIMEOUT);
            Ok(PingOutcome {
                success: false,
                output: vec!["Request timed out.".to_string()],
            })
        }
    }
}

/// Addresses and host names only; nothing that `ping` could read as a flag.
fn is_valid_target(address: &str) -> bool {
    !address.is_empty()
        && !address.starts_with('-')
        && address
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'))
}

fn last_lines(text: &str, n: usize) -> Vec<String> {
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].iter().map(|l| l.to_string()).collect()
}
