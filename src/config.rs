use std::str::FromStr;
use std::time::Duration;

use crate::engine::state::Thresholds;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_COMMUNITY: &str = "public";
const DEFAULT_SNMP_PORT: u16 = 161;
const DEFAULT_QUERY_TIMEOUT_MS: u64 = 3000;
const DEFAULT_WALK_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 5;
const DEFAULT_ALERT_CAPACITY: usize = 100;

/// Counter-query transport settings
#[derive(Debug, Clone)]
pub struct SnmpConfig {
    pub community: String,
    pub port: u16,
    /// Bound on a single request/response exchange.
    pub query_timeout: Duration,
    /// Bound on a whole column walk; a slow walk fails only its own device.
    pub walk_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub snmp: SnmpConfig,
    /// `None` disables the background sampler.
    pub sample_interval: Option<Duration>,
    /// `None` means LAN scans only run on demand.
    pub scan_interval: Option<Duration>,
    pub alert_capacity: usize,
    pub thresholds: Thresholds,
}

impl Config {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Thresholds::default();

        Config {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            snmp: SnmpConfig {
                community: lookup("SNMP_COMMUNITY")
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| DEFAULT_COMMUNITY.to_string()),
                port: parse_or(&lookup, "SNMP_PORT", DEFAULT_SNMP_PORT),
                query_timeout: Duration::from_millis(parse_or(
                    &lookup,
                    "SNMP_TIMEOUT_MS",
                    DEFAULT_QUERY_TIMEOUT_MS,
                )),
                walk_timeout: Duration::from_millis(parse_or(
                    &lookup,
                    "SNMP_WALK_TIMEOUT_MS",
                    DEFAULT_WALK_TIMEOUT_MS,
                )),
            },
            sample_interval: interval(parse_or(
                &lookup,
                "SAMPLE_INTERVAL_SECS",
                DEFAULT_SAMPLE_INTERVAL_SECS,
            )),
            scan_interval: interval(parse_or(&lookup, "SCAN_INTERVAL_SECS", 0)),
            alert_capacity: parse_or(&lookup, "ALERT_CAPACITY", DEFAULT_ALERT_CAPACITY).max(1),
            thresholds: Thresholds {
                cpu_percent: parse_or(&lookup, "CPU_WARN_PERCENT", defaults.cpu_percent),
                memory_percent: parse_or(&lookup, "MEMORY_WARN_PERCENT", defaults.memory_percent),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn interval(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
            default
        }),
        None => default,
    }
}
