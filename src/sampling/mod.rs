use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

pub mod cache;
pub mod local;
pub mod rate;
pub mod remote;
pub mod snmp;

use cache::SamplingCache;
use local::LocalSource;
use remote::RemoteSource;

/// One device reading. Produced fresh each cycle, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sample {
    pub reachable: bool,
    pub cpu_percent: f64,
    pub mem_total_gb: f64,
    pub mem_used_gb: f64,
    pub mem_percent: f64,
    pub rx_mbps: f64,
    pub tx_mbps: f64,
    /// Host uptime, when the source can report it.
    pub uptime_secs: Option<u64>,
}

impl Sample {
    /// All-zero reading of a target that did not answer.
    pub fn unreachable() -> Self {
        Sample::default()
    }
}

/// Where a device's readings come from, decided once from its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleTarget {
    /// This host, read from OS counters.
    Local,
    /// Another host, read over the counter-query protocol.
    Remote(String),
}

impl SampleTarget {
    pub fn for_address(address: &str) -> Self {
        if is_loopback(address) {
            SampleTarget::Local
        } else {
            SampleTarget::Remote(address.trim().to_string())
        }
    }
}

/// True for addresses that name this host.
pub fn is_loopback(address: &str) -> bool {
    let address = address.trim();
    address.eq_ignore_ascii_case("localhost")
        || address
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
}

/// Both sample sources plus the counter baselines they share.
pub struct Sampler {
    local: LocalSource,
    remote: RemoteSource,
    cache: Arc<SamplingCache>,
}

impl Sampler {
    pub fn new(local: LocalSource, remote: RemoteSource, cache: Arc<SamplingCache>) -> Self {
        Sampler {
            local,
            remote,
            cache,
        }
    }

    pub fn cache(&self) -> &SamplingCache {
        &self.cache
    }

    pub fn remote(&self) -> &RemoteSource {
        &self.remote
    }

    pub async fn sample(&self, target: &SampleTarget) -> Sample {
        self.sample_at(target, Instant::now()).await
    }

    /// Sample `target`, deriving rates against baselines as of `now`.
    pub async fn sample_at(&self, target: &SampleTarget, now: Instant) -> Sample {
        match target {
            SampleTarget::Local => self.local.sample(&self.cache, now).await,
            SampleTarget::Remote(address) => self.remote.sample(address, &self.cache, now).await,
        }
    }
}
