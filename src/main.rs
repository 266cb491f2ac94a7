mod alerts;
mod api;
mod config;
mod discovery;
mod engine;
mod error;
mod inventory;
mod ping;
mod sampling;
mod ws;

#[cfg(test)]
mod testing;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::alerts::AlertLog;
use crate::config::Config;
use crate::discovery::ArpScanner;
use crate::engine::Engine;
use crate::inventory::Inventory;
use crate::sampling::cache::SamplingCache;
use crate::sampling::local::LocalSource;
use crate::sampling::remote::RemoteSource;
use crate::sampling::snmp::SnmpWalker;
use crate::sampling::Sampler;
use crate::ws::WsEvent;

// ─── App State ───────────────────────────────────────────────────────────────

pub struct AppState {
    pub engine: Arc<Engine>,
}

// ─── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // Logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netwatch=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("=== Network monitor starting ===");

    let config = Config::from_env();
    tracing::info!(
        "SNMP community '{}' on port {}, walk timeout {:?}",
        config.snmp.community,
        config.snmp.port,
        config.snmp.walk_timeout
    );

    // WebSocket broadcast channel
    let (event_tx, _) = broadcast::channel::<WsEvent>(256);

    let walker = Arc::new(SnmpWalker::new(
        &config.snmp.community,
        config.snmp.port,
        config.snmp.query_timeout,
        config.snmp.walk_timeout,
    ));
    let sampler = Sampler::new(
        LocalSource::new(),
        RemoteSource::new(walker, config.snmp.walk_timeout),
        Arc::new(SamplingCache::new()),
    );
    let engine = Arc::new(Engine::new(
        Arc::new(Inventory::new()),
        Arc::new(AlertLog::new(config.alert_capacity)),
        sampler,
        Arc::new(ArpScanner::new()),
        config.thresholds,
        event_tx,
    ));
    engine.bootstrap();

    if let Some(every) = config.sample_interval {
        spawn_sampler(engine.clone(), every);
    }
    if let Some(every) = config.scan_interval {
        spawn_scanner(engine.clone(), every);
    }

    let state = Arc::new(AppState { engine });
    let app = api::build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Sample every device on a fixed tick. A slow cycle delays the next tick
/// instead of overlapping with it.
fn spawn_sampler(engine: Arc<Engine>, every: Duration) {
    tracing::info!("Background sampling every {:?}", every);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            engine.run_cycle().await;
        }
    });
}

fn spawn_scanner(engine: Arc<Engine>, every: Duration) {
    tracing::info!("Background LAN scan every {:?}", every);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = engine.scan_and_reconcile().await {
                tracing::warn!("Scheduled LAN scan failed: {}", e);
            }
        }
    });
}
