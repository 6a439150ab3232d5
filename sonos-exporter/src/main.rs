/**
 * SONOS EXPORTER - entry point
 *
 * Boot order: .env, logging, config, one-time identity resolution of every
 * player, then the HTTP listener. Devices are only queried again when
 * Prometheus scrapes /metrics.
 */

mod collector;
mod config;
mod devices;
mod diagnostics;
mod exporter;
mod fetcher;
mod health;
mod http;
mod models;
mod store;

use crate::config::load_config;
use crate::devices::DeviceRegistry;
use crate::exporter::Exporter;
use crate::fetcher::HttpFetcher;
use crate::health::HealthTracker;
use crate::http::AppState;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = load_config().await;
    info!(
        "sonos-exporter v{} starting ({} hosts, device port {}, timeout {:?})",
        env!("CARGO_PKG_VERSION"),
        cfg.hosts.len(),
        cfg.device_port,
        cfg.fetch_timeout()
    );

    let fetcher = Arc::new(
        HttpFetcher::new(cfg.device_port, cfg.fetch_timeout())
            .context("Failed to build device HTTP client")?,
    );

    let devices = DeviceRegistry::build(&cfg.hosts, fetcher.as_ref()).await;
    if devices.is_empty() {
        warn!("no hosts configured, /metrics will only report the scrape duration");
    }
    for device in devices.iter() {
        if device.is_resolved() {
            info!("device {:<16} room={:?} model={:?}", device.host, device.room_name, device.model_name);
        } else {
            warn!("device {:<16} unresolved, labelled by address", device.host);
        }
    }

    let health_tracker = HealthTracker::new();
    let exporter = Exporter::new(devices, fetcher, health_tracker.clone())
        .context("Failed to register metrics")?;
    for desc in exporter.describe() {
        info!("collector metric {}: {}", desc.fq_name, desc.help);
    }

    let app = http::build_router(AppState {
        exporter: Arc::new(exporter),
        health_tracker,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.listen_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("listening on http://{}/metrics", addr);

    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}
