//! Pull interface consumed by `/metrics`
//!
//! Every `collect` runs a full device pass before gathering, so the reply
//! always carries the values of this scrape (or the stale ones of a device
//! that just failed). Overlapping scrapes queue on `scrape_lock`.

use crate::collector::Collector;
use crate::devices::DeviceRegistry;
use crate::fetcher::DeviceFetcher;
use crate::health::HealthTracker;
use crate::store::MeasurementStore;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("exposition is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub struct Exporter {
    collector: Collector,
    store: MeasurementStore,
    health: HealthTracker,
    scrape_lock: Mutex<()>,
}

impl Exporter {
    pub fn new(
        devices: DeviceRegistry,
        fetcher: Arc<dyn DeviceFetcher>,
        health: HealthTracker,
    ) -> Result<Self, ExporterError> {
        let store = MeasurementStore::new()?;
        store.seed(&devices);
        Ok(Self {
            collector: Collector::new(devices, fetcher, store.clone()),
            store,
            health,
            scrape_lock: Mutex::new(()),
        })
    }

    /// Descriptor of the per-scrape duration. The gauge vectors carry their
    /// own descriptors in the store registry.
    pub fn describe(&self) -> Vec<&Desc> {
        self.store.duration_desc()
    }

    /// Runs a device pass and returns every metric family.
    pub async fn collect(&self) -> Vec<MetricFamily> {
        let _guard = self.scrape_lock.lock().await;

        let report = self.collector.collect().await;
        self.store.set_duration(report.elapsed);
        self.health.record_scrape(report);
        debug!(
            "scrape done in {:.3}s ({} devices, {} failed)",
            report.elapsed.as_secs_f64(),
            report.devices,
            report.failures
        );

        self.store.gather()
    }

    /// `collect` rendered in the text exposition format.
    pub async fn render(&self) -> Result<String, ExporterError> {
        let families = self.collect().await;
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn devices(&self) -> &DeviceRegistry {
        self.collector.devices()
    }
}
