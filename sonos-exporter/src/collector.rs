use crate::devices::DeviceRegistry;
use crate::diagnostics::{extract_support_text, parse};
use crate::fetcher::DeviceFetcher;
use crate::store::MeasurementStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Outcome of one pass over every device.
#[derive(Debug, Clone, Copy)]
pub struct ScrapeReport {
    pub elapsed: Duration,
    pub devices: usize,
    pub failures: usize,
}

/// Walks the registry, fetching and parsing each device in turn.
pub struct Collector {
    devices: DeviceRegistry,
    fetcher: Arc<dyn DeviceFetcher>,
    store: MeasurementStore,
}

impl Collector {
    pub fn new(devices: DeviceRegistry, fetcher: Arc<dyn DeviceFetcher>, store: MeasurementStore) -> Self {
        Self { devices, fetcher, store }
    }

    /// One device failing never stops the others.
    pub async fn collect(&self) -> ScrapeReport {
        let start = Instant::now();
        let mut failures = 0;

        for device in self.devices.iter() {
            match self.fetcher.fetch_diagnostics(&device.host).await {
                Ok(body) => {
                    let status = parse(&extract_support_text(&body));
                    debug!("{} ({}): {:?}", device.label(), device.host, status);
                    self.store.record(device, &status);
                }
                Err(e) => {
                    warn!("diagnostics fetch failed for {} ({}): {}", device.label(), device.host, e);
                    self.store.mark_failed(device);
                    failures += 1;
                }
            }
        }

        ScrapeReport {
            elapsed: start.elapsed(),
            devices: self.devices.len(),
            failures,
        }
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }
}
