use crate::collector::ScrapeReport;
use crate::devices::DeviceRegistry;
use crate::models::DeviceIdentity;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Serialize)]
pub struct ExporterHealth {
    pub uptime_seconds: u64,
    pub scrapes_total: u64,
    pub last_scrape: Option<LastScrape>,
    pub devices: Vec<DeviceIdentity>,
}

#[derive(Debug, Serialize)]
pub struct LastScrape {
    pub seconds_ago: u64,
    pub duration_seconds: f64,
    pub failed_devices: usize,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    scrapes: Arc<AtomicU64>,
    last_scrape: Arc<Mutex<Option<(Instant, ScrapeReport)>>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            scrapes: Arc::new(AtomicU64::new(0)),
            last_scrape: Arc::new(Mutex::new(None)),
        }
    }

    pub fn record_scrape(&self, report: ScrapeReport) {
        self.scrapes.fetch_add(1, Ordering::Relaxed);
        *self.last_scrape.lock() = Some((Instant::now(), report));
    }

    pub fn get_health(&self, devices: &DeviceRegistry) -> ExporterHealth {
        let last = *self.last_scrape.lock();
        let last_scrape = last.map(|(at, report)| LastScrape {
            seconds_ago: at.elapsed().as_secs(),
            duration_seconds: report.elapsed.as_secs_f64(),
            failed_devices: report.failures,
        });

        ExporterHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            scrapes_total: self.scrapes.load(Ordering::Relaxed),
            last_scrape,
            devices: devices.devices().to_vec(),
        }
    }
}
