//! Shared measurement state
//!
//! One `MeasurementStore` is created at startup and cloned into the collector
//! and the exporter. Clones share the same registry and gauges; every gauge
//! write is atomic but a scrape as a whole is not.

use crate::devices::DeviceRegistry;
use crate::models::{DeviceIdentity, DiagnosticStatus, CHAINS};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, IntGaugeVec, Opts, Registry};
use std::time::Duration;

const CHAIN_LABELS: [&str; CHAINS] = ["0", "1", "2"];

#[derive(Clone)]
pub struct MeasurementStore {
    registry: Registry,
    noise: IntGaugeVec,
    ani: IntGaugeVec,
    collection_error: IntGaugeVec,
    device_info: IntGaugeVec,
    duration: Gauge,
}

impl MeasurementStore {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let noise = IntGaugeVec::new(
            Opts::new("sonos_noise", "Noise for Sonos ctl"),
            &["host", "ctl"],
        )?;
        let ani = IntGaugeVec::new(Opts::new("sonos_ani", "AnI value for Sonos ctl"), &["host"])?;
        let collection_error = IntGaugeVec::new(
            Opts::new(
                "sonos_collection_error",
                "1 if the last diagnostics fetch for the device failed",
            ),
            &["host"],
        )?;
        let device_info = IntGaugeVec::new(
            Opts::new("sonos_device_info", "Static identity of a Sonos device"),
            &["host", "ip", "model", "serial", "software_version"],
        )?;
        let duration = Gauge::new("sonos_collection_duration", "Total collection time")?;

        registry.register(Box::new(noise.clone()))?;
        registry.register(Box::new(ani.clone()))?;
        registry.register(Box::new(collection_error.clone()))?;
        registry.register(Box::new(device_info.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            noise,
            ani,
            collection_error,
            device_info,
            duration,
        })
    }

    /// Creates every per-device series at zero so that a device failing its
    /// first scrape is still reported.
    pub fn seed(&self, devices: &DeviceRegistry) {
        for device in devices.iter() {
            let label = device.label();
            for chain in CHAIN_LABELS {
                self.noise.with_label_values(&[label, chain]);
            }
            self.ani.with_label_values(&[label]);
            self.collection_error.with_label_values(&[label]);
            self.device_info
                .with_label_values(&[
                    label,
                    &device.host,
                    &device.model_name,
                    &device.serial_num,
                    &device.software_version,
                ])
                .set(1);
        }
    }

    /// Stores a successful reading and clears the device error flag.
    pub fn record(&self, device: &DeviceIdentity, status: &DiagnosticStatus) {
        let label = device.label();
        for (chain, value) in CHAIN_LABELS.into_iter().zip(status.noise) {
            self.noise.with_label_values(&[label, chain]).set(value);
        }
        self.ani.with_label_values(&[label]).set(status.ani);
        self.collection_error.with_label_values(&[label]).set(0);
    }

    /// Flags a failed fetch. Previous readings are left in place.
    pub fn mark_failed(&self, device: &DeviceIdentity) {
        self.collection_error.with_label_values(&[device.label()]).set(1);
    }

    pub fn set_duration(&self, elapsed: Duration) {
        self.duration.set(elapsed.as_secs_f64());
    }

    pub fn duration_desc(&self) -> Vec<&Desc> {
        self.duration.desc()
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

#[cfg(test)]
impl MeasurementStore {
    pub fn noise(&self, label: &str, chain: usize) -> i64 {
        self.noise.with_label_values(&[label, CHAIN_LABELS[chain]]).get()
    }

    pub fn ani(&self, label: &str) -> i64 {
        self.ani.with_label_values(&[label]).get()
    }

    pub fn collection_error(&self, label: &str) -> i64 {
        self.collection_error.with_label_values(&[label]).get()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kitchen() -> DeviceIdentity {
        DeviceIdentity {
            room_name: "Kitchen".into(),
            model_name: "Sonos One".into(),
            ..DeviceIdentity::unresolved("10.0.0.87")
        }
    }

    fn family<'a>(families: &'a [MetricFamily], name: &str) -> Option<&'a MetricFamily> {
        families.iter().find(|f| f.get_name() == name)
    }

    #[test]
    fn test_seed_creates_zeroed_series() {
        let store = MeasurementStore::new().unwrap();
        store.seed(&DeviceRegistry::from(vec![kitchen()]));

        let families = store.gather();
        assert_eq!(family(&families, "sonos_noise").unwrap().get_metric().len(), 3);
        assert_eq!(family(&families, "sonos_ani").unwrap().get_metric().len(), 1);
        assert_eq!(family(&families, "sonos_collection_error").unwrap().get_metric().len(), 1);
        assert_eq!(family(&families, "sonos_device_info").unwrap().get_metric().len(), 1);
        assert!(family(&families, "sonos_collection_duration").is_some());
        assert_eq!(store.ani("Kitchen"), 0);
    }

    #[test]
    fn test_failure_keeps_last_reading() {
        let store = MeasurementStore::new().unwrap();
        let device = kitchen();
        store.record(&device, &DiagnosticStatus { ani: 7, noise: [-90, -91, -92] });
        store.mark_failed(&device);

        assert_eq!(store.ani("Kitchen"), 7);
        assert_eq!(store.noise("Kitchen", 2), -92);
        assert_eq!(store.collection_error("Kitchen"), 1);

        store.record(&device, &DiagnosticStatus::default());
        assert_eq!(store.collection_error("Kitchen"), 0);
        assert_eq!(store.noise("Kitchen", 2), 0);
    }

    #[test]
    fn test_duration_is_last_value() {
        let store = MeasurementStore::new().unwrap();
        store.set_duration(Duration::from_millis(1500));
        store.set_duration(Duration::from_millis(250));
        assert!((store.duration_seconds() - 0.25).abs() < f64::EPSILON);
        assert_eq!(store.duration_desc()[0].fq_name, "sonos_collection_duration");
    }
}
