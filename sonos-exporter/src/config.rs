use crate::fetcher::{DEVICE_PORT, FETCH_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExporterConfig {
    pub hosts: Vec<String>,
    pub device_port: u16,
    pub fetch_timeout_secs: u64,
    pub listen_port: u16,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["10.0.0.87".into(), "10.0.0.11".into()],
            device_port: DEVICE_PORT,
            fetch_timeout_secs: FETCH_TIMEOUT.as_secs(),
            listen_port: 8080,
        }
    }
}

impl ExporterConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    /// `PORT` replaces the listen port, `SONOS_HOSTS` (comma separated)
    /// replaces the device list. Also cleans up the host list and raises a
    /// zero fetch timeout.
    fn apply_overrides(&mut self, port: Option<String>, hosts: Option<String>) {
        if let Some(port) = port {
            match port.trim().parse() {
                Ok(p) => self.listen_port = p,
                Err(_) => warn!("ignoring invalid PORT {:?}", port),
            }
        }
        if let Some(hosts) = hosts {
            self.hosts = hosts.split(',').map(str::trim).map(String::from).collect();
        }
        self.normalize_hosts();
        if self.fetch_timeout_secs == 0 {
            warn!("fetch_timeout_secs must be at least 1, using 1");
            self.fetch_timeout_secs = 1;
        }
    }

    /// Drops blanks and duplicates, keeping the first occurrence.
    fn normalize_hosts(&mut self) {
        let mut seen = Vec::with_capacity(self.hosts.len());
        for host in self.hosts.drain(..) {
            let host = host.trim().to_string();
            if host.is_empty() {
                continue;
            }
            if seen.contains(&host) {
                warn!("duplicate host {} ignored", host);
                continue;
            }
            seen.push(host);
        }
        self.hosts = seen;
    }
}

fn parse_config(txt: &str) -> ExporterConfig {
    if txt.trim().is_empty() {
        return ExporterConfig::default();
    }
    serde_yaml::from_str(txt).unwrap_or_else(|e| {
        warn!("invalid config, using defaults: {}", e);
        ExporterConfig::default()
    })
}

pub async fn load_config() -> ExporterConfig {
    let path = std::env::var("SONOS_EXPORTER_CONFIG").unwrap_or_else(|_| "exporter.yaml".into());
    let mut cfg = if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_else(|e| {
            warn!("cannot read {}: {}", path, e);
            String::new()
        });
        parse_config(&txt)
    } else {
        info!("no {}, using default config", path);
        ExporterConfig::default()
    };
    cfg.apply_overrides(std::env::var("PORT").ok(), std::env::var("SONOS_HOSTS").ok());
    cfg
}
