use crate::fetcher::DeviceFetcher;
use crate::models::DeviceIdentity;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Players known to the exporter, in configuration order.
///
/// Built once at startup and never re-resolved: a renamed room keeps its old
/// label until the process restarts.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    devices: Arc<[DeviceIdentity]>,
}

impl DeviceRegistry {
    /// Resolves every host sequentially. A host whose description cannot be
    /// read still gets an (unresolved) entry.
    pub async fn build(hosts: &[String], fetcher: &dyn DeviceFetcher) -> Self {
        let mut devices = Vec::with_capacity(hosts.len());
        for host in hosts {
            let identity = match fetcher.resolve_identity(host).await {
                Ok(identity) => {
                    debug!("resolved {} -> {:?} ({})", host, identity.room_name, identity.model_name);
                    identity
                }
                Err(e) => {
                    warn!("failed to resolve {}: {}", host, e);
                    DeviceIdentity::unresolved(host)
                }
            };
            devices.push(identity);
        }
        Self::from(devices)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceIdentity> {
        self.devices.iter()
    }

    pub fn devices(&self) -> &[DeviceIdentity] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl From<Vec<DeviceIdentity>> for DeviceRegistry {
    fn from(mut devices: Vec<DeviceIdentity>) -> Self {
        disambiguate_labels(&mut devices);
        Self {
            devices: devices.into(),
        }
    }
}

/// Players sharing a room (stereo pairs, Sub bonds) get the address appended
/// to their label so each one keeps its own series.
fn disambiguate_labels(devices: &mut [DeviceIdentity]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for device in devices.iter() {
        *counts.entry(device.label().to_string()).or_default() += 1;
    }
    for device in devices.iter_mut() {
        if counts.get(device.label()).copied().unwrap_or(0) > 1 {
            let label = format!("{} ({})", device.label(), device.host);
            info!("room {:?} is shared, labelling {} as {:?}", device.label(), device.host, label);
            device.label_override = Some(label);
        }
    }
}
