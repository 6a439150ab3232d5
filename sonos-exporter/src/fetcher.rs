//! Device HTTP access
//!
//! Two endpoints are read on every player, both on the UPnP port:
//! - `/xml/device_description.xml` once at startup, for the room name
//! - `/status/proc/ath_rincon/status` on every scrape, for radio diagnostics

use crate::models::DeviceIdentity;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// UPnP port every player listens on.
pub const DEVICE_PORT: u16 = 1400;
/// Upper bound for a single device request.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

const DESCRIPTION_PATH: &str = "/xml/device_description.xml";
const STATUS_PATH: &str = "/status/proc/ath_rincon/status";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("decode error: {0}")]
    Decode(#[from] quick_xml::de::DeError),
}

/// Network access to a player.
#[async_trait]
pub trait DeviceFetcher: Send + Sync {
    /// Reads the device description and returns the player identity.
    async fn resolve_identity(&self, host: &str) -> Result<DeviceIdentity, FetchError>;

    /// Returns the raw diagnostic document. HTTP status codes are not checked.
    async fn fetch_diagnostics(&self, host: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    port: u16,
}

impl HttpFetcher {
    pub fn new(port: u16, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sonos-exporter/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, port })
    }

    fn url(&self, host: &str, path: &str) -> String {
        if host.contains(':') && !host.starts_with('[') {
            format!("http://[{}]:{}{}", host, self.port, path)
        } else {
            format!("http://{}:{}{}", host, self.port, path)
        }
    }

    async fn get_text(&self, host: &str, path: &str) -> Result<String, FetchError> {
        let response = self.client.get(self.url(host, path)).send().await?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl DeviceFetcher for HttpFetcher {
    async fn resolve_identity(&self, host: &str) -> Result<DeviceIdentity, FetchError> {
        let body = self.get_text(host, DESCRIPTION_PATH).await?;
        decode_identity(host, &body)
    }

    async fn fetch_diagnostics(&self, host: &str) -> Result<String, FetchError> {
        self.get_text(host, STATUS_PATH).await
    }
}

#[derive(Debug, Deserialize)]
struct DescriptionDocument {
    device: DeviceElement,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DeviceElement {
    room_name: String,
    model_name: String,
    model_number: String,
    serial_num: String,
    software_version: String,
    hardware_version: String,
    display_version: String,
    #[serde(rename = "UDN")]
    udn: String,
}

/// Decodes `root/device` of a UPnP device description.
pub fn decode_identity(host: &str, xml: &str) -> Result<DeviceIdentity, FetchError> {
    let doc: DescriptionDocument = quick_xml::de::from_str(xml)?;
    let d = doc.device;
    Ok(DeviceIdentity {
        host: host.to_string(),
        room_name: d.room_name,
        model_name: d.model_name,
        model_number: d.model_number,
        serial_num: d.serial_num,
        software_version: d.software_version,
        hardware_version: d.hardware_version,
        display_version: d.display_version,
        udn: d.udn,
        label_override: None,
    })
}
