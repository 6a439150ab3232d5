use serde::Serialize;

/// Number of radio chains reported by a player.
pub const CHAINS: usize = 3;

/// Identity of one configured player, resolved once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    pub host: String,
    pub room_name: String,
    pub model_name: String,
    pub model_number: String,
    pub serial_num: String,
    pub software_version: String,
    pub hardware_version: String,
    pub display_version: String,
    pub udn: String,
    /// Set by the registry when the room name is shared with another player.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_override: Option<String>,
}

impl DeviceIdentity {
    /// Entry kept for a host whose description could not be fetched.
    pub fn unresolved(host: &str) -> Self {
        Self {
            host: host.to_string(),
            ..Self::default()
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.room_name.is_empty()
    }

    /// Value of the `host` label: the room name, or the address when the
    /// room is unknown.
    pub fn label(&self) -> &str {
        if let Some(label) = &self.label_override {
            label
        } else if self.room_name.is_empty() {
            &self.host
        } else {
            &self.room_name
        }
    }
}

/// Measurements extracted from a single diagnostic payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticStatus {
    pub ani: i64,
    /// Noise floor in dBm, indexed by chain id.
    pub noise: [i64; CHAINS],
}
