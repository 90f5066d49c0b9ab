// Wire types for the gateway REST API and push channel.
//
// These mirror the JSON the gateway emits as loosely as possible.
// Normalization into domain types happens in gatewatch-core.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A configured device as stored by the gateway (`GET /devices`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub name: String,
    pub ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_slave_id")]
    pub slave_id: u8,
    /// `"oee"`, `"pm"` or `"scale"`.
    #[serde(rename = "type")]
    pub device_type: String,
    /// Register base offset. Integer on the gateway side; some deployments
    /// report it as a hex string, so it is kept raw here.
    #[serde(default)]
    pub offset: serde_json::Value,
    /// `[name, address]` pairs for power meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pm_params: Option<Vec<(String, i64)>>,
}

fn default_port() -> u16 {
    502
}

fn default_slave_id() -> u8 {
    1
}

/// One device entry of a telemetry dump (`GET /data`, push frames).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// `"online"` or `"offline"`.
    pub status: String,
    #[serde(default)]
    pub values: Option<IndexMap<String, serde_json::Value>>,
    #[serde(default)]
    pub error: Option<String>,
    /// Seconds since the epoch, assigned by the gateway.
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// Full telemetry dump keyed by device name.
///
/// Entries stay raw so one bad entry cannot spoil the map; decode each
/// with [`SnapshotRecord::from_entry`].
pub type SnapshotPayload = IndexMap<String, serde_json::Value>;

impl SnapshotRecord {
    /// Decode one entry of a [`SnapshotPayload`].
    pub fn from_entry(entry: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(entry)
    }
}

/// Response of `GET /pm-defaults`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmDefaults {
    pub params: Vec<(String, i64)>,
}

/// FastAPI-style error body: `{"detail": "..."}` or a list of field errors.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    /// Flatten `detail` into a single human-readable message.
    pub(crate) fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| {
                    let msg = item["msg"].as_str().unwrap_or("invalid value");
                    match item["loc"].as_array().and_then(|loc| loc.last()) {
                        Some(serde_json::Value::String(field)) => format!("{field}: {msg}"),
                        Some(field) => format!("{field}: {msg}"),
                        None => msg.to_owned(),
                    }
                })
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}
