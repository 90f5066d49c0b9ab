// ── Telemetry domain types ──

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Link status reported by the gateway for one device.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LinkStatus {
    Online,
    Offline,
}

/// A single measurement.
///
/// Most readings are numeric; enumerated measurements (such as an OEE
/// line's `available_status`) arrive as short text tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Number(f64),
    Text(String),
}

impl Reading {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v:.2}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Reading {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for Reading {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

/// Ordered measurement name → reading.
pub type Readings = IndexMap<String, Reading>;

/// The latest telemetry for one device, as published by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub status: LinkStatus,
    /// Present only when online.
    pub values: Readings,
    /// Present only when offline.
    pub error: Option<String>,
    /// Producer-assigned sample time.
    pub timestamp: DateTime<Utc>,
}

impl TelemetrySnapshot {
    /// Age at `now`. Future-dated samples count as zero.
    pub fn age(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.timestamp).to_std().unwrap_or_default()
    }
}

/// Full telemetry map keyed by device name, replaced wholesale per cycle.
pub type SnapshotMap = IndexMap<String, TelemetrySnapshot>;
