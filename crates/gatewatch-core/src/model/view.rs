// ── Reconciled view types ──
//
// The merged registry + telemetry picture handed to the presentation
// layer. Derived on every input change, never persisted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::device::Device;
use super::telemetry::{LinkStatus, Readings};

/// Derived connectivity classification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Connectivity {
    Online,
    Offline,
    /// No snapshot yet, or the snapshot is not trusted.
    Unknown,
}

impl From<LinkStatus> for Connectivity {
    fn from(status: LinkStatus) -> Self {
        match status {
            LinkStatus::Online => Self::Online,
            LinkStatus::Offline => Self::Offline,
        }
    }
}

/// One registry entry joined with its latest telemetry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledDevice {
    pub device: Arc<Device>,
    pub connectivity: Connectivity,
    pub values: Readings,
    pub error: Option<String>,
    /// Timestamp of the snapshot the telemetry fields came from.
    pub last_seen: Option<DateTime<Utc>>,
    /// Raw status carried by that snapshot.
    pub last_status: Option<LinkStatus>,
    /// A snapshot exists but is too old, or the channel is unhealthy.
    pub stale: bool,
}

impl ReconciledDevice {
    pub fn name(&self) -> &str {
        &self.device.name
    }

    /// Time since `last_seen`, clamped at zero.
    pub fn age(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        self.last_seen
            .map(|seen| (now - seen).to_std().unwrap_or_default())
    }
}

/// What the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReconciledView {
    /// The registry has never loaded. No placeholder devices are shown.
    NoData { last_error: Option<String> },
    /// One entry per registry device, in registry order.
    Devices { devices: Vec<ReconciledDevice> },
}

impl ReconciledView {
    pub fn devices(&self) -> &[ReconciledDevice] {
        match self {
            Self::NoData { .. } => &[],
            Self::Devices { devices } => devices,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData { .. })
    }

    pub fn len(&self) -> usize {
        self.devices().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices().is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ReconciledDevice> {
        self.devices().iter().find(|d| d.name() == name)
    }

    /// Device names in view order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices().iter().map(ReconciledDevice::name)
    }
}

impl Default for ReconciledView {
    fn default() -> Self {
        Self::NoData { last_error: None }
    }
}
