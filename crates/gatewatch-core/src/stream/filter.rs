// ── Attribute filters over reconciled devices ──
//
// Used by the CLI to narrow a view without re-querying the gateway.

use crate::model::{Connectivity, DeviceKind, ReconciledDevice, ReconciledView};

/// Filter predicate for reconciled devices.
pub enum DeviceFilter {
    All,
    ByKind(DeviceKind),
    ByConnectivity(Connectivity),
    Online,
    Offline,
    Stale,
    Custom(Box<dyn Fn(&ReconciledDevice) -> bool + Send + Sync>),
}

impl DeviceFilter {
    pub fn matches(&self, device: &ReconciledDevice) -> bool {
        match self {
            Self::All => true,
            Self::ByKind(kind) => device.device.kind == *kind,
            Self::ByConnectivity(c) => device.connectivity == *c,
            Self::Online => device.connectivity == Connectivity::Online,
            Self::Offline => device.connectivity == Connectivity::Offline,
            Self::Stale => device.stale,
            Self::Custom(f) => f(device),
        }
    }

    /// Keep matching devices, in view order. `NoData` passes through.
    pub fn apply(&self, view: &ReconciledView) -> ReconciledView {
        match view {
            ReconciledView::NoData { .. } => view.clone(),
            ReconciledView::Devices { devices } => ReconciledView::Devices {
                devices: devices.iter().filter(|d| self.matches(d)).cloned().collect(),
            },
        }
    }
}
