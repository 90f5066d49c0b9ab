// ── Domain model ──
//
// Canonical representations of configured devices, gateway telemetry and
// the reconciled view. Wire shapes live in gatewatch-api; `convert`
// bridges the two.

pub mod device;
pub mod telemetry;
pub mod view;

pub use device::{DEFAULT_PORT, DEFAULT_SLAVE_ID, Device, DeviceKind, PmParam, RegisterOffset};
pub use telemetry::{LinkStatus, Reading, Readings, SnapshotMap, TelemetrySnapshot};
pub use view::{Connectivity, ReconciledDevice, ReconciledView};
