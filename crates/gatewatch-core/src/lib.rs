// gatewatch-core: Live-state reconciliation between the gateway and consumers (CLI).

pub mod command;
pub mod config;
pub mod convert;
pub mod dashboard;
pub mod error;
pub mod ingest;
pub mod model;
pub mod reconcile;
pub mod registry;
pub mod selection;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use config::{DEFAULT_GATEWAY_URL, MonitorConfig, TelemetryMode, TlsVerification};
pub use dashboard::{Dashboard, Lifecycle};
pub use error::CoreError;
pub use ingest::{
    ChannelHealth, ChannelState, PollSource, PushSource, TelemetrySink, TelemetrySource,
    TelemetryState,
};
pub use reconcile::reconcile;
pub use registry::{DeviceList, DeviceRegistry, RegistryState};
pub use selection::{Selection, SelectionMode};
pub use store::LiveState;
pub use stream::{DeviceFilter, ViewStream};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Connectivity, Device, DeviceKind, LinkStatus, PmParam, Reading, Readings, ReconciledDevice,
    ReconciledView, RegisterOffset, SnapshotMap, TelemetrySnapshot,
};
