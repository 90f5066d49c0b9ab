// gatewatch-api: Async Rust client for the field-device gateway (REST + push)

pub mod client;
pub mod devices;
pub mod error;
pub mod models;
pub mod push;
pub mod telemetry;
pub mod transport;

pub use client::GatewayClient;
pub use error::Error;
pub use models::{DeviceRecord, PmDefaults, SnapshotPayload, SnapshotRecord};
pub use push::{PushEvent, PushHandle, ReconnectConfig};
