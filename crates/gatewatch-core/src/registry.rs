// ── Device registry client ──
//
// CRUD façade over the gateway's device configuration. Owns the cached
// device list. Every successful write is followed by a full reload before
// the call resolves; the written record is never merged locally.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gatewatch_api::{DeviceRecord, GatewayClient};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::convert::{devices_from_records, pm_defaults_from_wire};
use crate::error::CoreError;
use crate::model::{Device, PmParam, RegisterOffset};

/// Shared, immutable device list.
pub type DeviceList = Arc<Vec<Arc<Device>>>;

/// Observable registry state.
#[derive(Debug, Clone, Default)]
pub struct RegistryState {
    /// `None` until the first successful load.
    pub devices: Option<DeviceList>,
    /// Reason the most recent load failed, cleared on success.
    pub last_error: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl RegistryState {
    pub fn is_loaded(&self) -> bool {
        self.devices.is_some()
    }
}

/// Client for the gateway's device configuration.
pub struct DeviceRegistry {
    client: GatewayClient,
    state: watch::Sender<RegistryState>,
    // Serializes loads and write+reload pairs so an older listing never
    // replaces a newer one.
    op_lock: Mutex<()>,
}

impl DeviceRegistry {
    pub fn new(client: GatewayClient) -> Self {
        let (state, _) = watch::channel(RegistryState::default());
        Self {
            client,
            state,
            op_lock: Mutex::new(()),
        }
    }

    pub fn client(&self) -> &GatewayClient {
        &self.client
    }

    /// Current state (cheap clone).
    pub fn state(&self) -> RegistryState {
        self.state.borrow().clone()
    }

    /// The cached device list, if one was ever loaded.
    pub fn devices(&self) -> Option<DeviceList> {
        self.state.borrow().devices.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RegistryState> {
        self.state.subscribe()
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Reload the device list from the gateway, replacing the cache.
    ///
    /// On failure the cached list is retained and the error is recorded
    /// in [`RegistryState::last_error`].
    pub async fn list(&self) -> Result<DeviceList, CoreError> {
        let _guard = self.op_lock.lock().await;
        self.reload().await
    }

    /// The gateway's default power-meter parameter map.
    pub async fn pm_defaults(&self) -> Result<Vec<PmParam>, CoreError> {
        let defaults = self.client.pm_defaults().await?;
        pm_defaults_from_wire(defaults)
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Create a device, then reload. The gateway assigns the offset.
    pub async fn create(&self, device: &Device) -> Result<DeviceList, CoreError> {
        device.validate()?;

        let _guard = self.op_lock.lock().await;
        let mut record = DeviceRecord::from(device);
        record.offset = serde_json::Value::from(0_u32);

        self.client.create_device(&record).await?;
        info!(name = %device.name, kind = %device.kind, "device created");
        self.reload_after_write().await
    }

    /// Replace the device currently named `name` in full, then reload.
    ///
    /// The register offset is read-only: the cached value for `name` is
    /// sent back unchanged.
    pub async fn update(&self, name: &str, device: &Device) -> Result<DeviceList, CoreError> {
        device.validate()?;

        let _guard = self.op_lock.lock().await;
        let mut record = DeviceRecord::from(device);
        if let Some(offset) = self.cached_offset(name) {
            record.offset = serde_json::Value::from(offset.value());
        }

        match self.client.update_device(name, &record).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                return Err(CoreError::DeviceNotFound { name: name.into() });
            }
            Err(e) => return Err(e.into()),
        }
        info!(name, "device updated");
        self.reload_after_write().await
    }

    /// Delete a device, then reload. A device that is already gone counts
    /// as deleted.
    pub async fn delete(&self, name: &str) -> Result<DeviceList, CoreError> {
        let _guard = self.op_lock.lock().await;

        match self.client.delete_device(name).await {
            Ok(()) => info!(name, "device deleted"),
            Err(e) if e.is_not_found() => debug!(name, "device already absent"),
            Err(e) => return Err(e.into()),
        }
        self.reload_after_write().await
    }

    // ── Internals ────────────────────────────────────────────────────

    fn cached_offset(&self, name: &str) -> Option<RegisterOffset> {
        self.state
            .borrow()
            .devices
            .as_ref()?
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.offset)
    }

    /// Fetch and publish. Caller holds `op_lock`.
    async fn reload(&self) -> Result<DeviceList, CoreError> {
        let result = match self.client.list_devices().await {
            Ok(records) => Ok(devices_from_records(records)),
            Err(e) => Err(CoreError::from(e)),
        };

        match result {
            Ok(devices) => {
                let list: DeviceList = Arc::new(devices.into_iter().map(Arc::new).collect());
                debug!(devices = list.len(), "registry loaded");
                self.state.send_replace(RegistryState {
                    devices: Some(Arc::clone(&list)),
                    last_error: None,
                    loaded_at: Some(Utc::now()),
                });
                Ok(list)
            }
            Err(e) => {
                // A listing that cannot be fetched or read leaves the
                // registry unavailable, whatever the cause.
                let e = match e {
                    CoreError::ValidationError { message } => CoreError::RegistryUnavailable {
                        reason: message,
                    },
                    CoreError::ParseError { message } => CoreError::RegistryUnavailable {
                        reason: format!("unreadable device list: {message}"),
                    },
                    other => other,
                };
                warn!(error = %e, "registry load failed, keeping cached list");
                self.state.send_modify(|state| state.last_error = Some(e.to_string()));
                Err(e)
            }
        }
    }

    async fn reload_after_write(&self) -> Result<DeviceList, CoreError> {
        self.reload().await.inspect_err(|e| {
            warn!(error = %e, "write succeeded but the registry could not be reloaded");
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::DeviceKind;

    #[tokio::test]
    async fn local_validation_skips_the_round_trip() {
        // Nothing listens here; a request would fail with RegistryUnavailable.
        let registry = DeviceRegistry::new(GatewayClient::from_url("http://127.0.0.1:9/api").unwrap());

        let err = registry
            .create(&Device::new("", DeviceKind::Oee, "10.0.0.2"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationError { .. }));
        assert!(!registry.state().is_loaded());
    }

    #[tokio::test]
    async fn failed_load_keeps_state_unloaded() {
        let registry = DeviceRegistry::new(GatewayClient::from_url("http://127.0.0.1:9/api").unwrap());

        let err = registry.list().await.unwrap_err();
        assert!(matches!(err, CoreError::RegistryUnavailable { .. }));

        let state = registry.state();
        assert!(state.devices.is_none());
        assert!(state.last_error.is_some());
    }
}
