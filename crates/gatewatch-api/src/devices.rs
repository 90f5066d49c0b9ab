// Device configuration endpoints
//
// CRUD over `/devices` plus the power-meter default parameter map.

use tracing::debug;

use crate::client::GatewayClient;
use crate::error::Error;
use crate::models::{DeviceRecord, PmDefaults};

impl GatewayClient {
    /// List all configured devices in gateway order.
    ///
    /// `GET /devices`
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>, Error> {
        let url = self.endpoint(&["devices"])?;
        self.get(url).await
    }

    /// Create a device. The gateway assigns the register offset; callers
    /// reload the list to see it.
    ///
    /// `POST /devices`
    pub async fn create_device(&self, device: &DeviceRecord) -> Result<(), Error> {
        let url = self.endpoint(&["devices"])?;
        debug!(name = %device.name, "creating device");
        self.post(url, device).await
    }

    /// Replace the device currently named `name` with `device` in full.
    ///
    /// `PUT /devices/{name}`
    pub async fn update_device(&self, name: &str, device: &DeviceRecord) -> Result<(), Error> {
        let url = self.endpoint(&["devices", name])?;
        debug!(name, "updating device");
        self.put(url, device).await
    }

    /// Delete a device by name.
    ///
    /// `DELETE /devices/{name}`. A 404 is returned as an error here;
    /// callers decide whether a missing device matters.
    pub async fn delete_device(&self, name: &str) -> Result<(), Error> {
        let url = self.endpoint(&["devices", name])?;
        debug!(name, "deleting device");
        self.delete(url).await
    }

    /// Default `[name, address]` parameter map for power meters.
    ///
    /// `GET /pm-defaults`
    pub async fn pm_defaults(&self) -> Result<PmDefaults, Error> {
        let url = self.endpoint(&["pm-defaults"])?;
        self.get(url).await
    }
}
