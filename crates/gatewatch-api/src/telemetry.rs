// Telemetry snapshot endpoint

use crate::client::GatewayClient;
use crate::error::Error;
use crate::models::SnapshotPayload;

impl GatewayClient {
    /// Fetch the full telemetry dump for every polled device.
    ///
    /// `GET /data`
    pub async fn fetch_snapshot(&self) -> Result<SnapshotPayload, Error> {
        let url = self.endpoint(&["data"])?;
        self.get(url).await
    }
}
