// Gateway REST client
//
// Wraps `reqwest::Client` with URL construction under the API base and
// error-body extraction. Endpoint groups (devices, telemetry) are
// implemented as inherent methods in separate files to keep this module
// focused on transport mechanics.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::ErrorBody;
use crate::transport::TransportConfig;

/// Raw HTTP client for the gateway API.
///
/// Reads return decoded payloads, writes only check the status. Non-success
/// statuses become
/// [`Error::Status`] carrying the gateway's own message.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: Url,
}

impl GatewayClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the API root, e.g. `http://gateway:8000/api`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Parse `base_url` and wrap a default `reqwest::Client`. Used by tests
    /// and one-off tools.
    pub fn from_url(base_url: &str) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        Ok(Self::with_client(reqwest::Client::new(), base_url))
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{segments...}`, percent-encoding each segment.
    ///
    /// Device names are operator-chosen and may contain spaces or slashes,
    /// so they are always appended as individual path segments.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        Self::decode(resp).await
    }

    /// Send a POST request with a JSON body. Only the status is checked;
    /// the gateway's echo of the record is not relied upon.
    pub(crate) async fn post(&self, url: Url, body: &impl Serialize) -> Result<(), Error> {
        debug!("POST {}", url);
        let resp = self.http.post(url).json(body).send().await?;
        Self::check_status(resp).await.map(drop)
    }

    /// Send a PUT request with a JSON body. Only the status is checked.
    pub(crate) async fn put(&self, url: Url, body: &impl Serialize) -> Result<(), Error> {
        debug!("PUT {}", url);
        let resp = self.http.put(url).json(body).send().await?;
        Self::check_status(resp).await.map(drop)
    }

    /// Send a DELETE request. The response body is not inspected.
    pub(crate) async fn delete(&self, url: Url) -> Result<(), Error> {
        debug!("DELETE {}", url);
        let resp = self.http.delete(url).send().await?;
        Self::check_status(resp).await.map(drop)
    }

    // ── Response handling ────────────────────────────────────────────

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let resp = Self::check_status(resp).await?;
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    /// Turn non-success statuses into [`Error::Status`], preserving the
    /// gateway's explanation verbatim.
    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => parsed.message(),
            Err(_) if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_owned(),
            Err(_) => body.trim().to_owned(),
        };

        debug!(status = status.as_u16(), %message, "gateway returned error status");
        Err(Error::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_segments_under_api_base() {
        let client = GatewayClient::from_url("http://gateway:8000/api").unwrap();
        let url = client.endpoint(&["devices"]).unwrap();
        assert_eq!(url.as_str(), "http://gateway:8000/api/devices");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client = GatewayClient::from_url("http://gateway:8000/api/").unwrap();
        let url = client.endpoint(&["data"]).unwrap();
        assert_eq!(url.as_str(), "http://gateway:8000/api/data");
    }

    #[test]
    fn endpoint_encodes_device_names() {
        let client = GatewayClient::from_url("http://gateway:8000/api").unwrap();
        let url = client.endpoint(&["devices", "Line 2/Press"]).unwrap();
        assert_eq!(url.as_str(), "http://gateway:8000/api/devices/Line%202%2FPress");
    }
}
