// ── Runtime monitor configuration ──
//
// Describes *how* to reach one gateway and how to ingest its telemetry.
// The CLI (via gatewatch-config) builds a `MonitorConfig` and hands it in;
// core never reads config files.

use std::path::PathBuf;
use std::time::Duration;

use gatewatch_api::ReconnectConfig;
use gatewatch_api::transport::{TlsMode, TransportConfig};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CoreError;

/// API base used when nothing else is configured.
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8000/api";

/// Telemetry ingestion strategy.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
pub enum TelemetryMode {
    /// Long-lived WebSocket receiving full dumps.
    #[default]
    Push,
    /// Periodic `GET /data`.
    Poll,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed plant gateways).
    DangerAcceptInvalid,
}

/// Configuration for monitoring a single gateway.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// REST API base, e.g. `http://gateway:8000/api`.
    pub url: Url,
    /// Push endpoint override. Derived from `url` (`/ws`) when unset.
    pub push_url: Option<Url>,
    pub mode: TelemetryMode,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Poll cadence in [`TelemetryMode::Poll`].
    pub poll_interval: Duration,
    /// Snapshots older than this are not trusted.
    pub staleness_threshold: Duration,
    /// Consecutive ingest failures before the channel counts as degraded.
    pub failure_threshold: u32,
    /// Background registry reload cadence. Zero disables it.
    pub registry_refresh_interval: Duration,
    /// Cadence at which the view is recomputed without new input, so that
    /// ageing snapshots turn stale on their own.
    pub view_tick: Duration,
    pub reconnect: ReconnectConfig,
}

impl MonitorConfig {
    /// Defaults for the gateway at `url`.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            push_url: None,
            mode: TelemetryMode::default(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(2),
            staleness_threshold: Duration::from_secs(10),
            failure_threshold: 3,
            registry_refresh_interval: Duration::from_secs(30),
            view_tick: Duration::from_secs(1),
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Parse `url` and apply defaults.
    pub fn from_url(url: &str) -> Result<Self, CoreError> {
        let url = Url::parse(url).map_err(|e| CoreError::Config {
            message: format!("invalid gateway URL '{url}': {e}"),
        })?;
        Ok(Self::new(url))
    }

    /// Reject settings the background tasks cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(CoreError::Config {
                message: format!("gateway URL must be http or https, got '{}'", self.url),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(CoreError::Config {
                message: "poll interval must be greater than zero".into(),
            });
        }
        if self.view_tick.is_zero() {
            return Err(CoreError::Config {
                message: "view tick must be greater than zero".into(),
            });
        }
        if self.failure_threshold == 0 {
            return Err(CoreError::Config {
                message: "failure threshold must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// The WebSocket endpoint for push mode.
    pub fn push_endpoint(&self) -> Result<Url, CoreError> {
        match &self.push_url {
            Some(url) => Ok(url.clone()),
            None => Ok(gatewatch_api::push::push_url(&self.url)?),
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}
