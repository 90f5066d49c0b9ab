// ── Core error types ──
//
// User-facing errors from gatewatch-core. Consumers never see HTTP status
// codes or raw JSON failures; `From<gatewatch_api::Error>` translates the
// transport taxonomy into these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Gateway availability ─────────────────────────────────────────
    #[error("Device registry unavailable: {reason}")]
    RegistryUnavailable { reason: String },

    #[error("Telemetry channel down: {reason}")]
    TelemetryChannelDown { reason: String },

    // ── Command errors ───────────────────────────────────────────────
    /// Local validation failure or a 4xx rejection. `message` is the
    /// gateway's text, unmodified, when the gateway produced it.
    #[error("{message}")]
    ValidationError { message: String },

    #[error("Device not found: {name}")]
    DeviceNotFound { name: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Malformed gateway payload: {message}")]
    ParseError { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Dashboard has been shut down")]
    Stopped,
}

impl CoreError {
    /// Shorthand for a local validation failure.
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// Returns `true` when retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RegistryUnavailable { .. } | Self::TelemetryChannelDown { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<gatewatch_api::Error> for CoreError {
    fn from(err: gatewatch_api::Error) -> Self {
        use gatewatch_api::Error as Api;

        match err {
            Api::Transport(e) => CoreError::RegistryUnavailable {
                reason: e.to_string(),
            },
            Api::Status { status, message } if status >= 500 => CoreError::RegistryUnavailable {
                reason: format!("HTTP {status}: {message}"),
            },
            Api::Status { message, .. } => CoreError::ValidationError { message },
            Api::Deserialization { message, .. } => CoreError::ParseError { message },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            Api::WebSocketConnect(reason) => CoreError::TelemetryChannelDown { reason },
            Api::WebSocketClosed { code, reason } => CoreError::TelemetryChannelDown {
                reason: format!("closed with code {code}: {reason}"),
            },
        }
    }
}
