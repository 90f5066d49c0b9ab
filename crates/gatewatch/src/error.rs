//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use gatewatch_config::ConfigError;
use gatewatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Gateway ──────────────────────────────────────────────────────

    #[error("Gateway unavailable: {reason}")]
    #[diagnostic(
        code(gatewatch::gateway_unavailable),
        help(
            "Check that the gateway is running and reachable.\n\
             Pick another one with --gateway or --profile."
        )
    )]
    GatewayUnavailable { reason: String },

    #[error("Telemetry channel down: {reason}")]
    #[diagnostic(
        code(gatewatch::channel_down),
        help("The push channel could not be reached. Try: gatewatch --mode poll status")
    )]
    ChannelDown { reason: String },

    #[error("Gateway returned malformed data: {message}")]
    #[diagnostic(code(gatewatch::malformed_payload))]
    MalformedPayload { message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(gatewatch::not_found),
        help("Run: gatewatch {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    /// The gateway's own message, shown verbatim.
    #[error("{message}")]
    #[diagnostic(code(gatewatch::rejected))]
    Rejected { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(gatewatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(gatewatch::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: gatewatch --profile {name} config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(
        code(gatewatch::config),
        help("Check the file printed by: gatewatch config path")
    )]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("'{action}' requires confirmation")]
    #[diagnostic(
        code(gatewatch::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Lifecycle ────────────────────────────────────────────────────

    #[error("Live view already shut down")]
    #[diagnostic(code(gatewatch::stopped))]
    Stopped,

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    #[diagnostic(code(gatewatch::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::GatewayUnavailable { .. } | Self::ChannelDown { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn device_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: "device".into(),
            identifier: name.into(),
            list_command: "devices list".into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::RegistryUnavailable { reason } => Self::GatewayUnavailable { reason },
            CoreError::TelemetryChannelDown { reason } => Self::ChannelDown { reason },
            CoreError::ValidationError { message } => Self::Rejected { message },
            CoreError::DeviceNotFound { name } => Self::device_not_found(name),
            CoreError::ParseError { message } => Self::MalformedPayload { message },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Stopped => Self::Stopped,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            other => Self::Config(Box::new(other)),
        }
    }
}
