//! Shared configuration for gatewatch tools.
//!
//! TOML profiles (one per gateway), layered loading with figment, and
//! translation to `gatewatch_core::MonitorConfig`. Core never reads these
//! types; it receives a pre-built `MonitorConfig`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatewatch_core::{DEFAULT_GATEWAY_URL, MonitorConfig, TelemetryMode, TlsVerification};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "GATEWATCH_CONFIG";

/// Prefix for environment overrides (`GATEWATCH_DEFAULTS__TIMEOUT=5`).
pub const ENV_PREFIX: &str = "GATEWATCH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is requested.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named gateway profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Resolve the active profile name: explicit request, then
    /// `default_profile`, then `"default"`.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

/// Fallbacks for every profile.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// `"push"` or `"poll"`.
    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: u64,

    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub insecure: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            mode: default_mode(),
            poll_interval_ms: default_poll_interval_ms(),
            staleness_secs: default_staleness_secs(),
            failure_threshold: default_failure_threshold(),
            timeout: default_timeout(),
            insecure: false,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_mode() -> String {
    TelemetryMode::Push.to_string()
}
fn default_poll_interval_ms() -> u64 {
    2000
}
fn default_staleness_secs() -> u64 {
    10
}
fn default_failure_threshold() -> u32 {
    3
}
fn default_timeout() -> u64 {
    10
}

/// A named gateway profile. Unset fields fall back to [`Defaults`].
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Profile {
    /// REST API base (e.g. "http://gateway:8000/api").
    pub gateway: String,

    /// Push channel override. Derived from `gateway` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staleness_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<u32>,

    /// How often the live view reloads the device list. 0 disables it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_refresh_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Path to a custom CA certificate (PEM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
}

impl Profile {
    pub fn new(gateway: impl Into<String>) -> Self {
        Self {
            gateway: gateway.into(),
            ..Self::default()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `GATEWATCH_CONFIG`, then platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }

    ProjectDirs::from("com", "gatewatch", "gatewatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("gatewatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` layered over defaults, with `GATEWATCH_` environment
/// overrides on top. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is bad.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to core ─────────────────────────────────────────────

fn parse_mode(raw: &str) -> Result<TelemetryMode, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: "mode".into(),
        reason: format!("expected 'push' or 'poll', got '{raw}'"),
    })
}

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })
}

/// Build a `MonitorConfig` from a profile and the global defaults.
pub fn profile_to_monitor_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<MonitorConfig, ConfigError> {
    let gateway = if profile.gateway.trim().is_empty() {
        DEFAULT_GATEWAY_URL
    } else {
        profile.gateway.as_str()
    };

    let mut config = MonitorConfig::new(parse_url("gateway", gateway)?);
    config.push_url = profile
        .push_url
        .as_deref()
        .map(|raw| parse_url("push_url", raw))
        .transpose()?;
    config.mode = parse_mode(profile.mode.as_deref().unwrap_or(&defaults.mode))?;
    config.poll_interval =
        Duration::from_millis(profile.poll_interval_ms.unwrap_or(defaults.poll_interval_ms));
    config.staleness_threshold =
        Duration::from_secs(profile.staleness_secs.unwrap_or(defaults.staleness_secs));
    config.failure_threshold = profile.failure_threshold.unwrap_or(defaults.failure_threshold);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    if let Some(secs) = profile.registry_refresh_secs {
        config.registry_refresh_interval = Duration::from_secs(secs);
    }

    config.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    config.validate().map_err(|e| ConfigError::Validation {
        field: "profile".into(),
        reason: e.to_string(),
    })?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn profile_falls_back_to_defaults() {
        let config =
            profile_to_monitor_config(&Profile::new("http://gw:8000/api"), &Defaults::default())
                .unwrap();
        assert_eq!(config.mode, TelemetryMode::Push);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn profile_overrides_win() {
        let profile = Profile {
            mode: Some("poll".into()),
            poll_interval_ms: Some(500),
            insecure: Some(true),
            ..Profile::new("https://gw/api")
        };
        let config = profile_to_monitor_config(&profile, &Defaults::default()).unwrap();
        assert_eq!(config.mode, TelemetryMode::Poll);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn bad_mode_is_a_validation_error() {
        let profile = Profile {
            mode: Some("smoke-signals".into()),
            ..Profile::new("http://gw/api")
        };
        let err = profile_to_monitor_config(&profile, &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "mode"));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let profile = Profile {
            poll_interval_ms: Some(0),
            ..Profile::new("http://gw/api")
        };
        assert!(profile_to_monitor_config(&profile, &Defaults::default()).is_err());
    }

    #[test]
    fn active_profile_resolution() {
        let config = Config::default();
        assert_eq!(config.active_profile_name(None), "default");
        assert_eq!(config.active_profile_name(Some("plant-2")), "plant-2");
        assert!(matches!(
            config.profile("plant-2"),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }
}
