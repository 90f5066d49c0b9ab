//! CLI configuration: thin wrapper around `gatewatch_config`.
//!
//! Adds the flag overrides (`--gateway`, `--mode`, `--timeout`,
//! `--insecure`) on top of the selected profile.

use std::time::Duration;

use gatewatch_core::{DEFAULT_GATEWAY_URL, MonitorConfig, TelemetryMode, TlsVerification};

use crate::cli::{GlobalOpts, ModeArg};
use crate::error::CliError;

pub use gatewatch_config::{
    Config, Profile, config_path, load_config, profile_to_monitor_config, save_config,
};

impl From<ModeArg> for TelemetryMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Push => Self::Push,
            ModeArg::Poll => Self::Poll,
        }
    }
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Pick the profile to run against.
///
/// An explicitly requested profile must exist. Without one, a missing
/// default profile falls back to the built-in gateway URL.
fn select_profile(global: &GlobalOpts, config: &Config) -> Result<Profile, CliError> {
    let name = active_profile_name(global, config);
    match config.profiles.get(&name) {
        Some(profile) => Ok(profile.clone()),
        None if global.profile.is_some() => Err(CliError::ProfileNotFound {
            available: available_profiles(config),
            name,
        }),
        None => Ok(Profile::new(DEFAULT_GATEWAY_URL)),
    }
}

pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Translate the config file, profile and global flags into a
/// `MonitorConfig`. Flags take priority over the profile.
pub fn resolve_monitor_config(global: &GlobalOpts) -> Result<MonitorConfig, CliError> {
    let config = load_config()?;
    let mut profile = select_profile(global, &config)?;

    if let Some(ref gateway) = global.gateway {
        // A profile's push override belongs to the profile's gateway.
        profile.gateway.clone_from(gateway);
        profile.push_url = None;
    }

    let mut monitor = profile_to_monitor_config(&profile, &config.defaults)?;
    if let Some(mode) = global.mode {
        monitor.mode = mode.into();
    }
    if let Some(secs) = global.timeout {
        monitor.timeout = Duration::from_secs(secs);
    }
    if global.insecure {
        monitor.tls = TlsVerification::DangerAcceptInvalid;
    }

    tracing::debug!(
        gateway = %monitor.url,
        mode = %monitor.mode,
        "resolved gateway configuration"
    );
    Ok(monitor)
}
