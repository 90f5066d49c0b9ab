//! Config subcommand handlers.

use std::io::{self, IsTerminal};

use dialoguer::{Input, Select};
use serde::Serialize;
use tabled::Tabled;

use gatewatch_core::{DEFAULT_GATEWAY_URL, TelemetryMode};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

#[derive(Serialize)]
struct ProfileEntry<'a> {
    name: &'a str,
    default: bool,
    #[serde(flatten)]
    profile: &'a Profile,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Gateway")]
    gateway: String,
    #[tabled(rename = "Mode")]
    mode: String,
}

fn render_config(format: &OutputFormat, cfg: &Config) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Table => toml::to_string_pretty(cfg).map_err(|e| CliError::Validation {
            field: "config".into(),
            reason: format!("failed to serialize config: {e}"),
        })?,
        OutputFormat::Json => serde_json::to_string_pretty(cfg)?,
        OutputFormat::JsonCompact => serde_json::to_string(cfg)?,
        OutputFormat::Plain => cfg.profiles.keys().cloned().collect::<Vec<_>>().join("\n"),
    })
}

/// Profile from global flags alone (`--yes`).
fn profile_from_flags(global: &GlobalOpts) -> Profile {
    Profile {
        mode: global.mode.map(|m| TelemetryMode::from(m).to_string()),
        timeout: global.timeout,
        insecure: global.insecure.then_some(true),
        ..Profile::new(global.gateway.as_deref().unwrap_or(DEFAULT_GATEWAY_URL))
    }
}

/// Interactive wizard: name, gateway URL, telemetry channel.
fn prompt_profile(global: &GlobalOpts) -> Result<(String, Profile), CliError> {
    let name: String = Input::new()
        .with_prompt("Profile name")
        .default(global.profile.clone().unwrap_or_else(|| "default".into()))
        .interact_text()
        .map_err(prompt_err)?;

    let gateway: String = Input::new()
        .with_prompt("Gateway API URL")
        .default(
            global
                .gateway
                .clone()
                .unwrap_or_else(|| DEFAULT_GATEWAY_URL.into()),
        )
        .interact_text()
        .map_err(prompt_err)?;

    let modes = &["push (WebSocket)", "poll (GET /data)"];
    let mode = if Select::new()
        .with_prompt("Telemetry channel")
        .items(modes)
        .default(0)
        .interact()
        .map_err(prompt_err)?
        == 0
    {
        TelemetryMode::Push
    } else {
        TelemetryMode::Poll
    };

    let poll_interval_ms = if mode == TelemetryMode::Poll {
        let ms: u64 = Input::new()
            .with_prompt("Poll interval (ms)")
            .default(2000)
            .interact_text()
            .map_err(prompt_err)?;
        Some(ms)
    } else {
        None
    };

    let mut profile = profile_from_flags(global);
    profile.gateway = gateway;
    profile.mode = Some(mode.to_string());
    profile.poll_interval_ms = poll_interval_ms;
    Ok((name, profile))
}

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load_config()?;

    let (name, profile) = if global.yes {
        (
            global.profile.clone().unwrap_or_else(|| "default".into()),
            profile_from_flags(global),
        )
    } else if io::stdin().is_terminal() {
        eprintln!("gatewatch configuration wizard");
        eprintln!("   Config path: {}\n", config::config_path().display());
        prompt_profile(global)?
    } else {
        return Err(CliError::NonInteractiveRequiresYes {
            action: "config init".into(),
        });
    };

    // Reject a profile that would not load.
    config::profile_to_monitor_config(&profile, &cfg.defaults)?;

    if cfg.profiles.contains_key(&name)
        && !util::confirm(
            "config init",
            &format!("Replace existing profile '{name}'?"),
            global.yes,
        )?
    {
        return Ok(());
    }

    cfg.profiles.insert(name.clone(), profile);
    let default_exists = cfg
        .default_profile
        .as_ref()
        .is_some_and(|d| cfg.profiles.contains_key(d));
    if !default_exists {
        cfg.default_profile = Some(name.clone());
    }

    let path = config::save_config(&cfg)?;
    if !global.quiet {
        eprintln!("Saved profile '{name}' to {}", path.display());
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            output::print_output(&render_config(&global.output, &cfg)?, global.quiet);
            Ok(())
        }

        ConfigCommand::Init => init(global),

        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let active = config::active_profile_name(global, &cfg);
            let entries: Vec<ProfileEntry<'_>> = cfg
                .profiles
                .iter()
                .map(|(name, profile)| ProfileEntry {
                    name,
                    default: *name == active,
                    profile,
                })
                .collect();
            let out = output::render_list(
                &global.output,
                &entries,
                |e| ProfileRow {
                    marker: if e.default { "*" } else { "" },
                    name: e.name.to_owned(),
                    gateway: e.profile.gateway.clone(),
                    mode: e
                        .profile
                        .mode
                        .clone()
                        .unwrap_or_else(|| cfg.defaults.mode.clone()),
                },
                |e| e.name.to_owned(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
