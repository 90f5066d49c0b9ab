//! Shared helpers for command handlers.

use std::io::{self, IsTerminal};

use gatewatch_core::{DeviceKind, PmParam, RegisterOffset};

use crate::cli::KindArg;
use crate::error::CliError;

impl From<KindArg> for DeviceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Oee => Self::Oee,
            KindArg::Pm => Self::Pm,
            KindArg::Scale => Self::Scale,
        }
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to prompt on, `--yes` is required.
pub fn confirm(action: &str, message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(io::Error::other(e)))
}

/// Parse `NAME=ADDRESS`. The address is decimal, or hex with a `0x` prefix.
pub fn parse_pm_param(raw: &str) -> Result<PmParam, CliError> {
    let invalid = |reason: &str| CliError::Validation {
        field: "pm-param".into(),
        reason: format!("{reason}: '{raw}'"),
    };

    let (name, address) = raw
        .split_once('=')
        .ok_or_else(|| invalid("expected NAME=ADDRESS"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("parameter name is empty"));
    }

    let address = address.trim();
    let value = if address.starts_with("0x") || address.starts_with("0X") {
        address
            .parse::<RegisterOffset>()
            .map(RegisterOffset::value)
            .map_err(|_| invalid("address is not valid hex"))?
    } else {
        address
            .parse::<u32>()
            .map_err(|_| invalid("address is not a number"))?
    };
    let address = u16::try_from(value).map_err(|_| invalid("address exceeds 65535"))?;

    Ok(PmParam::new(name, address))
}

pub fn parse_pm_params(raw: &[String]) -> Result<Vec<PmParam>, CliError> {
    raw.iter().map(|p| parse_pm_param(p)).collect()
}
