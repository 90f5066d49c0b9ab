//! Output formatting: table, JSON, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one name per line.

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use gatewatch_core::{ChannelHealth, ChannelState, Connectivity, ReconciledDevice, ReconciledView};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Connectivity label, marked `(stale)` when the data is frozen.
pub fn connectivity_label(device: &ReconciledDevice, color: bool) -> String {
    let label = if device.stale {
        format!("{} (stale)", device.connectivity)
    } else {
        device.connectivity.to_string()
    };
    if !color {
        return label;
    }
    match device.connectivity {
        Connectivity::Online => label.green().to_string(),
        Connectivity::Offline => label.red().to_string(),
        Connectivity::Unknown => label.yellow().to_string(),
    }
}

/// One-line channel summary for the status header.
pub fn channel_label(health: &ChannelHealth, color: bool) -> String {
    let mut label = format!("{} channel {}", health.mode, health.state);
    if let Some(err) = health.last_error.as_ref().filter(|_| !health.is_healthy()) {
        label = format!("{label} ({err})");
    }
    if !color {
        return label;
    }
    match health.state {
        ChannelState::Connected => label.green().to_string(),
        ChannelState::Connecting => label.yellow().to_string(),
        ChannelState::Degraded | ChannelState::Disconnected => label.red().to_string(),
    }
}

/// Humanized age, whole seconds only ("1m 5s"). `-` when never seen.
pub fn age_label(age: Option<Duration>) -> String {
    age.map_or_else(
        || "-".into(),
        |age| {
            let secs = Duration::from_secs(age.as_secs());
            if secs.is_zero() {
                "now".into()
            } else {
                humantime::format_duration(secs).to_string()
            }
        },
    )
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    })
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item detail views
/// don't use the `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    Ok(match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => id_fn(data),
    })
}

// ── Reconciled view ──────────────────────────────────────────────────

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Last Seen")]
    age: String,
    #[tabled(rename = "Values")]
    values: String,
    #[tabled(rename = "Error")]
    error: String,
}

impl StatusRow {
    fn new(device: &ReconciledDevice, now: DateTime<Utc>, color: bool) -> Self {
        Self {
            name: device.name().to_owned(),
            kind: device.device.kind.to_string(),
            address: format!("{}:{}", device.device.ip, device.device.port),
            state: connectivity_label(device, color),
            age: age_label(device.age(now)),
            values: device
                .values
                .iter()
                .map(|(name, reading)| format!("{name}={reading}"))
                .collect::<Vec<_>>()
                .join("\n"),
            error: device.error.clone().unwrap_or_default(),
        }
    }
}

/// Render a reconciled view. Structured formats serialize it whole; the
/// table shows one row per device, or the reason there is no data.
pub fn render_view(
    format: &OutputFormat,
    view: &ReconciledView,
    color: bool,
) -> Result<String, CliError> {
    let now = Utc::now();
    match (format, view) {
        (OutputFormat::Table, ReconciledView::NoData { last_error }) => Ok(format!(
            "No data: device list not loaded ({})",
            last_error.as_deref().unwrap_or("no response yet")
        )),
        (OutputFormat::Plain, ReconciledView::NoData { .. }) => Ok(String::new()),
        (OutputFormat::Json, _) => Ok(serde_json::to_string_pretty(view)?),
        (OutputFormat::JsonCompact, _) => Ok(serde_json::to_string(view)?),
        (_, ReconciledView::Devices { devices }) => render_list(
            format,
            devices,
            |d| StatusRow::new(d, now, color),
            |d| d.name().to_owned(),
        ),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use gatewatch_core::{Device, DeviceKind, Reading, Readings};

    use super::*;

    fn entry(connectivity: Connectivity, stale: bool) -> ReconciledDevice {
        let mut values = Readings::new();
        values.insert("temperature".into(), Reading::Number(25.5));
        ReconciledDevice {
            device: Arc::new(Device::new("D1", DeviceKind::Scale, "10.0.0.2")),
            connectivity,
            values,
            error: None,
            last_seen: None,
            last_status: None,
            stale,
        }
    }

    #[test]
    fn stale_devices_are_marked() {
        assert_eq!(
            connectivity_label(&entry(Connectivity::Unknown, true), false),
            "unknown (stale)"
        );
        assert_eq!(
            connectivity_label(&entry(Connectivity::Online, false), false),
            "online"
        );
    }

    #[test]
    fn ages_are_whole_seconds() {
        assert_eq!(age_label(None), "-");
        assert_eq!(age_label(Some(Duration::from_millis(300))), "now");
        assert_eq!(age_label(Some(Duration::from_millis(65_400))), "1m 5s");
    }

    #[test]
    fn table_shows_values_with_two_decimals() {
        let view = ReconciledView::Devices {
            devices: vec![entry(Connectivity::Online, false)],
        };
        let table = render_view(&OutputFormat::Table, &view, false).unwrap();
        assert!(table.contains("temperature=25.50"));
        assert!(table.contains("10.0.0.2:502"));
    }

    #[test]
    fn no_data_is_explained() {
        let view = ReconciledView::NoData {
            last_error: Some("connection refused".into()),
        };
        let text = render_view(&OutputFormat::Table, &view, false).unwrap();
        assert!(text.contains("connection refused"));
        assert_eq!(render_view(&OutputFormat::Plain, &view, false).unwrap(), "");
    }
}
