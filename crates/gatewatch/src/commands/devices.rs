//! Device command handlers.

use std::sync::Arc;

use tabled::Tabled;

use gatewatch_core::{Dashboard, Device, DeviceKind, DeviceList, RegisterOffset};

use crate::cli::{DeviceAddArgs, DeviceUpdateArgs, DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Port")]
    port: u16,
    #[tabled(rename = "Slave")]
    slave_id: u8,
    #[tabled(rename = "Offset")]
    offset: String,
    #[tabled(rename = "Params")]
    params: String,
}

impl From<&Arc<Device>> for DeviceRow {
    fn from(d: &Arc<Device>) -> Self {
        Self {
            name: d.name.clone(),
            kind: d.kind.to_string(),
            ip: d.ip.clone(),
            port: d.port,
            slave_id: d.slave_id,
            offset: d.offset.to_string(),
            params: params_label(d),
        }
    }
}

fn params_label(d: &Device) -> String {
    match (&d.pm_params, d.kind) {
        (Some(params), _) => format!("{} custom", params.len()),
        (None, DeviceKind::Pm) => "defaults".into(),
        (None, _) => "-".into(),
    }
}

fn detail(d: &Arc<Device>) -> String {
    let range = d.register_range();
    let mut lines = vec![
        format!("Name:      {}", d.name),
        format!("Type:      {}", d.kind),
        format!("IP:        {}", d.ip),
        format!("Port:      {}", d.port),
        format!("Slave ID:  {}", d.slave_id),
        format!("Offset:    {}", d.offset),
        format!("Registers: {}..{}", d.offset, RegisterOffset::new(range.end)),
    ];
    if let Some(ref params) = d.pm_params {
        lines.push("PM params:".into());
        lines.extend(
            params
                .iter()
                .map(|p| format!("  {:<20} {}", p.name, p.address)),
        );
    } else if d.kind == DeviceKind::Pm {
        lines.push("PM params: gateway defaults".into());
    }
    lines.join("\n")
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Load the device list, failing if the gateway never answered.
async fn load_devices(dashboard: &Dashboard) -> Result<DeviceList, CliError> {
    dashboard.refresh_registry().await?;
    dashboard
        .registry_state()
        .devices
        .ok_or_else(|| CliError::GatewayUnavailable {
            reason: "device list not loaded".into(),
        })
}

fn find(devices: &DeviceList, name: &str) -> Result<Arc<Device>, CliError> {
    devices
        .iter()
        .find(|d| d.name == name)
        .cloned()
        .ok_or_else(|| CliError::device_not_found(name))
}

async fn build_new_device(dashboard: &Dashboard, args: DeviceAddArgs) -> Result<Device, CliError> {
    let kind = DeviceKind::from(args.kind);
    let mut device = Device::new(args.name, kind, args.ip);
    device.port = args.port;
    device.slave_id = args.slave_id;

    if args.pm_defaults {
        if kind != DeviceKind::Pm {
            return Err(CliError::Validation {
                field: "pm-defaults".into(),
                reason: "only pm devices carry a parameter map".into(),
            });
        }
        device.pm_params = Some(dashboard.pm_defaults().await?);
    } else if !args.pm_params.is_empty() {
        device.pm_params = Some(util::parse_pm_params(&args.pm_params)?);
    }
    Ok(device)
}

fn apply_update(current: &Device, args: DeviceUpdateArgs) -> Result<Device, CliError> {
    let mut device = current.clone();
    if let Some(name) = args.rename {
        device.name = name;
    }
    if let Some(kind) = args.kind {
        device.kind = kind.into();
    }
    if let Some(ip) = args.ip {
        device.ip = ip;
    }
    if let Some(port) = args.port {
        device.port = port;
    }
    if let Some(slave_id) = args.slave_id {
        device.slave_id = slave_id;
    }
    if args.clear_pm_params {
        device.pm_params = None;
    } else if !args.pm_params.is_empty() {
        device.pm_params = Some(util::parse_pm_params(&args.pm_params)?);
    }
    if device.kind != DeviceKind::Pm && args.kind.is_some() {
        // Leaving pm drops the parameter map.
        device.pm_params = None;
    }
    Ok(device)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List { kind } => {
            let devices = load_devices(dashboard).await?;
            let shown: Vec<Arc<Device>> = devices
                .iter()
                .filter(|d| kind.is_none_or(|k| d.kind == DeviceKind::from(k)))
                .cloned()
                .collect();
            let out = output::render_list(
                &global.output,
                &shown,
                |d| DeviceRow::from(d),
                |d| d.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Get { name } => {
            let devices = load_devices(dashboard).await?;
            let device = find(&devices, &name)?;
            let out = output::render_single(&global.output, &device, detail, |d| d.name.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Add(args) => {
            let device = build_new_device(dashboard, args).await?;
            let name = device.name.clone();
            let view = dashboard.create_device(device).await?;
            if !global.quiet {
                eprintln!("Device '{name}' added ({} configured)", view.len());
            }
            Ok(())
        }

        DevicesCommand::Update(args) => {
            let devices = load_devices(dashboard).await?;
            let current = find(&devices, &args.name)?;
            let name = args.name.clone();
            let edited = apply_update(&current, args)?;
            dashboard.update_device(&name, edited).await?;
            if !global.quiet {
                eprintln!("Device '{name}' updated");
            }
            Ok(())
        }

        DevicesCommand::Remove { name } => {
            if !util::confirm(
                "devices remove",
                &format!("Remove device '{name}'?"),
                global.yes,
            )? {
                return Ok(());
            }
            dashboard.delete_device(&name).await?;
            if !global.quiet {
                eprintln!("Device '{name}' removed");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gatewatch_core::PmParam;

    use super::*;
    use crate::cli::KindArg;

    fn update_args(name: &str) -> DeviceUpdateArgs {
        DeviceUpdateArgs {
            name: name.into(),
            rename: None,
            kind: None,
            ip: None,
            port: None,
            slave_id: None,
            pm_params: Vec::new(),
            clear_pm_params: false,
        }
    }

    fn power_meter() -> Device {
        let mut device = Device::new("PM-1", DeviceKind::Pm, "10.0.0.5");
        device.pm_params = Some(vec![PmParam::new("voltage_l1", 3027)]);
        device
    }

    #[test]
    fn update_only_touches_given_fields() {
        let current = power_meter();
        let edited = apply_update(
            &current,
            DeviceUpdateArgs {
                port: Some(503),
                ..update_args("PM-1")
            },
        )
        .unwrap();

        assert_eq!(edited.port, 503);
        assert_eq!(edited.ip, current.ip);
        assert_eq!(edited.pm_params, current.pm_params);
        assert_eq!(edited.offset, current.offset);
    }

    #[test]
    fn leaving_pm_drops_the_parameter_map() {
        let edited = apply_update(
            &power_meter(),
            DeviceUpdateArgs {
                kind: Some(KindArg::Scale),
                ..update_args("PM-1")
            },
        )
        .unwrap();
        assert_eq!(edited.kind, DeviceKind::Scale);
        assert_eq!(edited.pm_params, None);
    }

    #[test]
    fn params_column() {
        assert_eq!(params_label(&power_meter()), "1 custom");
        assert_eq!(
            params_label(&Device::new("PM-2", DeviceKind::Pm, "10.0.0.6")),
            "defaults"
        );
        assert_eq!(
            params_label(&Device::new("S-1", DeviceKind::Scale, "10.0.0.7")),
            "-"
        );
    }
}
