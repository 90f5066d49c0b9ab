//! One-shot reconciled view.

use std::sync::Arc;

use gatewatch_core::{Connectivity, Dashboard, DeviceFilter, ReconciledView, Selection};

use crate::cli::{GlobalOpts, OutputFormat, StateArg, StatusArgs, ViewFilterArgs};
use crate::error::CliError;
use crate::output;

impl From<StateArg> for DeviceFilter {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Online => Self::ByConnectivity(Connectivity::Online),
            StateArg::Offline => Self::ByConnectivity(Connectivity::Offline),
            StateArg::Unknown => Self::ByConnectivity(Connectivity::Unknown),
            StateArg::Stale => Self::Stale,
        }
    }
}

/// Push `--select` into the dashboard's selection. An empty list shows all.
pub fn apply_selection(dashboard: &Dashboard, args: &ViewFilterArgs) -> Arc<ReconciledView> {
    if args.select.is_empty() {
        dashboard.set_show_all(true)
    } else {
        dashboard.apply_filter(Selection::only(args.select.iter().cloned()))
    }
}

/// Narrow an already-selected view by `--kind` and `--state`.
pub fn narrow(view: &ReconciledView, args: &ViewFilterArgs) -> ReconciledView {
    let mut view = view.clone();
    if let Some(kind) = args.kind {
        view = DeviceFilter::ByKind(kind.into()).apply(&view);
    }
    if let Some(state) = args.state {
        view = DeviceFilter::from(state).apply(&view);
    }
    view
}

pub async fn handle(
    dashboard: &Dashboard,
    args: StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    dashboard.refresh_registry().await?;

    // Telemetry trouble leaves devices unknown but still lists them.
    if let Err(e) = dashboard.poll_once().await {
        tracing::warn!(error = %e, "telemetry fetch failed");
        if !global.quiet && matches!(global.output, OutputFormat::Table) {
            eprintln!("warning: {e}");
        }
    }

    for name in &args.filter.select {
        if dashboard.reconciled_view().get(name).is_none() {
            tracing::warn!(device = %name, "selected device is not configured");
        }
    }

    let selected = apply_selection(dashboard, &args.filter);
    let view = narrow(&selected, &args.filter);
    let out = output::render_view(&global.output, &view, output::should_color(&global.color))?;
    output::print_output(&out, global.quiet);
    Ok(())
}
