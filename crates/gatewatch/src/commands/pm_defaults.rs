//! Gateway default power-meter parameter map.

use tabled::Tabled;

use gatewatch_core::{Dashboard, PmParam, RegisterOffset};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ParamRow {
    #[tabled(rename = "Parameter")]
    name: String,
    #[tabled(rename = "Address")]
    address: u16,
    #[tabled(rename = "Hex")]
    hex: String,
}

impl From<&PmParam> for ParamRow {
    fn from(p: &PmParam) -> Self {
        Self {
            name: p.name.clone(),
            address: p.address,
            hex: RegisterOffset::new(u32::from(p.address)).to_string(),
        }
    }
}

pub async fn handle(dashboard: &Dashboard, global: &GlobalOpts) -> Result<(), CliError> {
    let params = dashboard.pm_defaults().await?;
    let out = output::render_list(
        &global.output,
        &params,
        |p| ParamRow::from(p),
        |p| format!("{}={}", p.name, p.address),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
