//! Live reconciled view until Ctrl-C.

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use chrono::Local;

use gatewatch_core::{Dashboard, ReconciledView, ViewStream};

use crate::cli::{GlobalOpts, OutputFormat, ViewFilterArgs, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::status;

/// Clear screen and home the cursor.
const CLEAR: &str = "\x1b[2J\x1b[H";

struct Frame<'a> {
    dashboard: &'a Dashboard,
    filter: &'a ViewFilterArgs,
    global: &'a GlobalOpts,
    color: bool,
    redraw: bool,
}

impl Frame<'_> {
    fn render(&self, view: &ReconciledView) -> Result<(), CliError> {
        if self.global.quiet {
            return Ok(());
        }
        let view = status::narrow(view, self.filter);
        let body = output::render_view(&self.global.output, &view, self.color)?;

        let mut stdout = io::stdout().lock();
        if self.redraw {
            let health = self.dashboard.channel_health();
            write!(stdout, "{CLEAR}")?;
            writeln!(
                stdout,
                "{}  |  {}  |  {}\n",
                self.dashboard.config().url,
                output::channel_label(&health, self.color),
                Local::now().format("%H:%M:%S"),
            )?;
        }
        writeln!(stdout, "{body}")?;
        stdout.flush()?;
        Ok(())
    }
}

async fn run_loop(frame: &Frame<'_>, mut stream: ViewStream) -> Result<(), CliError> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut view: Arc<ReconciledView> = stream.latest();
    loop {
        frame.render(&view)?;
        tokio::select! {
            _ = &mut ctrl_c => return Ok(()),
            next = stream.changed() => match next {
                Some(next) => view = next,
                None => return Ok(()),
            },
        }
    }
}

pub async fn handle(
    dashboard: &Dashboard,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    dashboard.start().await?;
    status::apply_selection(dashboard, &args.filter);

    let frame = Frame {
        dashboard,
        filter: &args.filter,
        global,
        color: output::should_color(&global.color),
        redraw: matches!(global.output, OutputFormat::Table) && io::stdout().is_terminal(),
    };
    let result = run_loop(&frame, dashboard.subscribe_filtered()).await;

    dashboard.shutdown().await;
    result
}
