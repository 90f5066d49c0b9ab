// ── Command API ──
//
// Registry writes flow through a unified `Command` enum. Once the
// dashboard is running, a single processor task executes them in order.

use std::sync::Arc;

use crate::error::CoreError;
use crate::model::{Device, ReconciledView};

/// A command plus the channel its result is sent back on.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// Every write the presentation layer can issue.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateDevice(Device),
    UpdateDevice { name: String, device: Device },
    DeleteDevice { name: String },
    /// Reload the registry without writing.
    RefreshRegistry,
}

impl Command {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateDevice(_) => "create device",
            Self::UpdateDevice { .. } => "update device",
            Self::DeleteDevice { .. } => "delete device",
            Self::RefreshRegistry => "refresh registry",
        }
    }
}

/// Result of a command: the view recomputed after the registry reload.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub view: Arc<ReconciledView>,
}
