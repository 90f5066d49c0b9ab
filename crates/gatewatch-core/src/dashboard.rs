// ── Dashboard façade ──
//
// Lifecycle management for monitoring one gateway: registry loading,
// telemetry ingestion, view reconciliation, and command routing. The
// presentation layer holds a `Dashboard` value and nothing else.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gatewatch_api::GatewayClient;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::MonitorConfig;
use crate::convert::snapshots_from_payload;
use crate::error::CoreError;
use crate::ingest::{ChannelHealth, TelemetrySink, TelemetryState, source_for};
use crate::model::{Device, PmParam, ReconciledView};
use crate::registry::{DeviceRegistry, RegistryState};
use crate::selection::Selection;
use crate::store::{LiveState, RebuildInputs};
use crate::stream::ViewStream;

const COMMAND_CHANNEL_SIZE: usize = 16;

// ── Lifecycle ────────────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Lifecycle {
    /// Constructed; commands run inline.
    Idle,
    /// Background tasks are running.
    Running,
    /// Shut down. Commands are refused.
    Stopped,
}

// ── Dashboard ────────────────────────────────────────────────────

/// The entry point for the presentation layer.
///
/// Cheaply cloneable via `Arc<DashboardInner>`. Construct with
/// [`new`](Self::new), then either call [`start`](Self::start) for a live
/// view or drive it by hand ([`refresh_registry`](Self::refresh_registry),
/// [`poll_once`](Self::poll_once)) for one-shot use.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: MonitorConfig,
    client: GatewayClient,
    registry: DeviceRegistry,
    sink: TelemetrySink,
    live: LiveState,
    lifecycle: watch::Sender<Lifecycle>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Dashboard {
    /// Build a dashboard from configuration. Does not touch the network.
    pub fn new(config: MonitorConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let client = GatewayClient::new(config.url.clone(), &config.transport())?;
        Ok(Self::with_client(config, client))
    }

    /// Build a dashboard around an existing client.
    pub fn with_client(config: MonitorConfig, client: GatewayClient) -> Self {
        let registry = DeviceRegistry::new(client.clone());
        let sink = TelemetrySink::new(config.mode, config.failure_threshold);
        let (lifecycle, _) = watch::channel(Lifecycle::Idle);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Self {
            inner: Arc::new(DashboardInner {
                config,
                client,
                registry,
                sink,
                live: LiveState::new(),
                lifecycle,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub fn lifecycle(&self) -> watch::Receiver<Lifecycle> {
        self.inner.lifecycle.subscribe()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Load the registry and spawn the background tasks: telemetry
    /// ingestion, view reconciliation, periodic registry reload and the
    /// command processor.
    ///
    /// A registry that cannot be reached is not fatal; the view shows
    /// `NoData` until a later reload succeeds.
    pub async fn start(&self) -> Result<(), CoreError> {
        let lifecycle = *self.inner.lifecycle.borrow();
        match lifecycle {
            Lifecycle::Running => return Ok(()),
            Lifecycle::Stopped => return Err(CoreError::Stopped),
            Lifecycle::Idle => {}
        }

        let source = source_for(&self.inner.config, self.inner.client.clone())?;

        if let Err(e) = self.inner.registry.list().await {
            warn!(error = %e, "initial registry load failed, will retry");
        }
        self.rebuild();

        let mut handles = self.inner.task_handles.lock().await;
        let cancel = self.inner.cancel.clone();

        handles.push(tokio::spawn(
            source.run(self.inner.sink.clone(), cancel.child_token()),
        ));
        handles.push(tokio::spawn(reconcile_task(self.clone(), cancel.clone())));

        let refresh = self.inner.config.registry_refresh_interval;
        if !refresh.is_zero() {
            handles.push(tokio::spawn(registry_refresh_task(
                self.clone(),
                refresh,
                cancel.clone(),
            )));
        }

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            handles.push(tokio::spawn(command_processor_task(self.clone(), rx)));
        }

        self.inner.lifecycle.send_replace(Lifecycle::Running);
        info!(gateway = %self.inner.config.url, mode = %self.inner.config.mode, "dashboard started");
        Ok(())
    }

    /// Cancel every background task and wait for them to exit.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }

        self.inner.lifecycle.send_replace(Lifecycle::Stopped);
        debug!("dashboard stopped");
    }

    // ── Views ────────────────────────────────────────────────────

    /// The latest reconciled view.
    pub fn reconciled_view(&self) -> Arc<ReconciledView> {
        self.inner.live.view()
    }

    /// The reconciled view narrowed by the current selection.
    pub fn filtered_view(&self) -> Arc<ReconciledView> {
        self.inner.live.filtered_view()
    }

    pub fn channel_health(&self) -> ChannelHealth {
        self.inner.sink.health()
    }

    pub fn registry_state(&self) -> RegistryState {
        self.inner.registry.state()
    }

    pub fn selection(&self) -> Selection {
        self.inner.live.selection()
    }

    /// Replace the selection. Returns the resulting filtered view.
    pub fn apply_filter(&self, selection: Selection) -> Arc<ReconciledView> {
        self.inner.live.apply_selection(selection)
    }

    /// Toggle "show all". Turning it on resets the selected set to every
    /// device in the current view.
    pub fn set_show_all(&self, on: bool) -> Arc<ReconciledView> {
        self.inner.live.set_show_all(on)
    }

    pub fn subscribe_view(&self) -> ViewStream {
        self.inner.live.subscribe_view()
    }

    pub fn subscribe_filtered(&self) -> ViewStream {
        self.inner.live.subscribe_filtered()
    }

    pub fn subscribe_telemetry(&self) -> watch::Receiver<TelemetryState> {
        self.inner.sink.subscribe()
    }

    // ── Registry commands ────────────────────────────────────────

    /// Execute a registry command and return the refreshed view.
    ///
    /// Routed through the command processor once started; run inline
    /// before that.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        let lifecycle = *self.inner.lifecycle.borrow();
        match lifecycle {
            Lifecycle::Stopped => return Err(CoreError::Stopped),
            Lifecycle::Idle => {}
            Lifecycle::Running => {
                let (tx, rx) = oneshot::channel();
                self.inner
                    .command_tx
                    .send(CommandEnvelope {
                        command: cmd,
                        response_tx: tx,
                    })
                    .await
                    .map_err(|_| CoreError::Stopped)?;
                return rx.await.map_err(|_| CoreError::Stopped)?;
            }
        }
        route_command(self, cmd).await
    }

    pub async fn create_device(&self, device: Device) -> Result<Arc<ReconciledView>, CoreError> {
        Ok(self.execute(Command::CreateDevice(device)).await?.view)
    }

    pub async fn update_device(
        &self,
        name: &str,
        device: Device,
    ) -> Result<Arc<ReconciledView>, CoreError> {
        Ok(self
            .execute(Command::UpdateDevice {
                name: name.to_owned(),
                device,
            })
            .await?
            .view)
    }

    pub async fn delete_device(&self, name: &str) -> Result<Arc<ReconciledView>, CoreError> {
        Ok(self
            .execute(Command::DeleteDevice {
                name: name.to_owned(),
            })
            .await?
            .view)
    }

    pub async fn refresh_registry(&self) -> Result<Arc<ReconciledView>, CoreError> {
        Ok(self.execute(Command::RefreshRegistry).await?.view)
    }

    /// The gateway's default power-meter parameter map.
    pub async fn pm_defaults(&self) -> Result<Vec<PmParam>, CoreError> {
        self.inner.registry.pm_defaults().await
    }

    // ── One-shot use ─────────────────────────────────────────────

    /// Fetch `GET /data` once, publish it, and return the new view.
    ///
    /// Used by one-shot consumers that never call [`start`](Self::start).
    /// A failure is recorded in the channel health like any poll cycle.
    pub async fn poll_once(&self) -> Result<Arc<ReconciledView>, CoreError> {
        match self.inner.client.fetch_snapshot().await {
            Ok(payload) => {
                self.inner
                    .sink
                    .publish(snapshots_from_payload(payload, Utc::now()));
                Ok(self.rebuild())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.inner.sink.record_failure(&err);
                self.rebuild();
                Err(err)
            }
        }
    }

    /// Recompute the view from the current inputs.
    fn rebuild(&self) -> Arc<ReconciledView> {
        self.inner.live.rebuild(
            || RebuildInputs {
                registry: self.inner.registry.state(),
                telemetry: self.inner.sink.current(),
                now: Utc::now(),
            },
            self.inner.config.staleness_threshold,
        )
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Recompute the view whenever the registry or telemetry changes, and on
/// a fixed tick so ageing snapshots turn stale without new input.
async fn reconcile_task(dashboard: Dashboard, cancel: CancellationToken) {
    let mut registry_rx = dashboard.inner.registry.subscribe();
    let mut telemetry_rx = dashboard.inner.sink.subscribe();
    let mut tick = tokio::time::interval(dashboard.inner.config.view_tick);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = registry_rx.changed() => if changed.is_err() { break },
            changed = telemetry_rx.changed() => if changed.is_err() { break },
            _ = tick.tick() => {}
        }
        dashboard.rebuild();
    }
}

/// Periodically reload the registry.
async fn registry_refresh_task(dashboard: Dashboard, every: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(every);
    interval.tick().await; // start() already loaded once

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = dashboard.inner.registry.list().await {
                    warn!(error = %e, "periodic registry reload failed");
                }
            }
        }
    }
}

/// Execute commands one at a time, in arrival order.
async fn command_processor_task(dashboard: Dashboard, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = dashboard.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&dashboard, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────

async fn route_command(dashboard: &Dashboard, cmd: Command) -> Result<CommandResult, CoreError> {
    let registry = &dashboard.inner.registry;
    debug!(command = cmd.label(), "executing command");

    let outcome = match cmd {
        Command::CreateDevice(device) => registry.create(&device).await,
        Command::UpdateDevice { name, device } => registry.update(&name, &device).await,
        Command::DeleteDevice { name } => registry.delete(&name).await,
        Command::RefreshRegistry => registry.list().await,
    };

    // Rebuild either way so a failed load shows up in a NoData view.
    let view = dashboard.rebuild();
    outcome.map(|_| CommandResult { view })
}
