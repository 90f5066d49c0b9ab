// ── Telemetry ingestion ──
//
// Two strategies (push, poll) behind one `TelemetrySource` trait. Both
// publish into a `TelemetrySink`: the latest full snapshot map plus the
// channel's health. Failures never escape a source; they only change
// the health the sink reports.

mod poll;
mod push;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use gatewatch_api::GatewayClient;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{MonitorConfig, TelemetryMode};
use crate::error::CoreError;
use crate::model::SnapshotMap;

pub use poll::PollSource;
pub use push::PushSource;

// ── Channel health ───────────────────────────────────────────────────

/// Lifecycle of the active telemetry channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChannelState {
    /// No data received yet on the current connection.
    Connecting,
    Connected,
    /// Too many consecutive failed cycles.
    Degraded,
    /// The push socket is closed; a reconnect is pending.
    Disconnected,
}

/// Health of the active telemetry channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelHealth {
    pub mode: TelemetryMode,
    pub state: ChannelState,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    /// When the last full snapshot was applied.
    pub last_update: Option<DateTime<Utc>>,
}

impl ChannelHealth {
    pub fn new(mode: TelemetryMode) -> Self {
        Self {
            mode,
            state: ChannelState::Connecting,
            consecutive_failures: 0,
            last_error: None,
            last_update: None,
        }
    }

    /// Only a connected channel's snapshots are trusted.
    pub fn is_healthy(&self) -> bool {
        self.state == ChannelState::Connected
    }

    /// The channel failure as a typed error, when the channel is down.
    pub fn down_error(&self) -> Option<CoreError> {
        match self.state {
            ChannelState::Degraded | ChannelState::Disconnected => {
                Some(CoreError::TelemetryChannelDown {
                    reason: self
                        .last_error
                        .clone()
                        .unwrap_or_else(|| self.state.to_string()),
                })
            }
            ChannelState::Connecting | ChannelState::Connected => None,
        }
    }
}

/// Everything a source publishes.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryState {
    pub snapshots: Arc<SnapshotMap>,
    pub health: ChannelHealth,
}

// ── Sink ─────────────────────────────────────────────────────────────

/// Publication point for the active source.
///
/// Cheaply cloneable; every update replaces the whole state.
#[derive(Clone)]
pub struct TelemetrySink {
    tx: Arc<watch::Sender<TelemetryState>>,
    failure_threshold: u32,
}

impl TelemetrySink {
    pub fn new(mode: TelemetryMode, failure_threshold: u32) -> Self {
        let (tx, _) = watch::channel(TelemetryState {
            snapshots: Arc::new(SnapshotMap::new()),
            health: ChannelHealth::new(mode),
        });
        Self {
            tx: Arc::new(tx),
            failure_threshold: failure_threshold.max(1),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TelemetryState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> TelemetryState {
        self.tx.borrow().clone()
    }

    pub fn health(&self) -> ChannelHealth {
        self.tx.borrow().health.clone()
    }

    /// Replace the snapshot map and mark the channel connected.
    pub fn publish(&self, snapshots: SnapshotMap) {
        let health = self.health();
        self.tx.send_replace(TelemetryState {
            snapshots: Arc::new(snapshots),
            health: ChannelHealth {
                state: ChannelState::Connected,
                consecutive_failures: 0,
                last_error: None,
                last_update: Some(Utc::now()),
                ..health
            },
        });
    }

    /// The push socket opened. The channel stays `Connecting`, and the
    /// kept snapshots untrusted, until the first dump on this connection
    /// is published.
    pub fn mark_connected(&self) {
        self.update_health(|health| {
            health.state = ChannelState::Connecting;
            health.consecutive_failures = 0;
            health.last_error = None;
        });
    }

    /// The push socket closed.
    pub fn mark_disconnected(&self, reason: &str) {
        self.update_health(|health| {
            health.state = ChannelState::Disconnected;
            health.consecutive_failures = health.consecutive_failures.saturating_add(1);
            health.last_error = Some(reason.to_owned());
        });
    }

    /// One failed cycle. Last-known snapshots are retained; the channel
    /// degrades once the failure threshold is reached.
    pub fn record_failure(&self, error: &CoreError) {
        let threshold = self.failure_threshold;
        self.update_health(|health| {
            health.consecutive_failures = health.consecutive_failures.saturating_add(1);
            health.last_error = Some(error.to_string());
            if health.consecutive_failures >= threshold && health.state != ChannelState::Degraded {
                warn!(
                    failures = health.consecutive_failures,
                    error = %error,
                    "telemetry channel degraded"
                );
                health.state = ChannelState::Degraded;
            }
        });
    }

    fn update_health(&self, f: impl FnOnce(&mut ChannelHealth)) {
        let mut next = self.current();
        f(&mut next.health);
        self.tx.send_replace(next);
    }
}

// ── Source trait ─────────────────────────────────────────────────────

/// A telemetry ingestion strategy.
///
/// `run` drives the channel until `cancel` fires. It never returns an
/// error: every failure is reported through the sink.
pub trait TelemetrySource: Send + Sync {
    fn mode(&self) -> TelemetryMode;

    fn run(
        self: Box<Self>,
        sink: TelemetrySink,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, ()>;
}

/// Build the source selected by `config.mode`.
pub fn source_for(
    config: &MonitorConfig,
    client: GatewayClient,
) -> Result<Box<dyn TelemetrySource>, CoreError> {
    let source: Box<dyn TelemetrySource> = match config.mode {
        TelemetryMode::Push => Box::new(PushSource::new(
            config.push_endpoint()?,
            config.reconnect.clone(),
        )),
        TelemetryMode::Poll => Box::new(PollSource::new(client, config.poll_interval)),
    };
    info!(mode = %source.mode(), "telemetry source selected");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinkStatus, Readings, TelemetrySnapshot};

    fn one_snapshot() -> SnapshotMap {
        let mut map = SnapshotMap::new();
        map.insert(
            "D1".into(),
            TelemetrySnapshot {
                status: LinkStatus::Online,
                values: Readings::new(),
                error: None,
                timestamp: Utc::now(),
            },
        );
        map
    }

    #[test]
    fn starts_connecting_and_unhealthy() {
        let sink = TelemetrySink::new(TelemetryMode::Poll, 3);
        let health = sink.health();
        assert_eq!(health.state, ChannelState::Connecting);
        assert!(!health.is_healthy());
        assert!(health.down_error().is_none());
    }

    #[test]
    fn publish_replaces_map_and_resets_failures() {
        let sink = TelemetrySink::new(TelemetryMode::Poll, 3);
        sink.record_failure(&CoreError::ParseError {
            message: "bad".into(),
        });
        sink.publish(one_snapshot());

        let state = sink.current();
        assert_eq!(state.snapshots.len(), 1);
        assert!(state.health.is_healthy());
        assert_eq!(state.health.consecutive_failures, 0);
        assert!(state.health.last_update.is_some());
    }

    #[test]
    fn degrades_after_threshold_and_keeps_snapshots() {
        let sink = TelemetrySink::new(TelemetryMode::Poll, 3);
        sink.publish(one_snapshot());

        let err = CoreError::RegistryUnavailable {
            reason: "connection refused".into(),
        };
        sink.record_failure(&err);
        sink.record_failure(&err);
        assert!(sink.health().is_healthy());

        sink.record_failure(&err);
        let state = sink.current();
        assert_eq!(state.health.state, ChannelState::Degraded);
        assert_eq!(state.snapshots.len(), 1);
        assert!(matches!(
            state.health.down_error(),
            Some(CoreError::TelemetryChannelDown { .. })
        ));
    }

    #[test]
    fn reconnect_waits_for_a_fresh_dump() {
        let sink = TelemetrySink::new(TelemetryMode::Push, 3);
        sink.publish(one_snapshot());
        sink.mark_disconnected("stream ended");

        sink.mark_connected();
        let state = sink.current();
        assert_eq!(state.health.state, ChannelState::Connecting);
        assert!(!state.health.is_healthy());
        assert_eq!(state.snapshots.len(), 1);

        sink.publish(one_snapshot());
        assert!(sink.health().is_healthy());
    }

    #[test]
    fn disconnect_is_immediately_unhealthy() {
        let sink = TelemetrySink::new(TelemetryMode::Push, 3);
        sink.mark_connected();
        sink.publish(one_snapshot());
        assert!(sink.health().is_healthy());

        sink.mark_disconnected("stream ended");
        let health = sink.health();
        assert_eq!(health.state, ChannelState::Disconnected);
        assert_eq!(health.last_error.as_deref(), Some("stream ended"));
    }
}
