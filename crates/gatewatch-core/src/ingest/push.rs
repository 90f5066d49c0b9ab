// ── Push ingestion ──
//
// Drives a `PushHandle` and forwards its events into the sink. Every
// frame is a complete dump, so a reconnect waits for the next one before
// the channel counts as connected again.

use chrono::Utc;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use gatewatch_api::{PushEvent, PushHandle, ReconnectConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::{TelemetrySink, TelemetrySource};
use crate::config::TelemetryMode;
use crate::convert::snapshots_from_payload;
use crate::error::CoreError;

/// WebSocket push ingestion.
pub struct PushSource {
    ws_url: Url,
    reconnect: ReconnectConfig,
}

impl PushSource {
    pub fn new(ws_url: Url, reconnect: ReconnectConfig) -> Self {
        Self { ws_url, reconnect }
    }

    async fn run_loop(self, sink: TelemetrySink, cancel: CancellationToken) {
        let mut handle = PushHandle::connect(self.ws_url, self.reconnect, cancel.child_token());

        loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                event = handle.next_event() => event,
            };

            let Some(event) = event else {
                warn!("push channel gave up reconnecting");
                break;
            };
            apply(&sink, event);
        }

        handle.shutdown().await;
        debug!("push ingest exiting");
    }
}

fn apply(sink: &TelemetrySink, event: PushEvent) {
    match event {
        PushEvent::Connected => {
            info!("telemetry push channel connected");
            sink.mark_connected();
        }
        PushEvent::Snapshot(payload) => sink.publish(snapshots_from_payload(payload, Utc::now())),
        PushEvent::Malformed { error } => {
            let err = CoreError::ParseError { message: error };
            warn!(error = %err, "malformed push frame discarded");
            sink.record_failure(&err);
        }
        PushEvent::Disconnected { reason } => {
            let err = CoreError::TelemetryChannelDown { reason };
            info!(error = %err, "telemetry push channel disconnected");
            sink.mark_disconnected(&err.to_string());
        }
    }
}

impl TelemetrySource for PushSource {
    fn mode(&self) -> TelemetryMode {
        TelemetryMode::Push
    }

    fn run(self: Box<Self>, sink: TelemetrySink, cancel: CancellationToken) -> BoxFuture<'static, ()> {
        (*self).run_loop(sink, cancel).boxed()
    }
}
