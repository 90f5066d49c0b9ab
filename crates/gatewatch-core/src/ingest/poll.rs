// ── Poll ingestion ──
//
// Issues `GET /data` on a fixed interval. Ticks fire on schedule even when
// earlier fetches are still in flight; each fetch carries a sequence
// number and only a completion newer than the last applied one counts.

use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use gatewatch_api::GatewayClient;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::{TelemetrySink, TelemetrySource};
use crate::config::TelemetryMode;
use crate::convert::snapshots_from_payload;
use crate::error::CoreError;

/// Accepts only completions newer than the last one applied.
#[derive(Debug, Default)]
pub(crate) struct LatestWins {
    applied: Option<u64>,
}

impl LatestWins {
    /// Returns `true` and records `seq` if it supersedes everything seen.
    pub(crate) fn accept(&mut self, seq: u64) -> bool {
        if self.applied.is_some_and(|applied| seq <= applied) {
            return false;
        }
        self.applied = Some(seq);
        true
    }
}

/// Periodic `GET /data` ingestion.
pub struct PollSource {
    client: GatewayClient,
    interval: Duration,
}

impl PollSource {
    pub fn new(client: GatewayClient, interval: Duration) -> Self {
        Self { client, interval }
    }

    async fn run_loop(self, sink: TelemetrySink, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight = JoinSet::new();
        let mut gate = LatestWins::default();
        let mut next_seq: u64 = 0;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                Some(joined) = in_flight.join_next() => match joined {
                    Ok((seq, result)) => {
                        if gate.accept(seq) {
                            apply(&sink, result);
                        } else {
                            debug!(seq, "discarding superseded poll result");
                        }
                    }
                    Err(e) => warn!(error = %e, "poll fetch task failed"),
                },
                _ = ticker.tick() => {
                    next_seq += 1;
                    let seq = next_seq;
                    let client = self.client.clone();
                    trace!(seq, "polling telemetry");
                    in_flight.spawn(async move { (seq, client.fetch_snapshot().await) });
                }
            }
        }

        in_flight.shutdown().await;
        debug!("poll loop exiting");
    }
}

fn apply(sink: &TelemetrySink, result: Result<gatewatch_api::SnapshotPayload, gatewatch_api::Error>) {
    match result {
        Ok(payload) => {
            let snapshots = snapshots_from_payload(payload, Utc::now());
            trace!(devices = snapshots.len(), "poll snapshot applied");
            sink.publish(snapshots);
        }
        Err(e) => {
            let err = CoreError::from(e);
            match &err {
                CoreError::ParseError { .. } => {
                    warn!(error = %err, "malformed telemetry payload discarded");
                }
                _ => warn!(error = %err, "telemetry poll failed, keeping last values"),
            }
            sink.record_failure(&err);
        }
    }
}

impl TelemetrySource for PollSource {
    fn mode(&self) -> TelemetryMode {
        TelemetryMode::Poll
    }

    fn run(self: Box<Self>, sink: TelemetrySink, cancel: CancellationToken) -> BoxFuture<'static, ()> {
        (*self).run_loop(sink, cancel).boxed()
    }
}
