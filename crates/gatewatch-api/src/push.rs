//! Push channel: full telemetry dumps over a WebSocket, with auto-reconnect.
//!
//! The gateway writes the same document `GET /data` returns as a text frame
//! on every change. Each frame is a complete state dump, so there is no
//! diffing or replay: after a reconnect the next frame is authoritative.
//!
//! # Example
//!
//! ```rust,ignore
//! use gatewatch_api::push::{PushEvent, PushHandle, ReconnectConfig, push_url};
//! use tokio_util::sync::CancellationToken;
//!
//! let ws_url = push_url(&"http://gateway:8000/api".parse()?)?;
//! let mut handle = PushHandle::connect(ws_url, ReconnectConfig::default(), CancellationToken::new());
//!
//! while let Some(event) = handle.next_event().await {
//!     if let PushEvent::Snapshot(dump) = event {
//!         println!("{} devices", dump.len());
//!     }
//! }
//! ```

use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::models::SnapshotPayload;

const EVENT_CHANNEL_CAPACITY: usize = 64;

// ── PushEvent ────────────────────────────────────────────────────────

/// Lifecycle and data events emitted by the push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// The socket is open.
    Connected,
    /// A complete telemetry dump.
    Snapshot(SnapshotPayload),
    /// A frame arrived that could not be decoded. The channel stays open.
    Malformed { error: String },
    /// The socket closed or could not be opened. A reconnect follows.
    Disconnected { reason: String },
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for WebSocket reconnection.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── URL derivation ───────────────────────────────────────────────────

/// Derive the push endpoint from the REST base: `http(s)://host/api` →
/// `ws(s)://host/api/ws`.
pub fn push_url(api_base: &Url) -> Result<Url, Error> {
    let scheme = match api_base.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };

    let mut url = api_base.clone();
    url.set_scheme(scheme)
        .map_err(|()| Error::WebSocketConnect(format!("cannot derive push URL from {api_base}")))?;
    url.path_segments_mut()
        .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .push("ws");
    Ok(url)
}

// ── PushHandle ───────────────────────────────────────────────────────

/// Handle to a running push channel.
///
/// Owns the background task. Call [`shutdown`](Self::shutdown) to cancel
/// the socket and wait for the task to exit.
pub struct PushHandle {
    event_rx: mpsc::Receiver<PushEvent>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PushHandle {
    /// Spawn the connect/read/reconnect loop.
    ///
    /// Returns immediately; the first connection attempt happens in the
    /// background and is reported as [`PushEvent::Connected`] or
    /// [`PushEvent::Disconnected`].
    pub fn connect(ws_url: Url, reconnect: ReconnectConfig, cancel: CancellationToken) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            ws_loop(ws_url, event_tx, reconnect, task_cancel).await;
        });

        Self {
            event_rx,
            cancel,
            task,
        }
    }

    /// Wait for the next event. Returns `None` once the loop has exited.
    pub async fn next_event(&mut self) -> Option<PushEvent> {
        self.event_rx.recv().await
    }

    /// Cancel the socket and wait for the background task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "push task ended abnormally");
        }
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Reconnect attempts since the last successful connection.
#[derive(Debug)]
struct Backoff {
    attempt: u32,
    config: ReconnectConfig,
}

impl Backoff {
    fn new(config: ReconnectConfig) -> Self {
        Self { attempt: 0, config }
    }

    /// A connection was established; the next failure starts over.
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn exhausted(&self) -> bool {
        self.config.max_retries.is_some_and(|max| self.attempt >= max)
    }

    /// Delay before the next attempt, counting it.
    fn next_delay(&mut self) -> Duration {
        let delay = calculate_backoff(self.attempt, &self.config);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }
}

/// Main loop: connect → read → on error, backoff → reconnect.
async fn ws_loop(
    ws_url: Url,
    event_tx: mpsc::Sender<PushEvent>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut backoff = Backoff::new(reconnect);

    loop {
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&ws_url, &event_tx, &cancel, &mut backoff) => result,
        };

        if cancel.is_cancelled() {
            break;
        }

        let reason = match outcome {
            Ok(reason) => {
                tracing::info!(%reason, "push channel closed, reconnecting");
                reason
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt = backoff.attempt, "push channel error");
                e.to_string()
            }
        };

        if event_tx
            .send(PushEvent::Disconnected { reason })
            .await
            .is_err()
        {
            break;
        }

        if backoff.exhausted() {
            tracing::error!(
                max_retries = backoff.attempt,
                "push reconnection limit reached, giving up"
            );
            break;
        }

        let delay = backoff.next_delay();
        tracing::debug!(
            delay_ms = delay.as_millis(),
            attempt = backoff.attempt,
            "waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    tracing::debug!("push loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Open one WebSocket connection and forward frames until it drops.
///
/// Returns the close reason on a clean shutdown, or an error when the
/// connection could not be established or broke mid-stream. Once the
/// socket is open the backoff starts over.
async fn connect_and_read(
    url: &Url,
    event_tx: &mpsc::Sender<PushEvent>,
    cancel: &CancellationToken,
    backoff: &mut Backoff,
) -> Result<String, Error> {
    tracing::info!(url = %url, "connecting push channel");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!("push channel connected");
    if event_tx.send(PushEvent::Connected).await.is_err() {
        return Ok("consumer dropped".into());
    }
    backoff.reset();

    let (_write, mut read) = ws_stream.split();

    loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok("cancelled".into()),
            frame = read.next() => frame,
        };

        let event = match frame {
            Some(Ok(tungstenite::Message::Text(text))) => parse_frame(text.as_str()),
            Some(Ok(tungstenite::Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                Ok(text) => parse_frame(text),
                Err(e) => PushEvent::Malformed {
                    error: format!("binary frame is not UTF-8: {e}"),
                },
            },
            Some(Ok(tungstenite::Message::Close(frame))) => {
                return match frame {
                    Some(cf) => Err(Error::WebSocketClosed {
                        code: u16::from(cf.code),
                        reason: cf.reason.to_string(),
                    }),
                    None => Ok("close frame received".into()),
                };
            }
            Some(Ok(_)) => {
                // Ping / Pong / raw frames -- tungstenite answers pings itself
                tracing::trace!("push control frame");
                continue;
            }
            Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
            None => return Ok("stream ended".into()),
        };

        if event_tx.send(event).await.is_err() {
            return Ok("consumer dropped".into());
        }
    }
}

// ── Frame parsing ────────────────────────────────────────────────────

/// Decode one text frame into a snapshot, or report it as malformed.
fn parse_frame(text: &str) -> PushEvent {
    match serde_json::from_str::<SnapshotPayload>(text) {
        Ok(payload) => {
            tracing::trace!(devices = payload.len(), "push snapshot");
            PushEvent::Snapshot(payload)
        }
        Err(e) => {
            tracing::debug!(error = %e, "failed to parse push frame");
            PushEvent::Malformed {
                error: e.to_string(),
            }
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) * (1 +- 0.25)`
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic jitter seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d0 = calculate_backoff(0, &config);
        let d1 = calculate_backoff(1, &config);
        let d2 = calculate_backoff(2, &config);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        let d10 = calculate_backoff(10, &config);
        // With jitter factor up to 1.25, max effective is 12.5s
        assert!(d10 <= Duration::from_secs(13), "{d10:?} should be capped");

        // Very large attempt counts must not overflow
        let huge = calculate_backoff(u32::MAX, &config);
        assert!(huge <= Duration::from_secs(13));
    }

    #[test]
    fn backoff_grows_until_reset() {
        let mut backoff = Backoff::new(ReconnectConfig::default());
        let first = backoff.next_delay();
        backoff.next_delay();
        let third = backoff.next_delay();
        assert!(third > first);

        backoff.reset();
        assert_eq!(backoff.next_delay(), first);
    }

    #[test]
    fn backoff_gives_up_after_max_retries() {
        let mut backoff = Backoff::new(ReconnectConfig {
            max_retries: Some(2),
            ..ReconnectConfig::default()
        });
        assert!(!backoff.exhausted());
        backoff.next_delay();
        backoff.next_delay();
        assert!(backoff.exhausted());

        backoff.reset();
        assert!(!backoff.exhausted());
    }

    #[test]
    fn push_url_follows_api_base() {
        let url = push_url(&"http://gateway:8000/api".parse().unwrap()).unwrap();
        assert_eq!(url.as_str(), "ws://gateway:8000/api/ws");

        let url = push_url(&"https://plant.example/api/".parse().unwrap()).unwrap();
        assert_eq!(url.as_str(), "wss://plant.example/api/ws");
    }

    #[test]
    fn parse_full_dump_frame() {
        let raw = serde_json::json!({
            "Line-A": {"status": "online", "timestamp": 1_700_000_000.0, "values": {"weight": 412}},
            "Line-B": {"status": "offline", "timestamp": 1_700_000_000.0, "error": "Connection refused"}
        });

        let PushEvent::Snapshot(dump) = parse_frame(&raw.to_string()) else {
            panic!("expected a snapshot");
        };
        assert_eq!(dump.len(), 2);
        assert_eq!(dump["Line-B"]["status"], "offline");
    }

    #[test]
    fn parse_malformed_frame() {
        let event = parse_frame("not json at all");
        assert!(matches!(event, PushEvent::Malformed { .. }));

        // Valid JSON, but not a map of devices
        let event = parse_frame(r#"["Line-A", 42]"#);
        assert!(matches!(event, PushEvent::Malformed { .. }));

        // Bad entries are left for the consumer to drop one by one
        let event = parse_frame(r#"{"Line-A": 42}"#);
        assert!(matches!(event, PushEvent::Snapshot(_)));
    }
}
