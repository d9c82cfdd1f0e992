//! Real-time complaint push stream.
//!
//! The backend broadcasts `{"event": "newComplaint", "data": {...}}`
//! envelopes over a WebSocket. [`PushStream::spawn`] runs a reader task
//! that forwards the payloads through a [`tokio::sync::mpsc`] channel
//! and reconnects with capped exponential backoff whenever the socket
//! drops. A broken socket is never fatal to the feed; the periodic
//! re-poll backfills anything missed while disconnected.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

/// The only envelope event the feed consumes.
const NEW_COMPLAINT_EVENT: &str = "newComplaint";

/// Channel buffer size for push events. Reconciliation is cheap, so a
/// small buffer only has to absorb short consumer stalls.
const EVENT_CHANNEL_BUFFER: usize = 64;

/// Largest backoff exponent tried before the flat cap applies.
const MAX_BACKOFF_EXPONENT: u32 = 6;

/// Ceiling on the reconnect backoff delay.
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// Events emitted by the push reader task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// The socket (re)connected and the listener is attached. Emitted
    /// once per successful connect, before any complaint from it.
    Attached,
    /// A raw `newComplaint` payload.
    Complaint(serde_json::Value),
}

/// A running push stream: the event receiver plus the reader task handle.
///
/// Dropping or closing the receiver stops the reader task on its next
/// send; aborting the task is the fast path used at feed teardown.
pub struct PushHandle {
    /// Incoming push events, in arrival order.
    pub events: mpsc::Receiver<PushEvent>,
    /// The spawned reader task.
    pub task: tokio::task::JoinHandle<()>,
}

/// WebSocket consumer for the `newComplaint` broadcast channel.
pub struct PushStream {
    url: String,
}

impl PushStream {
    /// Creates a push stream for the given WebSocket URL
    /// (e.g. `wss://api.rescue.example`).
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Spawns the reader task and returns its handle.
    #[must_use]
    pub fn spawn(self) -> PushHandle {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER);
        let task = tokio::spawn(run_reader(self.url, tx));
        PushHandle { events: rx, task }
    }
}

/// Connect/read/reconnect loop. Exits only when the receiver closes.
async fn run_reader(url: String, tx: mpsc::Sender<PushEvent>) {
    let mut attempt: u32 = 0;

    loop {
        match connect_async(&url).await {
            Ok((stream, _response)) => {
                attempt = 0;
                log::info!("push stream connected: {url}");
                if tx.send(PushEvent::Attached).await.is_err() {
                    return;
                }

                let (mut write, mut read) = stream.split();
                while let Some(frame) = read.next().await {
                    match frame {
                        Ok(WsMessage::Text(text)) => {
                            if let Some(payload) = parse_envelope(text.as_str())
                                && tx.send(PushEvent::Complaint(payload)).await.is_err()
                            {
                                return;
                            }
                        }
                        Ok(WsMessage::Ping(payload)) => {
                            if write.send(WsMessage::Pong(payload)).await.is_err() {
                                break;
                            }
                        }
                        Ok(WsMessage::Pong(_) | WsMessage::Binary(_) | WsMessage::Frame(_)) => {}
                        Ok(WsMessage::Close(frame)) => {
                            log::warn!("push stream closed by server: {frame:?}");
                            break;
                        }
                        Err(e) => {
                            log::warn!("push stream read error: {e}");
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                log::warn!("push stream connect failed: {e}");
            }
        }

        if tx.is_closed() {
            return;
        }
        let delay = reconnect_delay(attempt);
        attempt += 1;
        log::info!("reconnecting push stream in {delay:?} (attempt {attempt})");
        tokio::time::sleep(delay).await;
    }
}

/// Backoff delay for the given reconnect attempt (1s doubling to a 60s
/// cap).
fn reconnect_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(MAX_BACKOFF_EXPONENT)).min(MAX_RECONNECT_DELAY)
}

/// Parses a text frame as a push envelope, returning the payload of a
/// `newComplaint` event. Other events and malformed frames are logged
/// and skipped.
fn parse_envelope(text: &str) -> Option<serde_json::Value> {
    let mut envelope: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("discarding malformed push frame: {e}");
            return None;
        }
    };

    let Some(event) = envelope.get("event").and_then(serde_json::Value::as_str) else {
        log::warn!("discarding push frame without an event name");
        return None;
    };
    if event != NEW_COMPLAINT_EVENT {
        log::debug!("ignoring push event {event:?}");
        return None;
    }

    match envelope.get_mut("data") {
        Some(data) if !data.is_null() => Some(data.take()),
        _ => {
            log::warn!("discarding newComplaint frame without a data payload");
            None
        }
    }
}
