//! Realtime channel transport with bounded auto-reconnect.
//!
//! Connects to the backend's `/ws` endpoint and streams parsed
//! `{"type", "data"}` frames through a [`tokio::sync::broadcast`] channel.
//! Outbound frames are queued through an mpsc channel and written by the
//! same task that owns the socket. Dropped connections are retried with a
//! fixed delay up to a configured number of attempts, after which the
//! state becomes [`ConnectionState::Failed`].
//!
//! # Example
//!
//! ```rust,ignore
//! use smartfarm_api::realtime::{RealtimeHandle, ReconnectPolicy, ClientMessage};
//! use tokio_util::sync::CancellationToken;
//!
//! let ws_url = url::Url::parse("ws://localhost:8000/ws")?;
//! let handle = RealtimeHandle::connect(ws_url, None, ReconnectPolicy::default(), CancellationToken::new());
//! let mut rx = handle.subscribe();
//! handle.send(ClientMessage::request("priceUpdate"))?;
//!
//! while let Ok(msg) = rx.recv().await {
//!     println!("{}: {}", msg.event, msg.data);
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_core::Stream;
use futures_util::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::session::Session;

// ── Channel capacities ───────────────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;

// ── Wire messages ────────────────────────────────────────────────────

/// A frame pushed by the server: `{"type": "<event>", "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    #[serde(rename = "type")]
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// A frame sent to the server, same envelope as [`ServerMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub event: String,
    pub data: serde_json::Value,
}

impl ClientMessage {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Initial-data request for `event`: `{"type": "get-<event>", "data": {}}`.
    pub fn request(event: &str) -> Self {
        Self::new(format!("get-{event}"), serde_json::json!({}))
    }
}

// ── ConnectionState ──────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed,
}

// ── ReconnectPolicy ──────────────────────────────────────────────────

/// Fixed-delay reconnection with a bounded number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before every reconnection attempt. Default: 1s.
    pub delay: Duration,
    /// Attempts after a drop before giving up. Default: 5.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

// ── RealtimeHandle ───────────────────────────────────────────────────

/// Handle to a running realtime connection.
///
/// Dropping the handle (or calling [`shutdown`](Self::shutdown)) tears
/// down the background task.
pub struct RealtimeHandle {
    event_tx: broadcast::Sender<Arc<ServerMessage>>,
    outbound_tx: mpsc::UnboundedSender<ClientMessage>,
    state_rx: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
}

impl RealtimeHandle {
    /// Spawn the connection loop and return immediately.
    ///
    /// When `session` holds an access token it is appended to the URL as
    /// `?token=`; the token is re-read on every (re)connect.
    pub fn connect(
        ws_url: Url,
        session: Option<Session>,
        policy: ReconnectPolicy,
        cancel: CancellationToken,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let task = ConnectionTask {
            ws_url,
            session,
            policy,
            event_tx: event_tx.clone(),
            state_tx,
            cancel: cancel.clone(),
        };
        tokio::spawn(task.run(outbound_rx));

        Self {
            event_tx,
            outbound_tx,
            state_rx,
            cancel,
        }
    }

    /// New broadcast receiver for inbound frames.
    ///
    /// A consumer that falls behind receives
    /// [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ServerMessage>> {
        self.event_tx.subscribe()
    }

    /// Inbound frames as a `Stream`, skipping over lag gaps.
    pub fn events(&self) -> impl Stream<Item = Arc<ServerMessage>> + Send + 'static {
        let mut rx = self.subscribe();
        async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(msg) => yield msg,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "realtime consumer lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    /// Queue a frame for sending. Fails unless currently connected.
    pub fn send(&self, message: ClientMessage) -> Result<(), Error> {
        if *self.state_rx.borrow() != ConnectionState::Connected {
            return Err(Error::WebSocketClosed {
                code: 1006,
                reason: "not connected".into(),
            });
        }
        self.outbound_tx.send(message).map_err(|_| Error::WebSocketClosed {
            code: 1006,
            reason: "connection task stopped".into(),
        })
    }

    /// Subscribe to connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Signal the background task to shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for RealtimeHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

struct ConnectionTask {
    ws_url: Url,
    session: Option<Session>,
    policy: ReconnectPolicy,
    event_tx: broadcast::Sender<Arc<ServerMessage>>,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
}

enum SessionEnd {
    Cancelled,
    Dropped,
}

impl ConnectionTask {
    /// Main loop: connect → read/write → on drop, wait → reconnect.
    async fn run(self, mut outbound_rx: mpsc::UnboundedReceiver<ClientMessage>) {
        let mut attempt: u32 = 0;

        loop {
            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                result = self.connect_and_serve(&mut outbound_rx) => result,
            };

            match result {
                Ok(SessionEnd::Cancelled) => break,
                // A connection was established, so the retry budget starts over.
                Ok(SessionEnd::Dropped) => {
                    tracing::info!("realtime connection dropped, reconnecting");
                    attempt = 0;
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "realtime connection error");
                }
            }

            if attempt >= self.policy.max_attempts {
                tracing::error!(
                    max_attempts = self.policy.max_attempts,
                    "realtime reconnection limit reached, giving up"
                );
                let _ = self.state_tx.send(ConnectionState::Failed);
                return;
            }

            attempt += 1;
            let _ = self.state_tx.send(ConnectionState::Reconnecting { attempt });
            tracing::info!(
                delay_ms = u64::try_from(self.policy.delay.as_millis()).unwrap_or(u64::MAX),
                attempt,
                "waiting before reconnect"
            );

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(self.policy.delay) => {}
            }
        }

        let _ = self.state_tx.send(ConnectionState::Disconnected);
        tracing::debug!("realtime loop exiting");
    }

    /// Establish one connection and pump frames until it ends.
    async fn connect_and_serve(
        &self,
        outbound_rx: &mut mpsc::UnboundedReceiver<ClientMessage>,
    ) -> Result<SessionEnd, Error> {
        let url = self.authorized_url();
        tracing::info!(url = %self.ws_url, "connecting to realtime channel");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        // Anything queued before this connection belongs to a dead socket.
        while outbound_rx.try_recv().is_ok() {}

        let _ = self.state_tx.send(ConnectionState::Connected);
        tracing::info!("realtime channel connected");

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    let _ = write.send(tungstenite::Message::Close(None)).await;
                    return Ok(SessionEnd::Cancelled);
                }
                outbound = outbound_rx.recv() => {
                    let Some(message) = outbound else {
                        return Ok(SessionEnd::Cancelled);
                    };
                    let text = serde_json::to_string(&message).map_err(|e| Error::Deserialization {
                        message: e.to_string(),
                        body: String::new(),
                    })?;
                    tracing::debug!(event = %message.event, "sending realtime frame");
                    write
                        .send(tungstenite::Message::text(text))
                        .await
                        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
                }
                frame = read.next() => {
                    match frame {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            parse_and_broadcast(&text, &self.event_tx);
                        }
                        Some(Ok(tungstenite::Message::Ping(_))) => {
                            // tungstenite queues the pong itself
                            tracing::trace!("realtime ping");
                        }
                        Some(Ok(tungstenite::Message::Close(frame))) => {
                            if let Some(ref cf) = frame {
                                tracing::info!(code = %cf.code, reason = %cf.reason, "realtime close frame received");
                            } else {
                                tracing::info!("realtime close frame received (no payload)");
                            }
                            return Ok(SessionEnd::Dropped);
                        }
                        Some(Err(e)) => {
                            return Err(Error::WebSocketConnect(e.to_string()));
                        }
                        None => {
                            tracing::info!("realtime stream ended");
                            return Ok(SessionEnd::Dropped);
                        }
                        // Binary, Pong, Frame
                        _ => {}
                    }
                }
            }
        }
    }

    fn authorized_url(&self) -> Url {
        let mut url = self.ws_url.clone();
        if let Some(token) = self.session.as_ref().and_then(Session::access_token) {
            url.query_pairs_mut().append_pair("token", token.expose_secret());
        }
        url
    }
}

// ── Message parsing ──────────────────────────────────────────────────

/// Parse a text frame and broadcast it. Malformed frames are skipped.
fn parse_and_broadcast(text: &str, event_tx: &broadcast::Sender<Arc<ServerMessage>>) {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(msg) => {
            tracing::trace!(event = %msg.event, "realtime frame");
            // No receivers right now is fine.
            let _ = event_tx.send(Arc::new(msg));
        }
        Err(e) => {
            tracing::debug!(error = %e, "failed to parse realtime frame");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
