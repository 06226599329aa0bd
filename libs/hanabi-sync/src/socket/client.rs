//! Socket connection manager: owns the transport and the per-session
//! event loop that feeds the fan-out hub.
//!
//! One `SocketClient` per authenticated session. Dropping the client (or
//! calling [`SocketClient::shutdown`]) ends the event loop, closes the
//! transport, and flips the state watch to `Disconnected` — no handler
//! outlives its session.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use hanabi_common::id::{prefix, prefixed_ulid};

use crate::error::SyncError;

use super::events::SocketFrame;
use super::fanout::EventBus;

/// Connection state of the session socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

enum Outbound {
    Frame(SocketFrame),
    Close,
}

/// Handle to the session socket. Consumers never touch the transport;
/// they read events from the [`EventBus`] and the state watch.
pub struct SocketClient {
    session_id: String,
    state_rx: watch::Receiver<ConnectionState>,
    out_tx: mpsc::UnboundedSender<Outbound>,
}

impl SocketClient {
    /// Establish the connection and start the event loop.
    ///
    /// Inbound frames are dispatched onto `bus` in delivery order.
    /// Messages in flight during a disconnect may be lost; subscribers
    /// must tolerate gaps.
    pub async fn connect(url: &str, bus: EventBus) -> Result<Self, SyncError> {
        let session_id = prefixed_ulid(prefix::SESSION);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let (ws, _) = tokio_tungstenite::connect_async(url).await?;
        let _ = state_tx.send(ConnectionState::Connected);

        tracing::info!(session_id = %session_id, %url, "socket connected");

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(ws, bus, state_tx, out_rx, session_id.clone()));

        Ok(Self {
            session_id,
            state_rx,
            out_tx,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Watch the connection state. The receiver stays valid until the
    /// event loop exits.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn connected(&self) -> bool {
        *self.state_rx.borrow() == ConnectionState::Connected
    }

    /// Queue an outbound event frame.
    pub fn emit(&self, event: &str, data: Value) -> Result<(), SyncError> {
        self.out_tx
            .send(Outbound::Frame(SocketFrame::new(event, data)))
            .map_err(|_| SyncError::SocketClosed)
    }

    /// Request a graceful close. The event loop sends a close frame,
    /// flips the state watch to `Disconnected`, and exits.
    pub fn shutdown(&self) {
        let _ = self.out_tx.send(Outbound::Close);
    }
}

/// Per-session event loop: read inbound frames onto the bus, drain the
/// outbound queue, tear down exactly once on close or error.
async fn run_socket(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    bus: EventBus,
    state_tx: watch::Sender<ConnectionState>,
    mut out_rx: mpsc::UnboundedReceiver<Outbound>,
    session_id: String,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            // Inbound frame from the backend.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let frame: SocketFrame = match serde_json::from_str(&text) {
                            Ok(f) => f,
                            Err(e) => {
                                // Malformed payloads are dropped, never surfaced.
                                tracing::debug!(?e, session_id = %session_id, "dropping malformed socket frame");
                                continue;
                            }
                        };
                        bus.dispatch(&frame.event, frame.data);
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, session_id = %session_id, "socket read error");
                        break;
                    }
                    _ => continue,
                }
            }

            // Outbound frame queued by a consumer, or client teardown.
            cmd = out_rx.recv() => {
                match cmd {
                    Some(Outbound::Frame(frame)) => {
                        let json = serde_json::to_string(&frame).unwrap();
                        if ws_tx.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    // None means the SocketClient handle was dropped.
                    Some(Outbound::Close) | None => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    let _ = state_tx.send(ConnectionState::Disconnected);
    tracing::info!(session_id = %session_id, "socket session ended");
}
