//! Shared test harness: a mock HanabiHub backend (REST + socket) bound
//! to an ephemeral port.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time;

use hanabi_sync::config::Config;

/// Controls and observations for the mock backend.
pub struct MockBackend {
    /// Total returned by the unread-count endpoint.
    pub unread_total: AtomicU64,
    /// When set, the unread-count endpoint answers 500.
    pub unread_fail: AtomicBool,
    /// When unset, the health endpoint answers 500.
    pub health_ok: AtomicBool,
    /// Number of health probes received.
    pub health_hits: AtomicUsize,
    /// Socket frames pushed to every connected client.
    events: broadcast::Sender<String>,
    /// Frames received from clients.
    inbound_tx: mpsc::UnboundedSender<String>,
}

impl MockBackend {
    /// Dispatch an event frame to all connected socket clients.
    pub fn dispatch(&self, event: &str, data: Value) {
        let frame = json!({ "event": event, "data": data }).to_string();
        let _ = self.events.send(frame);
    }

    /// Push a raw (possibly malformed) text frame.
    pub fn dispatch_raw(&self, text: &str) {
        let _ = self.events.send(text.to_string());
    }
}

/// Start the mock backend. Returns its address, control handle, and the
/// stream of frames clients sent to it.
pub async fn start_backend() -> (SocketAddr, Arc<MockBackend>, mpsc::UnboundedReceiver<String>) {
    init_tracing();

    let (events, _) = broadcast::channel(64);
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let backend = Arc::new(MockBackend {
        unread_total: AtomicU64::new(0),
        unread_fail: AtomicBool::new(false),
        health_ok: AtomicBool::new(true),
        health_hits: AtomicUsize::new(0),
        events,
        inbound_tx,
    });

    let app = Router::new()
        .route("/api/notifications/my", get(unread_count))
        .route("/health-check", get(health_check))
        .route("/socket", get(ws_upgrade))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, backend, inbound_rx)
}

/// Config pointing the sync core at the mock backend.
pub fn backend_config(addr: SocketAddr) -> Config {
    Config {
        api_base_url: format!("http://{addr}/api"),
        socket_url: format!("ws://{addr}/socket"),
        health_check_url: format!("http://{addr}/health-check"),
        health_interval: Duration::from_secs(30),
    }
}

async fn unread_count(State(backend): State<Arc<MockBackend>>) -> impl IntoResponse {
    if backend.unread_fail.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false })),
        );
    }
    let total = backend.unread_total.load(Ordering::SeqCst);
    (
        StatusCode::OK,
        Json(json!({ "success": true, "data": { "total": total } })),
    )
}

async fn health_check(State(backend): State<Arc<MockBackend>>) -> StatusCode {
    backend.health_hits.fetch_add(1, Ordering::SeqCst);
    if backend.health_ok.load(Ordering::SeqCst) {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(backend): State<Arc<MockBackend>>,
) -> impl IntoResponse {
    // Subscribe during the handshake so no frame dispatched after
    // connect() resolves can be missed.
    let events = backend.events.subscribe();
    ws.on_upgrade(move |socket| serve_socket(socket, backend, events))
}

async fn serve_socket(
    socket: WebSocket,
    backend: Arc<MockBackend>,
    mut events: broadcast::Receiver<String>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            frame = events.recv() => {
                match frame {
                    Ok(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let _ = backend.inbound_tx.send(text.to_string());
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => break,
                }
            }
        }
    }
}

/// Wait until the watched value satisfies the predicate, or panic after
/// five seconds.
pub async fn wait_for<T, F>(rx: &mut watch::Receiver<T>, mut pred: F)
where
    F: FnMut(&T) -> bool,
{
    let deadline = time::timeout(Duration::from_secs(5), async {
        loop {
            if pred(&*rx.borrow_and_update()) {
                return;
            }
            if rx.changed().await.is_err() {
                panic!("watch sender dropped before condition was met");
            }
        }
    });
    deadline.await.expect("timed out waiting for condition");
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
