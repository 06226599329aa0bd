//! Crate-level error type.
//!
//! Every failure here is transient from the UI's point of view: fetch
//! failures keep the previously displayed state and are retried on the
//! next timer tick or connection event; nothing propagates as a panic
//! into the rendering layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A fetch against the backend failed at the transport level or
    /// returned a non-success status.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered 2xx but the body did not have the expected
    /// shape.
    #[error("unexpected backend response: {0}")]
    BadResponse(String),

    /// The socket connection could not be established.
    #[error("socket connect failed: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The socket event loop has already ended.
    #[error("socket is closed")]
    SocketClosed,
}
