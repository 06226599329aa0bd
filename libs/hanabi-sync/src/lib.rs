//! Realtime notification and socket-event synchronization core for the
//! HanabiHub learning platform.

pub mod api;
pub mod comments;
pub mod config;
pub mod debounce;
pub mod error;
pub mod health;
pub mod notifications;
pub mod socket;
pub mod visibility;

use std::sync::Arc;

use api::ApiClient;
use comments::CommentCache;
use config::Config;
use error::SyncError;
use socket::client::SocketClient;
use socket::fanout::EventBus;

/// Shared handles for one authenticated session.
///
/// Created once at session start and torn down at session end; every
/// consumer reaches the socket through this provider, never through a
/// bare global.
#[derive(Clone)]
pub struct SyncContext {
    pub config: Arc<Config>,
    pub api: ApiClient,
    pub bus: EventBus,
    pub comments: Arc<CommentCache>,
}

impl SyncContext {
    pub fn new(config: Config) -> Self {
        let api = ApiClient::new(&config);
        Self {
            config: Arc::new(config),
            api,
            bus: EventBus::new(),
            comments: Arc::new(CommentCache::new()),
        }
    }

    /// Attach the session token used for authenticated fetches.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api = self.api.with_token(token);
        self
    }

    /// Open the session socket, feeding this context's event bus.
    ///
    /// Reconnecting after a loss is the caller's decision: connect again
    /// with the same context and subscribers keep their registrations.
    pub async fn connect_socket(&self) -> Result<SocketClient, SyncError> {
        SocketClient::connect(&self.config.socket_url, self.bus.clone()).await
    }
}
