//! REST client glue for the sync core.

use serde::Deserialize;

use crate::config::Config;
use crate::error::SyncError;

/// Thin wrapper over `reqwest::Client` with the session credentials and
/// base URL baked in. Cloneable — reqwest clients share their pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

// ---------------------------------------------------------------------------
// GET /notifications/my?unreadOnly=true&limit=1
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct UnreadCountResponse {
    success: bool,
    data: UnreadCountData,
}

#[derive(Debug, Deserialize)]
struct UnreadCountData {
    total: u64,
}

impl ApiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Attach a session token sent as a bearer credential on every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Fetch the authoritative unread-notification total.
    ///
    /// Only the count is of interest, so the page size is pinned to 1.
    pub async fn fetch_unread_total(&self) -> Result<u64, SyncError> {
        let url = format!("{}/notifications/my", self.base_url);
        let mut request = self
            .http
            .get(url)
            .query(&[("unreadOnly", "true"), ("limit", "1")]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let body: UnreadCountResponse = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !body.success {
            return Err(SyncError::BadResponse(
                "unread count fetch reported success=false".to_string(),
            ));
        }
        Ok(body.data.total)
    }
}
