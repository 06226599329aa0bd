//! Socket wire format, event names, and event payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Wire frame
// ---------------------------------------------------------------------------

/// One JSON text frame on the socket, in either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl SocketFrame {
    pub fn new(event: &str, data: Value) -> Self {
        Self {
            event: event.to_string(),
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Event names delivered by the backend.
pub struct EventName;

impl EventName {
    pub const NOTIFICATION: &'static str = "notification";
    pub const COMMENT_DELETED: &'static str = "comment:deleted";
}

// ---------------------------------------------------------------------------
// comment:deleted payload
// ---------------------------------------------------------------------------

/// Payload of a live `comment:deleted` event.
///
/// `parent_id` is `None` for top-level comments. The field is carried on the
/// wire but removal does not rely on it; the tree is searched by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDeleted {
    pub comment_id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
}
