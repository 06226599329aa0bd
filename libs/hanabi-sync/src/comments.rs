//! Comment-tree cache and live deletion synchronization.
//!
//! The cache holds one ordered forest per post. A live `comment:deleted`
//! event removes at most one node (with its whole subtree) from the
//! forest and marks the post's cached comment count stale so it is
//! refetched before next display. The replacement forest is computed
//! immutably and committed atomically — never mutated in place across an
//! await point.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::socket::events::{CommentDeleted, EventName};
use crate::socket::fanout::EventBus;

// ---------------------------------------------------------------------------
// Tree model
// ---------------------------------------------------------------------------

/// One node in a post's comment forest. Identifiers are unique within a
/// post; `replies` keeps its order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<CommentNode>,
}

/// Remove the first node matching `comment_id`, depth first: check each
/// top-level sibling in order, recursing into its replies before moving
/// on. Sibling order is preserved; a removed node takes its subtree with
/// it. Returns whether anything was removed.
fn remove_comment(nodes: &mut Vec<CommentNode>, comment_id: &str) -> bool {
    for i in 0..nodes.len() {
        if nodes[i].id == comment_id {
            nodes.remove(i);
            return true;
        }
        if remove_comment(&mut nodes[i].replies, comment_id) {
            return true;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Per-post comment forests plus cached comment-count aggregates.
///
/// Forests are stored behind `Arc` so readers keep a consistent snapshot
/// while a deletion commits a replacement.
pub struct CommentCache {
    trees: DashMap<String, Arc<Vec<CommentNode>>>,
    counts: DashMap<String, u64>,
    stale_counts: DashSet<String>,
}

impl CommentCache {
    pub fn new() -> Self {
        Self {
            trees: DashMap::new(),
            counts: DashMap::new(),
            stale_counts: DashSet::new(),
        }
    }

    /// Store the fetched forest for a post.
    pub fn insert_tree(&self, post_id: &str, forest: Vec<CommentNode>) {
        self.trees.insert(post_id.to_string(), Arc::new(forest));
    }

    /// Current snapshot of a post's forest, if cached.
    pub fn tree(&self, post_id: &str) -> Option<Arc<Vec<CommentNode>>> {
        self.trees.get(post_id).map(|entry| entry.value().clone())
    }

    /// Store a fetched comment-count aggregate, clearing any staleness.
    pub fn set_comment_count(&self, post_id: &str, total: u64) {
        self.counts.insert(post_id.to_string(), total);
        self.stale_counts.remove(post_id);
    }

    /// Cached comment count, or `None` when missing or stale — the
    /// caller refetches before display.
    pub fn comment_count(&self, post_id: &str) -> Option<u64> {
        if self.stale_counts.contains(post_id) {
            return None;
        }
        self.counts.get(post_id).map(|entry| *entry.value())
    }

    /// Apply a live deletion event. Returns whether a node was removed.
    ///
    /// Events for uncached posts and ids absent from the tree are silent
    /// no-ops — the deletion may already have been applied locally by the
    /// deleting user's own optimistic update.
    pub fn apply_deletion(&self, event: &CommentDeleted) -> bool {
        let Some(current) = self.tree(&event.post_id) else {
            return false;
        };

        let mut next = (*current).clone();
        if !remove_comment(&mut next, &event.comment_id) {
            return false;
        }

        self.trees.insert(event.post_id.clone(), Arc::new(next));
        // Removal alone does not update derived counts.
        self.stale_counts.insert(event.post_id.clone());

        tracing::debug!(
            post_id = %event.post_id,
            comment_id = %event.comment_id,
            "removed comment from cached tree"
        );
        true
    }
}

impl Default for CommentCache {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Synchronizer task
// ---------------------------------------------------------------------------

/// Background task feeding `comment:deleted` socket events into the
/// cache. Dropping it aborts the task and its subscription.
pub struct CommentSynchronizer {
    task: JoinHandle<()>,
}

impl CommentSynchronizer {
    pub fn spawn(bus: &EventBus, cache: Arc<CommentCache>) -> Self {
        let mut sub = bus.on(EventName::COMMENT_DELETED);
        let task = tokio::spawn(async move {
            while let Some(event) = sub.next().await {
                let payload: CommentDeleted = match serde_json::from_value(event.data.clone()) {
                    Ok(p) => p,
                    Err(e) => {
                        // Malformed payloads are dropped, never surfaced.
                        tracing::debug!(?e, "dropping malformed comment:deleted payload");
                        continue;
                    }
                };
                cache.apply_deletion(&payload);
            }
        });
        Self { task }
    }
}

impl Drop for CommentSynchronizer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
