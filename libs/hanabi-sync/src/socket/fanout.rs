//! Broadcast hub for fanning socket events out to local subscribers.
//!
//! Uses a single `tokio::sync::broadcast` channel. Each subscriber gets its
//! own receiver and filters events locally by name. Dropping a receiver is
//! its unsubscribe; nothing else has to be cleaned up.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;

/// Capacity of the broadcast channel. Slow receivers that fall behind will
/// skip messages (RecvError::Lagged) — delivery gaps are tolerated, never
/// treated as fatal.
const BROADCAST_CAPACITY: usize = 1024;

/// An event received on the socket, fanned out to all subscribers.
#[derive(Debug, Clone)]
pub struct SocketEvent {
    /// The event name (e.g. "notification").
    pub name: String,
    /// Raw event payload.
    pub data: Value,
}

/// The per-session event hub. Cloneable — store in SyncContext.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<SocketEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    /// Subscribe to every event regardless of name.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<SocketEvent>> {
        self.sender.subscribe()
    }

    /// Subscribe to a single event name.
    pub fn on(&self, name: &str) -> EventSubscription {
        EventSubscription {
            name: name.to_string(),
            rx: self.sender.subscribe(),
        }
    }

    /// Dispatch an event to all current subscribers.
    pub fn dispatch(&self, name: &str, data: Value) {
        // send() returns Err if there are no receivers — that's fine.
        let _ = self.sender.send(Arc::new(SocketEvent {
            name: name.to_string(),
            data,
        }));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription filtered to one event name. Drop to unsubscribe.
pub struct EventSubscription {
    name: String,
    rx: broadcast::Receiver<Arc<SocketEvent>>,
}

impl EventSubscription {
    /// Wait for the next event with this subscription's name.
    ///
    /// Returns `None` once the hub is gone. Lagging skips the missed
    /// events and keeps going.
    pub async fn next(&mut self) -> Option<Arc<SocketEvent>> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.name == self.name => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(event = %self.name, skipped = n, "subscriber lagged behind event bus");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn on_filters_by_event_name() {
        let bus = EventBus::new();
        let mut sub = bus.on("notification");

        bus.dispatch("comment:deleted", json!({"commentId": "cmt_1"}));
        bus.dispatch("notification", json!({"id": "ntf_1"}));

        let event = sub.next().await.unwrap();
        assert_eq!(event.name, "notification");
        assert_eq!(event.data["id"], "ntf_1");
    }

    #[tokio::test]
    async fn events_arrive_in_dispatch_order() {
        let bus = EventBus::new();
        let mut sub = bus.on("notification");

        for i in 0..5 {
            bus.dispatch("notification", json!({ "i": i }));
        }

        for i in 0..5 {
            let event = sub.next().await.unwrap();
            assert_eq!(event.data["i"], i);
        }
    }

    #[tokio::test]
    async fn each_subscriber_sees_every_event() {
        let bus = EventBus::new();
        let mut a = bus.on("notification");
        let mut b = bus.on("notification");

        bus.dispatch("notification", json!({}));

        assert!(a.next().await.is_some());
        assert!(b.next().await.is_some());
    }

    #[tokio::test]
    async fn next_returns_none_when_bus_dropped() {
        let bus = EventBus::new();
        let mut sub = bus.on("notification");
        drop(bus);
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn dispatch_without_subscribers_is_harmless() {
        let bus = EventBus::new();
        bus.dispatch("notification", json!({}));
    }
}
