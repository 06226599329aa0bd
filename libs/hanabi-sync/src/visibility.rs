//! Tab/page visibility signal.
//!
//! A single boolean fed by the host environment's visibility-change
//! notifications. Pollers check it to suspend periodic work while the
//! tab is hidden; the wiring is a consumer decision, not automatic.

use tokio::sync::watch;

/// Read side of the visibility signal.
pub struct VisibilityTracker {
    rx: watch::Receiver<bool>,
    // Keeps the channel alive for the headless constructor, which has no
    // publisher.
    _keepalive: Option<watch::Sender<bool>>,
}

/// Write side, held by the host-environment glue.
pub struct VisibilityPublisher {
    tx: watch::Sender<bool>,
}

impl VisibilityTracker {
    /// Create a tracker seeded with the host document's current state.
    pub fn new(initially_visible: bool) -> (VisibilityPublisher, VisibilityTracker) {
        let (tx, rx) = watch::channel(initially_visible);
        (
            VisibilityPublisher { tx },
            VisibilityTracker {
                rx,
                _keepalive: None,
            },
        )
    }

    /// Headless environments (server rendering, tests without a host)
    /// have no visibility notifications: always visible, never updates.
    pub fn always_visible() -> VisibilityTracker {
        let (tx, rx) = watch::channel(true);
        VisibilityTracker {
            rx,
            _keepalive: Some(tx),
        }
    }

    pub fn is_visible(&self) -> bool {
        *self.rx.borrow()
    }

    /// Watch for visibility changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }
}

impl VisibilityPublisher {
    /// Record a visibility-change notification from the host.
    pub fn set_visible(&self, visible: bool) {
        // send_if_modified: consumers only wake on actual transitions.
        self.tx.send_if_modified(|current| {
            if *current == visible {
                false
            } else {
                *current = visible;
                true
            }
        });
    }
}
