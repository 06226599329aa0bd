//! Unread-notification tracking: a resyncable counter fed by live socket
//! events.
//!
//! The counter is optimistic and eventually consistent with the server.
//! Live events only ever increment it; the authoritative total is pulled
//! on every transition to `Connected` (and on manual request) and
//! overwrites whatever accumulated locally. Duplicate event delivery can
//! inflate the count; the next resync self-corrects.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::api::ApiClient;
use crate::socket::client::ConnectionState;
use crate::socket::events::EventName;
use crate::socket::fanout::{EventBus, EventSubscription};

/// Counts above this render as a capped badge ("9+").
const BADGE_CAP: u64 = 9;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Unread count state: `Unknown → Syncing → Known(n)`, re-entering
/// `Syncing` on each resync. `Syncing` retains the prior value so a
/// failed fetch never erases an already-displayed count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnreadCount {
    Unknown,
    Syncing { prior: Option<u64> },
    Known(u64),
}

impl UnreadCount {
    /// The count to display right now. `Unknown` and an in-flight first
    /// sync show 0.
    pub fn value(&self) -> u64 {
        match self {
            UnreadCount::Unknown => 0,
            UnreadCount::Syncing { prior } => prior.unwrap_or(0),
            UnreadCount::Known(n) => *n,
        }
    }

    /// Badge text for the bell indicator.
    pub fn badge(&self) -> String {
        let n = self.value();
        if n > BADGE_CAP {
            format!("{BADGE_CAP}+")
        } else {
            n.to_string()
        }
    }
}

/// The counter itself. Pure state transitions; the watcher task owns one
/// and publishes snapshots on a watch channel.
#[derive(Debug)]
pub struct UnreadCounter {
    state: UnreadCount,
}

impl UnreadCounter {
    pub fn new() -> Self {
        Self {
            state: UnreadCount::Unknown,
        }
    }

    pub fn snapshot(&self) -> UnreadCount {
        self.state.clone()
    }

    /// Enter `Syncing`, retaining the current value for rollback.
    pub fn begin_resync(&mut self) {
        self.state = match &self.state {
            UnreadCount::Known(n) => UnreadCount::Syncing { prior: Some(*n) },
            UnreadCount::Syncing { prior } => UnreadCount::Syncing { prior: *prior },
            UnreadCount::Unknown => UnreadCount::Syncing { prior: None },
        };
    }

    /// A resync succeeded: the fetched total wins over any increments
    /// accumulated since the fetch was issued.
    pub fn complete_resync(&mut self, total: u64) {
        self.state = UnreadCount::Known(total);
    }

    /// A resync failed: restore the prior value. A transient fetch
    /// failure must not visibly erase the displayed count.
    pub fn fail_resync(&mut self) {
        self.state = match &self.state {
            UnreadCount::Syncing { prior: Some(n) } => UnreadCount::Known(*n),
            UnreadCount::Syncing { prior: None } => UnreadCount::Unknown,
            other => other.clone(),
        };
    }

    /// One live notification arrived. Increments unconditionally — there
    /// is no de-duplication by event identity.
    pub fn record_notification(&mut self) {
        self.state = match &self.state {
            UnreadCount::Known(n) => UnreadCount::Known(n + 1),
            UnreadCount::Syncing { prior } => UnreadCount::Syncing {
                prior: Some(prior.unwrap_or(0) + 1),
            },
            // The displayed count starts at 0, so an event before the
            // first sync still becomes visible.
            UnreadCount::Unknown => UnreadCount::Known(1),
        };
    }
}

impl Default for UnreadCounter {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Watcher task
// ---------------------------------------------------------------------------

/// Background task tying the counter to the socket: increments on every
/// `notification` event, resyncs on every transition to `Connected`.
///
/// Dropping the watcher aborts the task; its bus subscription and watch
/// senders go with it.
pub struct NotificationWatcher {
    count_rx: watch::Receiver<UnreadCount>,
    resync_tx: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl NotificationWatcher {
    pub fn spawn(
        api: ApiClient,
        bus: &EventBus,
        state_rx: watch::Receiver<ConnectionState>,
    ) -> Self {
        let sub = bus.on(EventName::NOTIFICATION);
        let (count_tx, count_rx) = watch::channel(UnreadCount::Unknown);
        let (resync_tx, resync_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_watcher(api, sub, state_rx, count_tx, resync_rx));

        Self {
            count_rx,
            resync_tx,
            task,
        }
    }

    /// Watch the counter state. UI surfaces render `badge()` from this.
    pub fn count(&self) -> watch::Receiver<UnreadCount> {
        self.count_rx.clone()
    }

    /// Request a resync outside the connection-event cadence.
    pub fn request_resync(&self) {
        let _ = self.resync_tx.send(());
    }
}

impl Drop for NotificationWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_watcher(
    api: ApiClient,
    mut sub: EventSubscription,
    mut state_rx: watch::Receiver<ConnectionState>,
    count_tx: watch::Sender<UnreadCount>,
    mut resync_rx: mpsc::UnboundedReceiver<()>,
) {
    let mut counter = UnreadCounter::new();
    let mut events_open = true;
    let mut state_open = true;

    // Seed from the backend if the socket is already up at spawn time.
    if *state_rx.borrow_and_update() == ConnectionState::Connected {
        resync(&api, &mut counter, &count_tx).await;
    }

    loop {
        tokio::select! {
            event = sub.next(), if events_open => {
                match event {
                    Some(_) => {
                        counter.record_notification();
                        let _ = count_tx.send_replace(counter.snapshot());
                    }
                    None => events_open = false,
                }
            }

            changed = state_rx.changed(), if state_open => {
                match changed {
                    Ok(()) => {
                        if *state_rx.borrow_and_update() == ConnectionState::Connected {
                            resync(&api, &mut counter, &count_tx).await;
                        }
                    }
                    // Socket torn down; live updates stop, manual resyncs
                    // keep working.
                    Err(_) => state_open = false,
                }
            }

            cmd = resync_rx.recv() => {
                match cmd {
                    Some(()) => resync(&api, &mut counter, &count_tx).await,
                    None => break,
                }
            }
        }
    }
}

async fn resync(api: &ApiClient, counter: &mut UnreadCounter, count_tx: &watch::Sender<UnreadCount>) {
    counter.begin_resync();
    let _ = count_tx.send_replace(counter.snapshot());

    match api.fetch_unread_total().await {
        Ok(total) => counter.complete_resync(total),
        Err(e) => {
            tracing::warn!(error = %e, "unread resync failed; keeping previous count");
            counter.fail_resync();
        }
    }
    let _ = count_tx.send_replace(counter.snapshot());
}
