//! Generic value-settling primitive.
//!
//! A `Debouncer` delays propagation of a rapidly-changing input until it
//! has been quiet for the full delay. Every `push` restarts the window
//! and cancels the emit scheduled for the previous value. Dropping the
//! handle cancels any pending emit — a torn-down consumer is never
//! updated.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time;

/// Handle to a debounced value. `push` feeds the input side; `settled`
/// watches the output side (`None` until the first value settles).
pub struct Debouncer<T> {
    input_tx: mpsc::UnboundedSender<T>,
    settled_rx: watch::Receiver<Option<T>>,
}

impl<T> Debouncer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(delay: Duration) -> Self {
        let (input_tx, mut input_rx) = mpsc::unbounded_channel::<T>();
        let (settled_tx, settled_rx) = watch::channel(None);

        tokio::spawn(async move {
            'outer: loop {
                // Idle until something is pushed.
                let Some(mut value) = input_rx.recv().await else {
                    break;
                };

                // Wait out the quiet window, restarting on each new input.
                loop {
                    tokio::select! {
                        next = input_rx.recv() => match next {
                            Some(v) => value = v,
                            // Handle dropped: the pending emit is cancelled.
                            None => break 'outer,
                        },
                        _ = time::sleep(delay) => {
                            let _ = settled_tx.send(Some(value));
                            break;
                        }
                    }
                }
            }
        });

        Self {
            input_tx,
            settled_rx,
        }
    }

    /// Feed a new input value, restarting the delay window.
    pub fn push(&self, value: T) {
        let _ = self.input_tx.send(value);
    }

    /// Watch the settled output.
    pub fn settled(&self) -> watch::Receiver<Option<T>> {
        self.settled_rx.clone()
    }

    /// The most recently settled value, if any.
    pub fn current(&self) -> Option<T> {
        self.settled_rx.borrow().clone()
    }
}
