//! Backend health monitor.
//!
//! Probes a fixed health endpoint once on activation and then on a fixed
//! interval (default 30 s, see [`crate::config::Config`]). Any 2xx is
//! `Connected`; a non-success status or transport error is
//! `Disconnected`. A manual retry re-runs the probe outside the timer
//! cadence. Dropping the monitor aborts the task — no orphaned timers.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;

/// Backend liveness as seen from this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Checking,
    Connected,
    Disconnected,
}

/// Handle to the polling task.
pub struct HealthMonitor {
    status_rx: watch::Receiver<HealthStatus>,
    retry_tx: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl HealthMonitor {
    /// Start polling `url` every `interval`, with an immediate first probe.
    pub fn spawn(url: &str, interval: Duration) -> Self {
        Self::spawn_gated(url, interval, None)
    }

    /// Like [`spawn`](Self::spawn), but probes are skipped while the
    /// given visibility signal reads hidden.
    pub fn spawn_gated(
        url: &str,
        interval: Duration,
        visibility: Option<watch::Receiver<bool>>,
    ) -> Self {
        let (status_tx, status_rx) = watch::channel(HealthStatus::Checking);
        let (retry_tx, retry_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_monitor(
            reqwest::Client::new(),
            url.to_string(),
            interval,
            visibility,
            status_tx,
            retry_rx,
        ));

        Self {
            status_rx,
            retry_tx,
            task,
        }
    }

    /// Watch the probe results.
    pub fn status(&self) -> watch::Receiver<HealthStatus> {
        self.status_rx.clone()
    }

    /// Re-run the probe now, without waiting for the next timer tick.
    pub fn retry(&self) {
        let _ = self.retry_tx.send(());
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_monitor(
    client: reqwest::Client,
    url: String,
    interval: Duration,
    visibility: Option<watch::Receiver<bool>>,
    status_tx: watch::Sender<HealthStatus>,
    mut retry_rx: mpsc::UnboundedReceiver<()>,
) {
    // The first tick fires immediately — the probe on activation.
    let mut timer = time::interval(interval);

    loop {
        tokio::select! {
            _ = timer.tick() => {
                // Suspend periodic probes while the tab is hidden.
                if let Some(vis) = &visibility {
                    if !*vis.borrow() {
                        continue;
                    }
                }
                probe(&client, &url, &status_tx).await;
            }

            cmd = retry_rx.recv() => {
                match cmd {
                    Some(()) => {
                        let _ = status_tx.send_replace(HealthStatus::Checking);
                        probe(&client, &url, &status_tx).await;
                    }
                    None => break,
                }
            }
        }
    }
}

async fn probe(client: &reqwest::Client, url: &str, status_tx: &watch::Sender<HealthStatus>) {
    let status = match client.get(url).send().await {
        Ok(resp) if resp.status().is_success() => HealthStatus::Connected,
        Ok(resp) => {
            tracing::warn!(status = %resp.status(), "health probe returned non-success");
            HealthStatus::Disconnected
        }
        Err(e) => {
            tracing::warn!(error = %e, "health probe failed");
            HealthStatus::Disconnected
        }
    };
    let _ = status_tx.send_replace(status);
}
