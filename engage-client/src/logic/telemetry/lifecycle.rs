//! Lifecycle Watcher
//!
//! Turns host app signals into drain triggers. There is no polling:
//! delivery resumes only on foreground and network reconnect.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::dispatcher::{ConnectivityFlag, DrainReport};
use super::tracker::Tracker;

/// Signals forwarded by the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Foreground,
    Background,
    NetworkConnected,
    NetworkDisconnected,
}

pub struct LifecycleWatcher {
    tracker: Tracker,
    /// Kept in sync with network signals
    network: Arc<ConnectivityFlag>,
}

impl LifecycleWatcher {
    pub fn new(tracker: Tracker, network: Arc<ConnectivityFlag>) -> Self {
        Self { tracker, network }
    }

    /// React to one signal; returns the drain report when a drain ran
    pub async fn handle(&self, event: LifecycleEvent) -> Option<DrainReport> {
        log::debug!("Lifecycle event: {:?}", event);

        match event {
            LifecycleEvent::Foreground => {
                if let Err(e) = self.tracker.track_activity_session().await {
                    log::warn!("Session check on foreground failed: {}", e);
                }
                Some(self.tracker.flush().await)
            }
            LifecycleEvent::NetworkConnected => {
                self.network.set_online(true);
                Some(self.tracker.flush().await)
            }
            LifecycleEvent::NetworkDisconnected => {
                self.network.set_online(false);
                None
            }
            LifecycleEvent::Background => None,
        }
    }

    /// Consume signals until every sender is dropped
    pub async fn run(self, mut events: mpsc::Receiver<LifecycleEvent>) {
        log::info!("Lifecycle watcher started");
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
        log::info!("Lifecycle watcher stopped");
    }
}

/// Spawn a watcher wired to `flag`; returns the sender half for the host
pub fn watch_lifecycle(
    tracker: Tracker,
    flag: Arc<ConnectivityFlag>,
) -> (mpsc::Sender<LifecycleEvent>, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(16);
    let watcher = LifecycleWatcher::new(tracker, flag);
    let handle = tokio::spawn(watcher.run(rx));
    (tx, handle)
}
