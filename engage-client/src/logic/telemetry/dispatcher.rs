//! Dispatcher
//!
//! Drains the pending queue oldest-first. At most one drain runs at a time;
//! a drain stops at the first failed delivery and leaves the rest queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::hit::Hit;
use super::storage::HitStorage;
use crate::error::{ApiError, StoreError};

// ============================================================================
// SEAMS
// ============================================================================

/// Delivers a single hit to the ingestion endpoint
#[async_trait]
pub trait HitSender: Send + Sync {
    async fn send_hit(&self, hit: &Hit) -> Result<(), ApiError>;
}

/// Network reachability as reported by the platform
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_connected(&self) -> bool;
}

/// Assumes the network is always reachable
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOnline;

#[async_trait]
impl Connectivity for AlwaysOnline {
    async fn is_connected(&self) -> bool {
        true
    }
}

/// Connectivity driven by platform network callbacks
#[derive(Debug)]
pub struct ConnectivityFlag {
    online: AtomicBool,
}

impl ConnectivityFlag {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl Connectivity for ConnectivityFlag {
    async fn is_connected(&self) -> bool {
        self.is_online()
    }
}

// ============================================================================
// DRAIN
// ============================================================================

/// Outcome of a drain attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainReport {
    /// Another drain was already running
    Busy,
    /// No connectivity; nothing attempted
    Offline,
    /// Drain finished or stopped at a failed delivery
    Drained { sent: usize, remaining: usize },
    /// The persisted store failed mid-drain
    Aborted,
}

/// Clears the draining flag on every exit path
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct Dispatcher {
    storage: Arc<HitStorage>,
    sender: Arc<dyn HitSender>,
    connectivity: Arc<dyn Connectivity>,
    draining: AtomicBool,
}

impl Dispatcher {
    pub fn new(
        storage: Arc<HitStorage>,
        sender: Arc<dyn HitSender>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            storage,
            sender,
            connectivity,
            draining: AtomicBool::new(false),
        }
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Deliver queued hits, oldest first
    pub async fn drain(&self) -> DrainReport {
        if self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Drain already in progress");
            return DrainReport::Busy;
        }
        let _guard = DrainGuard(&self.draining);

        if !self.connectivity.is_connected().await {
            log::debug!("Offline, skipping drain");
            return DrainReport::Offline;
        }

        match self.drain_queue().await {
            Ok((sent, remaining)) => {
                if sent > 0 || remaining > 0 {
                    log::info!("Drain finished: sent={}, remaining={}", sent, remaining);
                }
                DrainReport::Drained { sent, remaining }
            }
            Err(e) => {
                log::error!("Drain aborted: {}", e);
                DrainReport::Aborted
            }
        }
    }

    /// Send one hit at a time inside the storage critical section,
    /// persisting the queue after each success
    async fn drain_queue(&self) -> Result<(usize, usize), StoreError> {
        let txn = self.storage.begin().await;
        let mut queue = txn.pending().await?;
        let mut sent = 0;

        while let Some(hit) = queue.oldest() {
            let result = self.sender.send_hit(hit).await;
            match result {
                Ok(()) => {
                    queue.pop_oldest();
                    txn.save_pending(&queue).await?;
                    sent += 1;
                }
                Err(e) => {
                    log::warn!("Queued hit delivery failed, stopping drain: {}", e);
                    break;
                }
            }
        }

        Ok((sent, queue.len()))
    }
}
