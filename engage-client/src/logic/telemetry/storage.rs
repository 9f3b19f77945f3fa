//! Hit Storage
//!
//! Serialized access to the three persisted telemetry keys.
//! Every read-modify-write of `hits.session`, `hits.lastSent` or
//! `hits.pending` happens inside one `HitTxn`, so concurrent tracks and
//! drains never interleave their writes.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, MutexGuard};

use super::queue::PendingQueue;
use super::session::Session;
use super::throttle::ThrottleMap;
use crate::constants::{LAST_SENT_KEY, PENDING_KEY, SESSION_KEY};
use crate::error::StoreError;
use crate::logic::store::{load_json, save_json, KvStore};

/// Owner of the telemetry keys
pub struct HitStorage {
    store: Arc<dyn KvStore>,
    lock: Mutex<()>,
}

impl HitStorage {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Open the critical section; released when the txn is dropped
    pub async fn begin(&self) -> HitTxn<'_> {
        HitTxn {
            store: self.store.as_ref(),
            _guard: self.lock.lock().await,
        }
    }

    /// Number of queued hits
    pub async fn pending_len(&self) -> Result<usize, StoreError> {
        Ok(self.begin().await.pending().await?.len())
    }
}

/// Exclusive view over the telemetry keys
pub struct HitTxn<'a> {
    store: &'a dyn KvStore,
    _guard: MutexGuard<'a, ()>,
}

impl HitTxn<'_> {
    pub async fn session(&self) -> Result<Option<Session>, StoreError> {
        load_lenient(self.store, SESSION_KEY).await
    }

    pub async fn save_session(&self, session: &Session) -> Result<(), StoreError> {
        save_json(self.store, SESSION_KEY, session).await
    }

    pub async fn throttle_map(&self) -> Result<ThrottleMap, StoreError> {
        Ok(load_lenient(self.store, LAST_SENT_KEY).await?.unwrap_or_default())
    }

    pub async fn save_throttle_map(&self, map: &ThrottleMap) -> Result<(), StoreError> {
        save_json(self.store, LAST_SENT_KEY, map).await
    }

    pub async fn pending(&self) -> Result<PendingQueue, StoreError> {
        let mut queue: PendingQueue = load_lenient(self.store, PENDING_KEY).await?.unwrap_or_default();
        let dropped = queue.enforce_cap();
        if dropped > 0 {
            log::warn!("Pending queue over capacity, dropped {} oldest hits", dropped);
        }
        Ok(queue)
    }

    pub async fn save_pending(&self, queue: &PendingQueue) -> Result<(), StoreError> {
        save_json(self.store, PENDING_KEY, queue).await
    }
}

/// Undecodable values are treated as absent; IO errors still propagate
async fn load_lenient<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match load_json(store, key).await {
        Ok(value) => Ok(value),
        Err(StoreError::Serialization(e)) => {
            log::warn!("Discarding unreadable value for {}: {}", key, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
