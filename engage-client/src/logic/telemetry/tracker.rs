//! Telemetry Facade
//!
//! The only public entry into the hit pipeline:
//! session → throttle → immediate send → pending queue → dispatcher.
//!
//! Delivery problems never reach the caller. A track only fails for a
//! malformed hit or a broken persisted store.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::clock::{local_iso8601, Clock, SystemClock};
use super::dispatcher::{AlwaysOnline, Connectivity, Dispatcher, DrainReport, HitSender};
use super::hit::{EventType, Hit, HitContext, HitParams};
use super::session::{Session, SessionManager};
use super::storage::HitStorage;
use super::throttle::throttle_key;
use crate::constants::SESSION_INACTIVITY_MS;
use crate::error::{HitError, StoreError};
use crate::logic::store::KvStore;

/// What happened to a tracked hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracked {
    /// Delivered immediately
    Sent,
    /// Delivery failed; hit waits in the pending queue
    Queued,
    /// Dropped by the throttle policy
    Throttled,
    /// Nothing to report (session still active)
    Skipped,
}

// ============================================================================
// BUILDER
// ============================================================================

pub struct TrackerBuilder {
    store: Arc<dyn KvStore>,
    sender: Arc<dyn HitSender>,
    context: HitContext,
    clock: Arc<dyn Clock>,
    connectivity: Arc<dyn Connectivity>,
    auto_dispatch: bool,
    session_inactivity: Duration,
}

impl TrackerBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Spawn a background drain after every track (default: on)
    pub fn auto_dispatch(mut self, enabled: bool) -> Self {
        self.auto_dispatch = enabled;
        self
    }

    pub fn session_inactivity(mut self, inactivity: Duration) -> Self {
        self.session_inactivity = inactivity;
        self
    }

    /// Build the tracker, rejecting a context that could never yield a valid hit
    pub fn build(self) -> Result<Tracker, HitError> {
        let probe = Hit::activity_session(
            &Uuid::nil().to_string(),
            local_iso8601(self.clock.now_ms()),
            &self.context,
        );
        probe.validated()?;

        let storage = Arc::new(HitStorage::new(self.store));
        let dispatcher = Dispatcher::new(storage.clone(), self.sender.clone(), self.connectivity);

        Ok(Tracker {
            inner: Arc::new(TrackerInner {
                storage,
                sender: self.sender,
                dispatcher,
                sessions: SessionManager::new(self.session_inactivity.as_millis() as i64),
                clock: self.clock,
                context: self.context,
            }),
            auto_dispatch: self.auto_dispatch,
        })
    }
}

// ============================================================================
// TRACKER
// ============================================================================

struct TrackerInner {
    storage: Arc<HitStorage>,
    sender: Arc<dyn HitSender>,
    dispatcher: Dispatcher,
    sessions: SessionManager,
    clock: Arc<dyn Clock>,
    context: HitContext,
}

/// Cheap to clone; all clones share one pipeline
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
    auto_dispatch: bool,
}

/// Result of the critical section. A rotated session's marker is delivered
/// whatever happens to the action hit.
struct Admitted {
    session_hit: Option<Hit>,
    action: Admission,
}

enum Admission {
    Accepted(Hit),
    Throttled,
    Rejected(HitError),
}

impl Tracker {
    pub fn builder(
        store: Arc<dyn KvStore>,
        sender: Arc<dyn HitSender>,
        context: HitContext,
    ) -> TrackerBuilder {
        TrackerBuilder {
            store,
            sender,
            context,
            clock: Arc::new(SystemClock),
            connectivity: Arc::new(AlwaysOnline),
            auto_dispatch: true,
            session_inactivity: Duration::from_millis(SESSION_INACTIVITY_MS as u64),
        }
    }

    /// Handle on the same pipeline that never spawns background drains;
    /// the holder calls `flush()` itself
    pub fn manual_dispatch(&self) -> Tracker {
        Tracker {
            inner: self.inner.clone(),
            auto_dispatch: false,
        }
    }

    pub fn context(&self) -> &HitContext {
        &self.inner.context
    }

    pub async fn track_impression(&self, params: HitParams) -> Result<Tracked, HitError> {
        self.track(EventType::Impression, params).await
    }

    pub async fn track_open(&self, params: HitParams) -> Result<Tracked, HitError> {
        self.track(EventType::Open, params).await
    }

    pub async fn track_click(&self, params: HitParams) -> Result<Tracked, HitError> {
        self.track(EventType::Click, params).await
    }

    /// Report a session start if the session rotated, then trigger a drain
    pub async fn track_activity_session(&self) -> Result<Tracked, HitError> {
        let now = self.inner.clock.now_ms();

        let session_hit = {
            let txn = self.inner.storage.begin().await;
            let grant = self.inner.sessions.acquire(&txn, now).await?;
            if grant.rotated {
                Some(self.session_hit(&grant.session, now)?)
            } else {
                None
            }
        };

        let outcome = match session_hit {
            Some(hit) => self.deliver(hit).await?,
            None => Tracked::Skipped,
        };

        self.schedule_dispatch();
        Ok(outcome)
    }

    /// Track an impression, open or click
    pub async fn track(&self, event_type: EventType, params: HitParams) -> Result<Tracked, HitError> {
        if event_type == EventType::ActivitySession {
            return self.track_activity_session().await;
        }

        let now = self.inner.clock.now_ms();

        let admitted = self.admit(event_type, params, now).await?;
        if let Some(session_hit) = admitted.session_hit {
            self.deliver(session_hit).await?;
        }

        let outcome = match admitted.action {
            Admission::Accepted(hit) => self.deliver(hit).await.map_err(HitError::from),
            Admission::Throttled => {
                log::debug!("{} throttled", event_type.as_str());
                Ok(Tracked::Throttled)
            }
            Admission::Rejected(e) => {
                log::warn!("Rejected malformed {} hit: {}", event_type.as_str(), e);
                Err(e)
            }
        };

        self.schedule_dispatch();
        outcome
    }

    /// Drain the pending queue now
    pub async fn flush(&self) -> DrainReport {
        self.inner.dispatcher.drain().await
    }

    pub async fn pending_count(&self) -> Result<usize, HitError> {
        Ok(self.inner.storage.pending_len().await?)
    }

    pub async fn current_session(&self) -> Result<Option<Session>, HitError> {
        let txn = self.inner.storage.begin().await;
        Ok(txn.session().await?)
    }

    /// Session, validation and throttle in one critical section.
    ///
    /// A malformed action hit is rejected before the throttle map is touched.
    async fn admit(&self, event_type: EventType, params: HitParams, now: i64) -> Result<Admitted, HitError> {
        let key = throttle_key(event_type, &params);

        let txn = self.inner.storage.begin().await;
        let grant = self.inner.sessions.acquire(&txn, now).await?;

        let session_hit = if grant.rotated {
            Some(self.session_hit(&grant.session, now)?)
        } else {
            None
        };

        let validated = Hit::new(
            event_type,
            &grant.session.uuid,
            local_iso8601(now),
            &self.inner.context,
            params,
        )
        .validated();

        let action = match validated {
            Err(e) => Admission::Rejected(e),
            Ok(hit) => match key {
                Some(key) => {
                    let mut throttle = txn.throttle_map().await?;
                    if throttle.is_suppressed(event_type, &key, now) {
                        Admission::Throttled
                    } else {
                        throttle.record(key, now);
                        txn.save_throttle_map(&throttle).await?;
                        Admission::Accepted(hit)
                    }
                }
                None => Admission::Accepted(hit),
            },
        };

        Ok(Admitted { session_hit, action })
    }

    fn session_hit(&self, session: &Session, now: i64) -> Result<Hit, HitError> {
        Hit::activity_session(&session.uuid, local_iso8601(now), &self.inner.context).validated()
    }

    /// Send immediately; queue the hit if that fails
    async fn deliver(&self, hit: Hit) -> Result<Tracked, StoreError> {
        match self.inner.sender.send_hit(&hit).await {
            Ok(()) => {
                log::debug!("{} hit sent", hit.event_type.as_str());
                Ok(Tracked::Sent)
            }
            Err(e) => {
                log::debug!("{} hit send failed, queueing: {}", hit.event_type.as_str(), e);

                let txn = self.inner.storage.begin().await;
                let mut queue = txn.pending().await?;
                if let Some(dropped) = queue.push(hit) {
                    log::warn!(
                        "Pending queue full, dropped oldest {} hit from {}",
                        dropped.event_type.as_str(),
                        dropped.app_date
                    );
                }
                txn.save_pending(&queue).await?;
                Ok(Tracked::Queued)
            }
        }
    }

    /// Fire-and-forget drain on the current runtime
    fn schedule_dispatch(&self) {
        if !self.auto_dispatch {
            return;
        }

        let tracker = self.clone();
        tokio::spawn(async move {
            match tracker.flush().await {
                DrainReport::Aborted => log::warn!("Background drain aborted"),
                report => log::debug!("Background drain: {:?}", report),
            }
        });
    }
}
