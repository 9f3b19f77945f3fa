//! Session Manager
//!
//! A session groups hits separated by less than the inactivity threshold.
//! Rotation mints a new uuid and clears the throttle map.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::storage::HitTxn;
use super::throttle::ThrottleMap;
use crate::constants::SESSION_INACTIVITY_MS;
use crate::error::StoreError;

/// Persisted session (`hits.session`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub uuid: String,
    pub last_active_at: i64,
}

impl Session {
    /// Start a fresh session at `now`
    pub fn start(now: i64) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            last_active_at: now,
        }
    }

    /// A clock running backwards never expires a session
    pub fn is_expired(&self, now: i64, inactivity_ms: i64) -> bool {
        now - self.last_active_at >= inactivity_ms
    }
}

/// Result of acquiring the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub session: Session,
    /// True when a new session was started by this call
    pub rotated: bool,
}

/// Keep or rotate `current`
pub fn advance_session(current: Option<Session>, now: i64, inactivity_ms: i64) -> SessionGrant {
    match current {
        Some(mut session) if !session.is_expired(now, inactivity_ms) => {
            session.last_active_at = session.last_active_at.max(now);
            SessionGrant { session, rotated: false }
        }
        _ => SessionGrant {
            session: Session::start(now),
            rotated: true,
        },
    }
}

/// Derives and rotates the session inside the hit storage critical section
#[derive(Debug, Clone)]
pub struct SessionManager {
    inactivity_ms: i64,
}

impl SessionManager {
    pub fn new(inactivity_ms: i64) -> Self {
        Self { inactivity_ms }
    }

    /// Read, refresh or rotate, and persist the session.
    ///
    /// Takes the open transaction so concurrent callers see a single
    /// rotation decision.
    pub async fn acquire(&self, txn: &HitTxn<'_>, now: i64) -> Result<SessionGrant, StoreError> {
        let grant = advance_session(txn.session().await?, now, self.inactivity_ms);
        txn.save_session(&grant.session).await?;

        if grant.rotated {
            txn.save_throttle_map(&ThrottleMap::new()).await?;
            log::info!("Session rotated: {}", grant.session.uuid);
        }

        Ok(grant)
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SESSION_INACTIVITY_MS)
    }
}
