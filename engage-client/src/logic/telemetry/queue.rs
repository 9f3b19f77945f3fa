//! Pending Queue
//!
//! Bounded list of validated hits that could not be delivered yet,
//! persisted as `hits.pending`.
//!
//! The stored array is newest-first: new hits are prepended and overflow
//! truncates the tail, dropping the oldest. Delivery is oldest-first, so
//! the dispatcher always works from the tail.

use serde::{Deserialize, Serialize};

use super::hit::Hit;
use crate::constants::PENDING_QUEUE_CAP;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingQueue {
    hits: Vec<Hit>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Add a hit; returns the oldest hit when the cap forced it out
    pub fn push(&mut self, hit: Hit) -> Option<Hit> {
        self.hits.insert(0, hit);
        if self.hits.len() > PENDING_QUEUE_CAP {
            self.hits.pop()
        } else {
            None
        }
    }

    /// Next hit to deliver
    pub fn oldest(&self) -> Option<&Hit> {
        self.hits.last()
    }

    /// Remove the next hit to deliver
    pub fn pop_oldest(&mut self) -> Option<Hit> {
        self.hits.pop()
    }

    /// Drop anything beyond the cap (e.g. a queue written by an older build)
    pub fn enforce_cap(&mut self) -> usize {
        let excess = self.hits.len().saturating_sub(PENDING_QUEUE_CAP);
        self.hits.truncate(PENDING_QUEUE_CAP);
        excess
    }

    /// Hits in stored order, newest first
    pub fn iter(&self) -> impl Iterator<Item = &Hit> {
        self.hits.iter()
    }
}
