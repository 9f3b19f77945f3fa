//! Throttle Store
//!
//! Suppresses redundant low-value hits:
//! - impressions are sent once per session
//! - opens and clicks are sent at most once per 30 s window
//!
//! The map is persisted as `hits.lastSent` and cleared on session rotation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::hit::{EventType, HitParams};
use crate::constants::{THROTTLE_MAP_CAP, THROTTLE_WINDOW_MS};

/// Placeholder for a missing key component
pub const UNKNOWN: &str = "unknown";

/// Build the throttle key `{event_type}:{object_type}:{identifier}`.
///
/// Clicks resolve their identifier as `object_id`, then `target_url`,
/// then `button_name`. Session markers are never throttled.
pub fn throttle_key(event_type: EventType, params: &HitParams) -> Option<String> {
    let identifier = match event_type {
        EventType::ActivitySession => return None,
        EventType::Click => params
            .object_id
            .as_deref()
            .or(params.target_url.as_deref())
            .or(params.button_name.as_deref()),
        EventType::Impression | EventType::Open => params.object_id.as_deref(),
    };

    Some(format!(
        "{}:{}:{}",
        event_type.as_str(),
        params.object_type.as_deref().unwrap_or(UNKNOWN),
        identifier.unwrap_or(UNKNOWN)
    ))
}

/// Throttle keys mapped to the epoch-ms they were last sent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThrottleMap {
    entries: HashMap<String, i64>,
}

impl ThrottleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_sent(&self, key: &str) -> Option<i64> {
        self.entries.get(key).copied()
    }

    /// Check whether a hit with `key` must be dropped at `now`
    pub fn is_suppressed(&self, event_type: EventType, key: &str, now: i64) -> bool {
        let Some(last) = self.last_sent(key) else {
            return false;
        };

        match event_type {
            EventType::Impression => true,
            EventType::Open | EventType::Click => now - last < THROTTLE_WINDOW_MS,
            EventType::ActivitySession => false,
        }
    }

    /// Remember that `key` was sent at `now`
    pub fn record(&mut self, key: String, now: i64) {
        self.entries.insert(key, now);
        self.compact(THROTTLE_MAP_CAP);
    }

    /// Evict the oldest entries until at most `cap` remain
    fn compact(&mut self, cap: usize) {
        if self.entries.len() <= cap {
            return;
        }

        let mut by_age: Vec<(i64, String)> = self
            .entries
            .iter()
            .map(|(key, sent)| (*sent, key.clone()))
            .collect();
        by_age.sort();

        let excess = self.entries.len() - cap;
        for (_, key) in by_age.into_iter().take(excess) {
            self.entries.remove(&key);
        }
        log::debug!("Throttle map compacted, evicted {} keys", excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_key_resolution_order() {
        let all = HitParams::object("event", "e1")
            .with_target_url("https://engage.app/e/1")
            .with_button_name("join");
        assert_eq!(throttle_key(EventType::Click, &all).unwrap(), "click:event:e1");

        let no_id = HitParams::new()
            .with_object_type("event")
            .with_target_url("https://engage.app/e/1")
            .with_button_name("join");
        assert_eq!(
            throttle_key(EventType::Click, &no_id).unwrap(),
            "click:event:https://engage.app/e/1"
        );

        let button_only = HitParams::new().with_button_name("join");
        assert_eq!(throttle_key(EventType::Click, &button_only).unwrap(), "click:unknown:join");

        let nothing = HitParams::new();
        assert_eq!(throttle_key(EventType::Click, &nothing).unwrap(), "click:unknown:unknown");
    }

    #[test]
    fn test_impression_and_open_keys() {
        let params = HitParams::object("publication", "p9").with_target_url("https://engage.app");
        assert_eq!(throttle_key(EventType::Impression, &params).unwrap(), "impression:publication:p9");
        assert_eq!(throttle_key(EventType::Open, &params).unwrap(), "open:publication:p9");

        // target_url only counts for clicks
        let no_id = HitParams::new().with_object_type("publication").with_target_url("https://engage.app");
        assert_eq!(throttle_key(EventType::Open, &no_id).unwrap(), "open:publication:unknown");
    }

    #[test]
    fn test_session_marker_is_never_keyed() {
        assert!(throttle_key(EventType::ActivitySession, &HitParams::new()).is_none());
    }

    #[test]
    fn test_impression_never_expires() {
        let mut map = ThrottleMap::new();
        map.record("impression:event:e1".to_string(), 0);

        assert!(map.is_suppressed(EventType::Impression, "impression:event:e1", 1));
        assert!(map.is_suppressed(EventType::Impression, "impression:event:e1", 10 * 60 * 60 * 1000));
        assert!(!map.is_suppressed(EventType::Impression, "impression:event:e2", 1));
    }

    #[test]
    fn test_open_and_click_expire_after_window() {
        let mut map = ThrottleMap::new();
        map.record("open:event:e1".to_string(), 1_000);
        map.record("click:unknown:join".to_string(), 1_000);

        assert!(map.is_suppressed(EventType::Open, "open:event:e1", 6_000));
        assert!(map.is_suppressed(EventType::Click, "click:unknown:join", 30_999));
        assert!(!map.is_suppressed(EventType::Open, "open:event:e1", 31_000));
        assert!(!map.is_suppressed(EventType::Click, "click:unknown:join", 36_000));
    }

    #[test]
    fn test_compaction_evicts_oldest() {
        let mut map = ThrottleMap::new();
        for i in 0..5 {
            map.entries.insert(format!("impression:event:e{}", i), i as i64);
        }

        map.compact(3);

        assert_eq!(map.len(), 3);
        assert!(map.last_sent("impression:event:e0").is_none());
        assert!(map.last_sent("impression:event:e1").is_none());
        assert_eq!(map.last_sent("impression:event:e4"), Some(4));
    }

    #[test]
    fn test_record_respects_cap() {
        let mut map = ThrottleMap::new();
        for i in 0..(THROTTLE_MAP_CAP + 10) {
            map.record(format!("impression:event:e{}", i), i as i64);
        }
        assert_eq!(map.len(), THROTTLE_MAP_CAP);
        assert!(map.last_sent("impression:event:e0").is_none());
    }

    #[test]
    fn test_persisted_shape_is_flat_map() {
        let mut map = ThrottleMap::new();
        map.record("open:event:e1".to_string(), 42);
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, serde_json::json!({ "open:event:e1": 42 }));
    }
}
