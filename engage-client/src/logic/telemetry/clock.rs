//! Time source for session and throttle windows

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{Local, SecondsFormat, TimeZone, Utc};

/// Wall clock in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Real system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock moved by hand (tests, replays)
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Format epoch-ms as local ISO-8601 with an explicit UTC offset
pub fn local_iso8601(epoch_ms: i64) -> String {
    Local
        .timestamp_millis_opt(epoch_ms)
        .earliest()
        .unwrap_or_else(Local::now)
        .to_rfc3339_opts(SecondsFormat::Millis, false)
}
