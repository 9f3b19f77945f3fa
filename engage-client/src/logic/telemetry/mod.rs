//! Telemetry Module
//!
//! Member engagement hits: impressions, opens, clicks and session starts.
//! Hits are throttled, sent immediately when possible and otherwise kept
//! in a persisted queue that is drained on the next trigger.
//!
//! ## Structure
//! - `hit.rs` - Hit record, params and schema rules
//! - `clock.rs` - Time source and local ISO-8601 formatting
//! - `session.rs` - Session derivation and rotation
//! - `throttle.rs` - Throttle keys and the last-sent map
//! - `queue.rs` - Bounded pending queue
//! - `storage.rs` - Critical section over the persisted keys
//! - `dispatcher.rs` - Re-entrancy guarded queue drain
//! - `tracker.rs` - Public facade
//! - `lifecycle.rs` - Foreground / reconnect triggers
//!
//! ## Usage
//! ```ignore
//! let tracker = Tracker::builder(store, sender, config.hit_context()).build()?;
//!
//! tracker.track_impression(HitParams::object("event", "e1")).await?;
//! tracker.track_click(HitParams::new().with_button_name("join")).await?;
//!
//! // On app foreground
//! tracker.flush().await;
//! ```

pub mod clock;
pub mod dispatcher;
pub mod hit;
pub mod lifecycle;
pub mod queue;
pub mod session;
pub mod storage;
pub mod throttle;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatcher::{AlwaysOnline, Connectivity, ConnectivityFlag, Dispatcher, DrainReport, HitSender};
pub use hit::{AppSystem, EventType, Hit, HitContext, HitParams};
pub use lifecycle::{watch_lifecycle, LifecycleEvent, LifecycleWatcher};
pub use queue::PendingQueue;
pub use session::{Session, SessionGrant, SessionManager};
pub use throttle::{throttle_key, ThrottleMap};
pub use tracker::{Tracked, Tracker, TrackerBuilder};
