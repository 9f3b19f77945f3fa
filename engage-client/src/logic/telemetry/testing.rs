//! Test doubles for the telemetry pipeline

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::dispatcher::HitSender;
use super::hit::{EventType, Hit};
use crate::error::ApiError;

/// Enable `log` output in tests (`RUST_LOG=debug cargo test`)
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Records every delivery attempt; fails once its success budget runs out
#[derive(Default)]
pub struct RecordingSender {
    delivered: Mutex<Vec<Hit>>,
    attempts: Mutex<usize>,
    budget: Mutex<Option<usize>>,
    delay: Option<Duration>,
}

impl RecordingSender {
    /// Accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts the first `successes` hits, then fails
    pub fn succeeding(successes: usize) -> Self {
        Self {
            budget: Mutex::new(Some(successes)),
            ..Default::default()
        }
    }

    /// Rejects everything
    pub fn offline() -> Self {
        Self::succeeding(0)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Change the remaining success budget (`None` = unlimited)
    pub fn set_budget(&self, successes: Option<usize>) {
        *self.budget.lock() = successes;
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }

    pub fn delivered(&self) -> Vec<Hit> {
        self.delivered.lock().clone()
    }

    pub fn event_types(&self) -> Vec<EventType> {
        self.delivered.lock().iter().map(|hit| hit.event_type).collect()
    }

    pub fn count(&self, event_type: EventType) -> usize {
        self.delivered.lock().iter().filter(|hit| hit.event_type == event_type).count()
    }

    pub fn button_names(&self) -> Vec<String> {
        self.delivered
            .lock()
            .iter()
            .filter_map(|hit| hit.button_name.clone())
            .collect()
    }
}

#[async_trait]
impl HitSender for RecordingSender {
    async fn send_hit(&self, hit: &Hit) -> Result<(), ApiError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        *self.attempts.lock() += 1;

        {
            let mut budget = self.budget.lock();
            match budget.as_mut() {
                Some(0) => return Err(ApiError::Network("connection refused".to_string())),
                Some(left) => *left -= 1,
                None => {}
            }
        }

        self.delivered.lock().push(hit.clone());
        Ok(())
    }
}
