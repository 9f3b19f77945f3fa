//! Single-flight
//!
//! Collapses concurrent calls for the same key into one execution.
//! The first caller starts the operation, later callers join the same
//! shared future and all of them receive the same result. The entry is
//! removed once the operation settles, whatever the outcome.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

type Flight<T> = Shared<BoxFuture<'static, T>>;

/// In-flight operations, keyed by operation identity
pub struct SingleFlight<K, T>
where
    T: Clone,
{
    flights: Arc<Mutex<HashMap<K, (u64, Flight<T>)>>>,
    generation: AtomicU64,
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Run `start()` unless an operation for `key` is already in flight,
    /// in which case wait for that one instead.
    pub async fn run<F, Fut>(&self, key: K, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = {
            let mut flights = self.flights.lock();
            match flights.get(&key) {
                Some((_, flight)) => {
                    log::debug!("Joining in-flight operation");
                    flight.clone()
                }
                None => {
                    let id = self.generation.fetch_add(1, Ordering::Relaxed);
                    let registry = Arc::clone(&self.flights);
                    let settled_key = key.clone();
                    let work = start();

                    let flight = async move {
                        let output = work.await;
                        // Only clear our own entry, never a newer flight
                        let mut flights = registry.lock();
                        if flights.get(&settled_key).map_or(false, |(current, _)| *current == id) {
                            flights.remove(&settled_key);
                        }
                        output
                    }
                    .boxed()
                    .shared();

                    flights.insert(key, (id, flight.clone()));
                    flight
                }
            }
        };

        flight.await
    }

    /// Number of operations currently in flight
    pub fn in_flight(&self) -> usize {
        self.flights.lock().len()
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.flights.lock().contains_key(key)
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
