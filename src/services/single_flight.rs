//! Keyed in-flight guard
//!
//! At most one operation per key runs at a time. A second caller for a busy
//! key is turned away immediately; the slot frees when the guard drops, which
//! also covers futures that are cancelled mid-flight.

use std::{
    collections::HashSet,
    fmt::Debug,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

pub struct SingleFlight<K> {
    in_flight: Arc<Mutex<HashSet<K>>>,
}

impl<K> SingleFlight<K>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Claim `key`, or `None` if an operation for it is already running
    pub fn try_acquire(&self, key: K) -> Option<FlightGuard<K>> {
        if !lock(&self.in_flight).insert(key.clone()) {
            tracing::debug!(?key, "operation already in flight");
            return None;
        }
        Some(FlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            key,
        })
    }
}

impl<K> Default for SingleFlight<K>
where
    K: Eq + Hash + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Releases its key on drop
pub struct FlightGuard<K: Eq + Hash> {
    in_flight: Arc<Mutex<HashSet<K>>>,
    key: K,
}

impl<K: Eq + Hash> Drop for FlightGuard<K> {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.key);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
