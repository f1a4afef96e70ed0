//! Single-flight coordination for loader calls.
//!
//! At most one loader runs per key at a time. Later callers for the same key
//! block until the running load finishes, then re-read the cache.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct Flight {
    loading: Mutex<bool>,
    cv: Condvar,
}

impl Flight {
    fn new() -> Self {
        Self {
            loading: Mutex::new(true),
            cv: Condvar::new(),
        }
    }

    fn wait(&self) {
        let mut loading = self.loading.lock();
        while *loading {
            self.cv.wait(&mut loading);
        }
    }

    fn finish(&self) {
        *self.loading.lock() = false;
        self.cv.notify_all();
    }
}

/// Outcome of [`SingleFlight::join`].
pub(crate) enum Role<'a> {
    /// This caller runs the loader; dropping the guard releases the waiters.
    Leader(FlightGuard<'a>),
    /// Another caller is loading; [`Follower::wait`] blocks until it is done.
    Follower(Follower),
}

pub(crate) struct Follower(Arc<Flight>);

impl Follower {
    pub(crate) fn wait(self) {
        self.0.wait();
    }
}

/// Releases the flight on drop, including when the loader panics.
pub(crate) struct FlightGuard<'a> {
    group: &'a SingleFlight,
    key: String,
    flight: Arc<Flight>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.group.inflight.lock().remove(&self.key);
        self.flight.finish();
    }
}

#[derive(Debug, Default)]
pub(crate) struct SingleFlight {
    inflight: Mutex<HashMap<String, Arc<Flight>>>,
}

impl SingleFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers the caller as leader for `key`, or as a follower of the
    /// load already in progress.
    pub(crate) fn join(&self, key: &str) -> Role<'_> {
        let mut inflight = self.inflight.lock();
        if let Some(flight) = inflight.get(key) {
            return Role::Follower(Follower(Arc::clone(flight)));
        }
        let flight = Arc::new(Flight::new());
        inflight.insert(key.to_string(), Arc::clone(&flight));
        Role::Leader(FlightGuard {
            group: self,
            key: key.to_string(),
            flight,
        })
    }

    /// True while a loader for `key` is running.
    #[cfg(test)]
    pub(crate) fn is_loading(&self, key: &str) -> bool {
        self.inflight.lock().contains_key(key)
    }
}
