//! Clock seam for time-dependent behavior (cap day boundaries, timestamps).

use std::sync::{Arc, Mutex};

use questline_types::Timestamp;

/// Source of the current time.
///
/// The orchestrator takes its clock through this trait so the daily cap's
/// day boundary and every entry's `created_at` are controllable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Lets a caller keep a handle on a shared clock (a [`ManualClock`] in
/// tests) while the ledger owns another.
impl<C: Clock> Clock for Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now: Timestamp) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    /// Moves the clock forward.
    pub fn advance_millis(&self, millis: i64) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = Timestamp::from_millis(guard.as_millis() + millis);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now
            .lock()
            .map(|guard| *guard)
            .unwrap_or(Timestamp::EPOCH)
    }
}
