use jiff::{SignedDuration, Timestamp};
use std::sync::{Arc, Mutex, PoisonError};

pub trait Clock: Send + Sync {
    /// Returns the current time of the clock
    fn now(&self) -> Timestamp;
    /// Block and wait until the clock reaches the target time.
    fn wait_until(&self, target: Timestamp);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn wait_until(&self, target: Timestamp) {
        // The gap is at most one millisecond when the sequence rolls over, so
        // spinning is cheaper than asking the scheduler to park the thread.
        while Timestamp::now() < target {
            std::hint::spin_loop();
        }
    }
}

/// A clock that only moves when told to.
///
/// Useful for driving a [`Snowflake`](crate::Snowflake) through sequence
/// rollover or clock regression deterministically. Clones share the same
/// underlying time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            inner: Arc::new(Mutex::new(now)),
        }
    }

    /// Moves the clock to `now`, which may be in the past.
    pub fn set(&self, now: Timestamp) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Moves the clock forward (or backward, for a negative duration).
    pub fn advance(&self, by: SignedDuration) {
        let mut now = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Ok(next) = now.checked_add(by) {
            *now = next;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_until(&self, target: Timestamp) {
        let mut now = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // nobody else will move a manual clock, so jump straight to the target
        if target > *now {
            *now = target;
        }
    }
}
