//! Time source abstraction
//!
//! Caches never read the system clock directly. They ask a `Clock`, which is
//! the real clock in production and a `MockClock` in tests so TTL expiry can be
//! driven without sleeping.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::Arc;

/// Supplies the current time and elapsed durations
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time
    fn now(&self) -> DateTime<Utc>;

    /// Returns the time elapsed since `t`
    fn since(&self, t: DateTime<Utc>) -> Duration {
        self.now() - t
    }
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for deterministic tests
///
/// Clones share the same underlying time, so a test can hand one clone to a
/// cache and keep another to advance it.
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClock {
    /// Creates a clock positioned at the Unix epoch
    pub fn new() -> Self {
        Self::at(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Creates a clock positioned at `t`
    pub fn at(t: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(t)),
        }
    }

    /// Moves the clock to `t`
    pub fn set(&self, t: DateTime<Utc>) {
        *self.now.lock() = t;
    }

    /// Moves the clock forward by `d`
    pub fn add(&self, d: Duration) {
        let mut now = self.now.lock();
        *now += d;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
