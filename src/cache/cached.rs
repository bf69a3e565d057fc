//! TTL-bound memoization of a single getter

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

use super::erased::ErasedCached;
use crate::clock::{Clock, SystemClock};
use crate::reset::{ResetRegistry, Resettable};

type Getter<T, E> = Box<dyn Fn() -> Result<T, E> + Send + Sync>;

/// Counters describing how a cache has been used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    /// Reads served from the memo
    pub hits: u64,
    /// Reads that invoked the getter
    pub misses: u64,
    /// Resets received from the registry
    pub resets: u64,
}

impl CacheMetrics {
    /// Fraction of reads served without calling the getter
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Memo state; the result and its stamp always change together
struct Memo<T, E> {
    updated: Option<DateTime<Utc>>,
    result: Option<Result<T, E>>,
    metrics: CacheMetrics,
}

/// Wraps a getter and replays its last result for `ttl`
///
/// Errors are memoized like values: a failing getter is retried at most once
/// per TTL window. A zero or negative TTL disables memoization.
pub struct Cached<T, E> {
    getter: Getter<T, E>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    memo: Mutex<Memo<T, E>>,
}

impl<T, E> fmt::Debug for Cached<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cached")
            .field("value_type", &type_name::<T>())
            .field("ttl", &self.ttl)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl<T, E> Cached<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Wraps `getter` using the system clock
    ///
    /// The getter is not called until the first read.
    pub fn new<F>(getter: F, ttl: Duration, resets: &ResetRegistry) -> Arc<Self>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Self::with_clock(getter, ttl, resets, Arc::new(SystemClock))
    }

    /// Wraps `getter` using the given clock
    ///
    /// # Arguments
    /// * `getter` - Producer of the cached value
    /// * `ttl` - How long a result is served before the getter runs again
    /// * `resets` - Registry whose resets invalidate this cache
    /// * `clock` - Time source used for TTL checks
    pub fn with_clock<F>(
        getter: F,
        ttl: Duration,
        resets: &ResetRegistry,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self>
    where
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        let cached = Arc::new(Self {
            getter: Box::new(getter),
            ttl,
            clock,
            memo: Mutex::new(Memo {
                updated: None,
                result: None,
                metrics: CacheMetrics::default(),
            }),
        });

        let weak = Arc::downgrade(&cached);
        let weak: Weak<dyn Resettable> = weak;
        resets.subscribe_instance(weak);

        cached
    }

    /// Returns the memoized result, calling the getter first if it is stale
    ///
    /// The lock is held across the getter call, so concurrent readers of a
    /// stale cache wait for one call and all receive its result.
    pub fn get(&self) -> Result<T, E> {
        let mut memo = self.memo.lock();

        let fresh = match memo.updated {
            Some(updated) => self.ttl > Duration::zero() && self.clock.since(updated) <= self.ttl,
            None => false,
        };

        let result = match memo.result.take() {
            Some(result) if fresh => {
                memo.metrics.hits += 1;
                result
            }
            _ => {
                trace!(value_type = type_name::<T>(), "calling cached getter");
                let result = (self.getter)();
                memo.updated = Some(self.clock.now());
                memo.metrics.misses += 1;
                result
            }
        };

        memo.result = Some(result.clone());
        result
    }

    /// Returns a zero-argument accessor bound to this cache
    pub fn getter(self: &Arc<Self>) -> impl Fn() -> Result<T, E> + Send + Sync + 'static {
        let cached = Arc::clone(self);
        move || cached.get()
    }

    /// Hides the result type for runtime wiring
    pub fn erase(self: &Arc<Self>) -> ErasedCached {
        ErasedCached::new(Arc::clone(self))
    }
}

impl<T, E> Cached<T, E> {
    /// Forces the next read to call the getter
    ///
    /// The memoized result stays readable until that read replaces it.
    pub fn reset(&self) {
        let mut memo = self.memo.lock();
        memo.updated = None;
        memo.metrics.resets += 1;
        debug!(value_type = type_name::<T>(), "cache reset");
    }

    /// Configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// When the getter last ran, or `None` if it has not run since
    /// construction or the last reset
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.memo.lock().updated
    }

    /// Snapshot of the usage counters
    pub fn metrics(&self) -> CacheMetrics {
        self.memo.lock().metrics
    }
}

impl<T, E> Resettable for Cached<T, E>
where
    T: Send,
    E: Send,
{
    fn reset(&self) {
        Cached::reset(self);
    }
}
