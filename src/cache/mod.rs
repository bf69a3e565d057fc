//! Memoizing cache for fallible zero-argument getters
//!
//! A `Cached<T, E>` wraps one getter and serves its last result, value or
//! error, until the TTL elapses or the owning `ResetRegistry` publishes a
//! reset. Concurrent readers are serialized on one lock per instance, so a
//! stale window triggers at most one upstream call.
//!
//! `ErasedCached` hides the result type for runtime wiring. Its typed
//! accessors check the requested type against the construction type and
//! fail with `CacheError::TypeMismatch` instead of producing a default value.

mod cached;
mod erased;

pub use cached::{CacheMetrics, Cached};
pub use erased::{AnyValue, CacheError, ErasedCached};

use chrono::{DateTime, Duration, Utc};

/// Cache producing floating-point values
pub type FloatCache<E> = Cached<f64, E>;
/// Cache producing integer values
pub type IntCache<E> = Cached<i64, E>;
/// Cache producing text values
pub type StringCache<E> = Cached<String, E>;
/// Cache producing boolean values
pub type BoolCache<E> = Cached<bool, E>;
/// Cache producing durations
pub type DurationCache<E> = Cached<Duration, E>;
/// Cache producing points in time
pub type TimeCache<E> = Cached<DateTime<Utc>, E>;
/// Cache producing opaque values
pub type AnyCache<E> = Cached<AnyValue, E>;
