//! Type-erased cache handle with checked typed accessors

use chrono::{DateTime, Duration, Utc};
use std::any::{type_name, Any};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

use super::cached::Cached;

/// Opaque value for getters whose result type the cache does not interpret
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// Errors raised by the cache itself, never by the wrapped getter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// An accessor asked for a different type than the getter produces
    #[error("invalid type: cache wraps {actual}, accessor expected {expected}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

/// A `Cached<T, E>` with its types hidden
///
/// Obtained from `Cached::erase`. Each accessor recovers the concrete cache
/// and fails with `CacheError::TypeMismatch` if the requested types differ
/// from the ones the cache was built with. A mismatch is a wiring bug and
/// callers are expected to abort startup on it.
#[derive(Clone)]
pub struct ErasedCached {
    inner: Arc<dyn Any + Send + Sync>,
    getter_type: &'static str,
}

impl std::fmt::Debug for ErasedCached {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErasedCached")
            .field("getter_type", &self.getter_type)
            .finish()
    }
}

impl ErasedCached {
    pub(super) fn new<T, E>(cached: Arc<Cached<T, E>>) -> Self
    where
        T: Clone + Send + 'static,
        E: Clone + Send + 'static,
    {
        Self {
            inner: cached,
            getter_type: type_name::<fn() -> Result<T, E>>(),
        }
    }

    /// Type of the wrapped getter, as written in source
    pub fn getter_type(&self) -> &'static str {
        self.getter_type
    }

    /// Recovers the concrete cache
    pub fn typed<T, E>(&self) -> Result<Arc<Cached<T, E>>, CacheError>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + 'static,
    {
        Arc::clone(&self.inner)
            .downcast::<Cached<T, E>>()
            .map_err(|_| {
                let err = CacheError::TypeMismatch {
                    expected: type_name::<fn() -> Result<T, E>>(),
                    actual: self.getter_type,
                };
                error!(%err, "cache accessor misconfigured");
                err
            })
    }

    /// Accessor for a floating-point cache
    pub fn float_getter<E>(&self) -> Result<impl Fn() -> Result<f64, E> + Send + Sync, CacheError>
    where
        E: Clone + Send + 'static,
    {
        Ok(self.typed::<f64, E>()?.getter())
    }

    /// Accessor for an integer cache
    pub fn int_getter<E>(&self) -> Result<impl Fn() -> Result<i64, E> + Send + Sync, CacheError>
    where
        E: Clone + Send + 'static,
    {
        Ok(self.typed::<i64, E>()?.getter())
    }

    /// Accessor for a text cache
    pub fn string_getter<E>(&self) -> Result<impl Fn() -> Result<String, E> + Send + Sync, CacheError>
    where
        E: Clone + Send + 'static,
    {
        Ok(self.typed::<String, E>()?.getter())
    }

    /// Accessor for a boolean cache
    pub fn bool_getter<E>(&self) -> Result<impl Fn() -> Result<bool, E> + Send + Sync, CacheError>
    where
        E: Clone + Send + 'static,
    {
        Ok(self.typed::<bool, E>()?.getter())
    }

    /// Accessor for a duration cache
    pub fn duration_getter<E>(
        &self,
    ) -> Result<impl Fn() -> Result<Duration, E> + Send + Sync, CacheError>
    where
        E: Clone + Send + 'static,
    {
        Ok(self.typed::<Duration, E>()?.getter())
    }

    /// Accessor for a point-in-time cache
    pub fn time_getter<E>(
        &self,
    ) -> Result<impl Fn() -> Result<DateTime<Utc>, E> + Send + Sync, CacheError>
    where
        E: Clone + Send + 'static,
    {
        Ok(self.typed::<DateTime<Utc>, E>()?.getter())
    }

    /// Accessor for an opaque cache
    pub fn any_getter<E>(&self) -> Result<impl Fn() -> Result<AnyValue, E> + Send + Sync, CacheError>
    where
        E: Clone + Send + 'static,
    {
        Ok(self.typed::<AnyValue, E>()?.getter())
    }
}
