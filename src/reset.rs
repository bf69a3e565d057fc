//! Reset registry for invalidating every cache at once
//!
//! Each cache subscribes to the registry it is constructed with. Publishing a
//! reset reaches all live subscribers before `publish_reset` returns, which
//! forces every cache to recompute on its next read. There is no per-instance
//! targeting; a reset is always global to the registry.

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Something that can be told to drop its freshness stamp
pub trait Resettable: Send + Sync {
    /// Invalidates the instance so its next read recomputes
    fn reset(&self);
}

type Handler = Arc<dyn Fn() + Send + Sync>;

enum Subscriber {
    /// Plain callback, kept for the registry's lifetime
    Handler(Handler),
    /// Weakly held instance, pruned once dropped
    Instance(Weak<dyn Resettable>),
}

/// Publish/subscribe channel carrying the global reset signal
///
/// The registry is owned by whatever owns the set of caches and is passed to
/// each cache at construction, so separate owners (and separate tests) never
/// share reset state.
#[derive(Default)]
pub struct ResetRegistry {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl fmt::Debug for ResetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetRegistry")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl ResetRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler invoked on every published reset
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribers
            .lock()
            .push(Subscriber::Handler(Arc::new(handler)));
    }

    /// Registers an instance without keeping it alive
    pub fn subscribe_instance(&self, instance: Weak<dyn Resettable>) {
        self.subscribers.lock().push(Subscriber::Instance(instance));
    }

    /// Invokes every registered subscriber
    ///
    /// Subscribers are collected under the list lock and invoked after it is
    /// released, so a handler may subscribe further handlers. Instances that
    /// have been dropped are removed.
    ///
    /// # Returns
    /// The number of subscribers that received the reset
    pub fn publish_reset(&self) -> usize {
        let mut handlers: Vec<Handler> = Vec::new();
        let mut instances: Vec<Arc<dyn Resettable>> = Vec::new();

        {
            let mut subscribers = self.subscribers.lock();
            subscribers.retain(|subscriber| match subscriber {
                Subscriber::Handler(handler) => {
                    handlers.push(Arc::clone(handler));
                    true
                }
                Subscriber::Instance(weak) => match weak.upgrade() {
                    Some(instance) => {
                        instances.push(instance);
                        true
                    }
                    None => false,
                },
            });
        }

        for handler in &handlers {
            handler();
        }
        for instance in &instances {
            instance.reset();
        }

        let delivered = handlers.len() + instances.len();
        debug!(subscribers = delivered, "published cache reset");
        delivered
    }

    /// Returns the number of registered subscribers, including dropped
    /// instances not yet pruned
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Returns true if nothing is subscribed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
