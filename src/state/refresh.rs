use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::trace;

/// Zero-argument callback that makes a component reload its data.
pub type RefreshCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_token: u64,
    by_id: HashMap<String, (u64, RefreshCallback)>,
}

/// Component id -> refresh callback, so actions can reload a component without
/// holding a reference to it.
///
/// At most one callback per id; a later registration replaces the earlier one.
#[derive(Clone, Default)]
pub struct RefreshRegistry {
    inner: Arc<Mutex<Listeners>>,
}

impl fmt::Debug for RefreshRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners();
        let mut ids: Vec<_> = listeners.by_id.keys().collect();
        ids.sort();
        f.debug_struct("RefreshRegistry").field("ids", &ids).finish()
    }
}

impl RefreshRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register<F>(&self, id: &str, callback: F) -> RefreshSubscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut listeners = self.listeners();
        listeners.next_token += 1;
        let token = listeners.next_token;
        if listeners
            .by_id
            .insert(id.to_string(), (token, Arc::new(callback)))
            .is_some()
        {
            trace!(target: "pageflow::refresh", %id, "Refresh listener replaced");
        }
        RefreshSubscription {
            registry: Arc::downgrade(&self.inner),
            id: id.to_string(),
            token,
        }
    }

    /// Invoke the listener for `id`. Returns whether one was registered;
    /// a missing listener is not an error.
    pub fn trigger(&self, id: &str) -> bool {
        // Clone out of the lock so the callback may touch the registry.
        let callback = self.listeners().by_id.get(id).map(|(_, cb)| Arc::clone(cb));
        match callback {
            Some(callback) => {
                trace!(target: "pageflow::refresh", %id, "Triggering refresh listener");
                callback();
                true
            }
            None => {
                trace!(target: "pageflow::refresh", %id, "No refresh listener registered");
                false
            }
        }
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.listeners().by_id.contains_key(id)
    }
}

/// Handle returned by [`RefreshRegistry::register`].
///
/// Dropping it keeps the listener registered; call [`RefreshSubscription::unregister`]
/// on unmount. Unregistering only removes the listener it installed, never a
/// newer one registered under the same id.
#[derive(Debug)]
pub struct RefreshSubscription {
    registry: Weak<Mutex<Listeners>>,
    id: String,
    token: u64,
}

impl RefreshSubscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn unregister(self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut listeners = registry.lock().unwrap_or_else(PoisonError::into_inner);
        if listeners
            .by_id
            .get(&self.id)
            .is_some_and(|(token, _)| *token == self.token)
        {
            listeners.by_id.remove(&self.id);
            trace!(target: "pageflow::refresh", id = %self.id, "Refresh listener unregistered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn trigger_unregistered_is_a_noop() {
        let registry = RefreshRegistry::new();
        assert!(!registry.trigger("ghost"));
    }

    #[test]
    fn trigger_invokes_callback() {
        let registry = RefreshRegistry::new();
        let (count, cb) = counter();
        let _sub = registry.register("table1", cb);
        assert!(registry.trigger("table1"));
        assert!(registry.trigger("table1"));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn later_registration_replaces_and_stale_unregister_is_ignored() {
        let registry = RefreshRegistry::new();
        let (first, cb1) = counter();
        let (second, cb2) = counter();
        let old = registry.register("t", cb1);
        let new = registry.register("t", cb2);

        old.unregister();
        assert!(registry.is_registered("t"));
        registry.trigger("t");
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        new.unregister();
        assert!(!registry.is_registered("t"));
    }

    #[test]
    fn callback_may_reenter_registry() {
        let registry = RefreshRegistry::new();
        let inner = registry.clone();
        let _sub = registry.register("self", move || {
            assert!(inner.is_registered("self"));
        });
        assert!(registry.trigger("self"));
    }
}
