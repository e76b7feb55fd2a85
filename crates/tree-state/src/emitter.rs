//! Publish/subscribe registry used by [`State`](crate::State).
//!
//! Listeners are keyed by path name. Emission clones the matching listeners
//! out of the registry before calling them, so a listener may subscribe or
//! unsubscribe (itself included) while it runs; such changes apply to the
//! next emission.

use indexmap::IndexSet;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StateError;
use crate::events::{StateEvent, SubscriptionId};

pub type Listener = Arc<dyn Fn(&StateEvent) + Send + Sync>;
pub type ErrorListener = Arc<dyn Fn(&StateError) + Send + Sync>;

/// Named-event registration, emission and enumeration.
///
/// [`EventEmitter`] is the stock implementation; a state can be given any
/// other bus through [`State::with_bus`](crate::State::with_bus).
pub trait EventBus: Send + Sync {
    fn subscribe(&self, event: String, listener: Listener) -> SubscriptionId;

    fn subscribe_errors(&self, listener: ErrorListener) -> SubscriptionId;

    /// Removes a path or error subscription. Returns `false` if it was unknown.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Calls every listener registered for `event.event`; returns how many ran.
    fn emit(&self, event: &StateEvent) -> usize;

    /// Calls every error listener; returns how many ran.
    fn emit_error(&self, error: &StateError) -> usize;

    /// Distinct names with at least one listener, in registration order.
    fn event_names(&self) -> Vec<String>;

    fn listener_count(&self, event: &str) -> usize;
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: BTreeMap<u64, (String, Listener)>,
    error_listeners: BTreeMap<u64, ErrorListener>,
}

impl Registry {
    fn allocate(&mut self) -> SubscriptionId {
        self.next_id = self.next_id.saturating_add(1);
        SubscriptionId(self.next_id)
    }
}

#[derive(Default)]
pub struct EventEmitter {
    registry: Mutex<Registry>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventBus for EventEmitter {
    fn subscribe(&self, event: String, listener: Listener) -> SubscriptionId {
        let mut registry = self.registry.lock();
        let id = registry.allocate();
        registry.listeners.insert(id.0, (event, listener));
        id
    }

    fn subscribe_errors(&self, listener: ErrorListener) -> SubscriptionId {
        let mut registry = self.registry.lock();
        let id = registry.allocate();
        registry.error_listeners.insert(id.0, listener);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.lock();
        registry.listeners.remove(&id.0).is_some()
            || registry.error_listeners.remove(&id.0).is_some()
    }

    fn emit(&self, event: &StateEvent) -> usize {
        let matching: Vec<Listener> = {
            let registry = self.registry.lock();
            registry
                .listeners
                .values()
                .filter(|(name, _)| *name == event.event)
                .map(|(_, listener)| Arc::clone(listener))
                .collect()
        };
        for listener in &matching {
            listener(event);
        }
        matching.len()
    }

    fn emit_error(&self, error: &StateError) -> usize {
        let listeners: Vec<ErrorListener> = self
            .registry
            .lock()
            .error_listeners
            .values()
            .map(Arc::clone)
            .collect();
        for listener in &listeners {
            listener(error);
        }
        listeners.len()
    }

    fn event_names(&self) -> Vec<String> {
        let registry = self.registry.lock();
        let names: IndexSet<&String> =
            registry.listeners.values().map(|(name, _)| name).collect();
        names.into_iter().cloned().collect()
    }

    fn listener_count(&self, event: &str) -> usize {
        self.registry
            .lock()
            .listeners
            .values()
            .filter(|(name, _)| name == event)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Listener) {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        let listener: Listener = Arc::new(move |_: &StateEvent| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        (hits, listener)
    }

    #[test]
    fn test_emit_reaches_only_matching_names() {
        let emitter = EventEmitter::new();
        let (posts, posts_listener) = counter();
        let (users, users_listener) = counter();
        emitter.subscribe("posts".into(), posts_listener);
        emitter.subscribe("users".into(), users_listener);

        assert_eq!(emitter.emit(&StateEvent::new("posts", None)), 1);
        assert_eq!(posts.load(Ordering::SeqCst), 1);
        assert_eq!(users.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_event_names_are_distinct_and_ordered() {
        let emitter = EventEmitter::new();
        let (_, a) = counter();
        let (_, b) = counter();
        let (_, c) = counter();
        emitter.subscribe("b".into(), a);
        emitter.subscribe("a".into(), b);
        emitter.subscribe("b".into(), c);
        assert_eq!(emitter.event_names(), vec!["b", "a"]);
        assert_eq!(emitter.listener_count("b"), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let emitter = EventEmitter::new();
        let (hits, listener) = counter();
        let id = emitter.subscribe("x".into(), listener);
        assert!(emitter.unsubscribe(id));
        assert!(!emitter.unsubscribe(id));
        assert_eq!(emitter.emit(&StateEvent::new("x", None)), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(emitter.event_names().is_empty());
    }

    #[test]
    fn test_listener_may_unsubscribe_while_running() {
        let emitter = Arc::new(EventEmitter::new());
        let slot: Arc<parking_lot::Mutex<Option<SubscriptionId>>> = Arc::default();
        let hits = Arc::new(AtomicUsize::new(0));

        let emitter_clone = Arc::clone(&emitter);
        let slot_clone = Arc::clone(&slot);
        let hits_clone = Arc::clone(&hits);
        let id = emitter.subscribe(
            "once".into(),
            Arc::new(move |_: &StateEvent| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = slot_clone.lock().take() {
                    emitter_clone.unsubscribe(id);
                }
            }),
        );
        *slot.lock() = Some(id);

        emitter.emit(&StateEvent::new("once", None));
        emitter.emit(&StateEvent::new("once", None));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_error_listeners() {
        let emitter = EventEmitter::new();
        let seen: Arc<parking_lot::Mutex<Vec<StateError>>> = Arc::default();
        let seen_clone = Arc::clone(&seen);
        let id = emitter.subscribe_errors(Arc::new(move |err: &StateError| {
            seen_clone.lock().push(err.clone());
        }));

        assert_eq!(emitter.emit_error(&StateError::NotAnArray), 1);
        assert_eq!(*seen.lock(), vec![StateError::NotAnArray]);
        assert!(emitter.unsubscribe(id));
        assert_eq!(emitter.emit_error(&StateError::NotAnArray), 0);
    }
}
