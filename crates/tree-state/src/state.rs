use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use tree_state_path::{lookup, lookup_strict, PathLike};

use crate::config::StateConfig;
use crate::dispatcher::{in_mutator, read_in_flight, Dispatcher, MutationHandle, Shared};
use crate::emitter::{EventBus, EventEmitter};
use crate::error::StateError;
use crate::events::{StateEvent, SubscriptionId, WILDCARD};
use crate::toolset::{Toolset, TreeToolset};

/// A shared, path-addressable state tree.
///
/// Cloning is cheap and every clone refers to the same tree, subscriptions
/// and dispatcher. Mutations are queued and applied one at a time on the
/// dispatcher thread; reads see the last fully applied mutation, except from
/// inside a mutator, where they see the tree that mutator is working on.
///
/// A listener that captures a clone of the state keeps it alive for as long
/// as the subscription exists.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use tree_state::State;
///
/// let state = State::new().unwrap();
/// state.set("posts/new/0", json!({"id": 1}));
/// state.concat("posts/new", json!({"id": 2}));
/// state.wait_for_mutations();
/// assert_eq!(state.get("posts/new/1/id"), Some(json!(2)));
/// ```
#[derive(Clone)]
pub struct State {
    inner: Arc<StateInner>,
}

struct StateInner {
    shared: Arc<Shared>,
    dispatcher: Dispatcher,
}

impl State {
    /// An empty tree with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Spawn`] if the dispatcher thread cannot start.
    pub fn new() -> Result<Self, StateError> {
        Self::with_initial(Value::Object(Map::new()))
    }

    /// # Errors
    ///
    /// Returns [`StateError::InitialNotObject`] unless `initial` is a mapping.
    pub fn with_initial(initial: Value) -> Result<Self, StateError> {
        Self::with_config(initial, StateConfig::default())
    }

    /// # Errors
    ///
    /// See [`State::with_bus`].
    pub fn with_config(initial: Value, config: StateConfig) -> Result<Self, StateError> {
        Self::with_bus(initial, config, Arc::new(EventEmitter::new()))
    }

    /// A state publishing through the given event bus.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InitialNotObject`] unless `initial` is a mapping,
    /// and [`StateError::Spawn`] when the configuration is invalid or the
    /// dispatcher thread cannot start.
    pub fn with_bus(
        initial: Value,
        config: StateConfig,
        bus: Arc<dyn EventBus>,
    ) -> Result<Self, StateError> {
        if !initial.is_object() {
            return Err(StateError::InitialNotObject);
        }
        let shared = Arc::new(Shared {
            tree: RwLock::new(initial),
            bus,
            config,
        });
        let dispatcher = Dispatcher::spawn(Arc::clone(&shared))?;
        Ok(Self {
            inner: Arc::new(StateInner { shared, dispatcher }),
        })
    }

    /// Canonical form of `path`; see [`tree_state_path::resolve_path`].
    pub fn resolve_path<P: PathLike>(path: P) -> String {
        tree_state_path::resolve_path(path)
    }

    fn shared(&self) -> &Shared {
        &self.inner.shared
    }

    fn read<R>(&self, read: impl Fn(&Value) -> R) -> R {
        let shared = self.shared();
        read_in_flight(shared, &read).unwrap_or_else(|| read(&*shared.tree.read()))
    }

    /// Value at `path`, or `None` when nothing can be reached there.
    /// The empty path returns the whole tree.
    pub fn get<P: PathLike>(&self, path: P) -> Option<Value> {
        let path = Self::resolve_path(path);
        self.read(|tree| lookup(tree, path.as_str()).cloned())
    }

    /// Like [`State::get`], but a path that runs into a missing or
    /// non-container intermediate node is an error.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::UnresolvablePath`].
    pub fn get_strict<P: PathLike>(&self, path: P) -> Result<Option<Value>, StateError> {
        let path = Self::resolve_path(path);
        let found = self.read(|tree| {
            lookup_strict(tree, path.as_str()).map(|found| found.cloned())
        });
        Ok(found?)
    }

    pub fn snapshot(&self) -> Value {
        self.read(Value::clone)
    }

    pub fn set<P: PathLike>(&self, path: P, value: Value) -> MutationHandle {
        let path = Self::resolve_path(path);
        self.mutate(move |tools| tools.set(path, value))
    }

    pub fn remove<P: PathLike>(&self, path: P) -> MutationHandle {
        let path = Self::resolve_path(path);
        self.mutate(move |tools| tools.remove(path))
    }

    pub fn merge<P: PathLike>(&self, path: P, subject: Value) -> MutationHandle {
        let path = Self::resolve_path(path);
        self.mutate(move |tools| tools.merge(path, subject))
    }

    pub fn concat<P: PathLike>(&self, path: P, value: Value) -> MutationHandle {
        let path = Self::resolve_path(path);
        self.mutate(move |tools| tools.concat(path, value))
    }

    pub fn update<P, F>(&self, path: P, transformer: F) -> MutationHandle
    where
        P: PathLike,
        F: FnOnce(Option<Value>) -> Value + Send + 'static,
    {
        let path = Self::resolve_path(path);
        self.mutate(move |tools| tools.update(path, transformer))
    }

    /// Queues `mutator` as a single cycle.
    ///
    /// All operations it performs are flushed together once it returns `Ok`.
    /// An `Err` (or a panic) aborts the cycle's emissions; operations that
    /// already succeeded stay applied.
    ///
    /// ```
    /// use serde_json::json;
    /// use tree_state::{State, Toolset};
    ///
    /// let state = State::new().unwrap();
    /// let handle = state.mutate(|tools| {
    ///     tools.set("a", json!(1))?;
    ///     tools.merge("b", json!({"c": 2}))
    /// });
    /// assert!(handle.wait().is_ok());
    /// assert_eq!(state.snapshot(), json!({"a": 1, "b": {"c": 2}}));
    /// ```
    pub fn mutate<F>(&self, mutator: F) -> MutationHandle
    where
        F: FnOnce(&mut TreeToolset<'_>) -> Result<(), StateError> + Send + 'static,
    {
        self.inner.dispatcher.submit(Box::new(mutator))
    }

    /// Blocks until every mutation submitted so far has been applied and
    /// notified. Returns at once when called from a listener.
    pub fn wait_for_mutations(&self) {
        self.inner.dispatcher.wait_drained();
    }

    /// Empties the tree immediately, bypassing the mutation queue.
    ///
    /// The wildcard receives the empty tree and every other subscribed path
    /// receives `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::ClearInsideMutator`] when called from a mutator
    /// of this state; the tree is left untouched.
    pub fn clear(&self) -> Result<(), StateError> {
        if in_mutator(self.shared()) {
            warn!("clear called from inside a mutator; refused");
            return Err(StateError::ClearInsideMutator);
        }
        let tree = {
            let mut tree = self.shared().tree.write();
            match tree.as_object_mut() {
                Some(root) => root.clear(),
                None => *tree = Value::Object(Map::new()),
            }
            tree.clone()
        };
        let bus = &self.shared().bus;
        let names = bus.event_names();
        debug!(subscribed = names.len(), "state cleared");
        for name in names {
            let payload = (name == WILDCARD).then(|| tree.clone());
            bus.emit(&StateEvent::new(name, payload));
        }
        Ok(())
    }

    /// Subscribes `listener` to changes at `path`; `"@"` observes every change.
    pub fn on<P, F>(&self, path: P, listener: F) -> SubscriptionId
    where
        P: PathLike,
        F: Fn(&StateEvent) + Send + Sync + 'static,
    {
        self.shared()
            .bus
            .subscribe(Self::resolve_path(path), Arc::new(listener))
    }

    /// Subscribes `listener` to the errors that abort mutation cycles.
    pub fn on_error<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StateError) + Send + Sync + 'static,
    {
        self.shared().bus.subscribe_errors(Arc::new(listener))
    }

    /// Removes a subscription made with [`State::on`] or [`State::on_error`].
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.shared().bus.unsubscribe(id)
    }

    pub fn event_names(&self) -> Vec<String> {
        self.shared().bus.event_names()
    }

    pub fn listener_count<P: PathLike>(&self, path: P) -> usize {
        self.shared()
            .bus
            .listener_count(&Self::resolve_path(path))
    }

    pub fn config(&self) -> &StateConfig {
        &self.shared().config
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("tree", &self.snapshot())
            .field("config", &self.shared().config)
            .finish()
    }
}
