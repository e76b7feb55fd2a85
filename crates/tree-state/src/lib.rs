//! Path-addressable state tree with serialized mutations and path-scoped
//! change notifications.
//!
//! A [`State`] owns one `serde_json` mapping. Readers address it with
//! slash-delimited paths; writers queue mutations that run one at a time on a
//! dispatcher thread; observers subscribe to paths and are told, after each
//! mutation, about every subscribed path whose value may have changed:
//! the mutated path itself, its ancestors and its descendants.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use std::sync::{Arc, Mutex};
//! use tree_state::{State, StateEvent};
//!
//! let state = State::with_initial(json!({"posts": {}})).unwrap();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let seen_clone = Arc::clone(&seen);
//! state.on("posts", move |event: &StateEvent| {
//!     seen_clone.lock().unwrap().push(event.payload.clone());
//! });
//!
//! state.set("posts/new/0/id", json!(1));
//! state.wait_for_mutations();
//!
//! assert_eq!(
//!     *seen.lock().unwrap(),
//!     vec![Some(json!({"new": {"0": {"id": 1}}}))]
//! );
//! ```

pub mod config;
pub mod dispatcher;
pub mod emitter;
pub mod error;
pub mod events;
pub mod fanout;
pub mod logging;
pub mod state;
pub mod toolset;

pub use config::{ConfigError, StateConfig};
pub use dispatcher::MutationHandle;
pub use emitter::{ErrorListener, EventBus, EventEmitter, Listener};
pub use error::StateError;
pub use events::{StateEvent, SubscriptionId, WILDCARD};
pub use state::State;
pub use toolset::{Toolset, TreeToolset};
pub use tree_state_path::{resolve_path, NavigateError, PathLike};
