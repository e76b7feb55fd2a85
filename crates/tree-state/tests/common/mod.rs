#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tree_state::{State, StateEvent, SubscriptionId};

/// The tree most scenarios start from.
pub fn fixture() -> Value {
    json!({
        "posts": {"new": [{"id": 1}, {"id": 2}]},
        "users": {"old": [{"id": 3}, {"id": 4}]}
    })
}

pub fn fixture_state() -> State {
    State::with_initial(fixture()).unwrap()
}

/// Collects every event delivered to the paths it listens on.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<StateEvent>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(&self, state: &State, path: &str) -> SubscriptionId {
        let events = Arc::clone(&self.events);
        state.on(path, move |event: &StateEvent| {
            events.lock().unwrap().push(event.clone());
        })
    }

    pub fn listen_all(&self, state: &State, paths: &[&str]) {
        for path in paths {
            self.listen(state, path);
        }
    }

    pub fn events(&self) -> Vec<StateEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.event == path)
            .count()
    }

    pub fn payloads(&self, path: &str) -> Vec<Option<Value>> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.event == path)
            .map(|event| event.payload.clone())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}
