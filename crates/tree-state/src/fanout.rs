//! Pending emissions recorded during a mutation cycle, and the fanout that
//! turns them into events once the cycle is over.
//!
//! The toolset only records *what* must be told: exact paths and descendant
//! scopes, each with either a live payload (read from the tree when the cycle
//! flushes) or a fixed one. Matching against subscriptions happens at flush
//! time, so the subscriber set in effect is the one that exists when the
//! cycle ends.

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use tree_state_path::{is_descendant, lookup};

use crate::events::{StateEvent, WILDCARD};

#[derive(Debug, Clone, PartialEq)]
enum Payload {
    /// Whatever the tree holds at the path when the cycle flushes.
    Live,
    Fixed(Option<Value>),
}

#[derive(Debug, Clone, PartialEq)]
enum Mark {
    Path { path: String, payload: Payload },
    Descendants { of: String, payload: Payload },
}

/// Emissions accumulated by one mutation cycle.
#[derive(Debug, Default)]
pub struct PendingEmissions {
    marks: Vec<Mark>,
}

impl PendingEmissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn wildcard(&mut self) {
        self.live(WILDCARD);
    }

    pub fn live(&mut self, path: impl Into<String>) {
        self.marks.push(Mark::Path {
            path: path.into(),
            payload: Payload::Live,
        });
    }

    pub fn fixed(&mut self, path: impl Into<String>, payload: Option<Value>) {
        self.marks.push(Mark::Path {
            path: path.into(),
            payload: Payload::Fixed(payload),
        });
    }

    /// Every subscribed path strictly below `of`, re-read at flush.
    pub fn descendants_live(&mut self, of: impl Into<String>) {
        self.marks.push(Mark::Descendants {
            of: of.into(),
            payload: Payload::Live,
        });
    }

    /// Every subscribed path strictly below `of`, told it is gone.
    pub fn descendants_vanished(&mut self, of: impl Into<String>) {
        self.marks.push(Mark::Descendants {
            of: of.into(),
            payload: Payload::Fixed(None),
        });
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }
}

/// Resolves pending marks into the events to emit.
///
/// Only names in `subscribed` produce events. When several marks cover the
/// same name the last one decides its payload, while the name keeps the
/// position of its first mark. Live payloads are read from `tree`; the
/// wildcard carries the whole tree.
pub fn fanout(pending: &PendingEmissions, subscribed: &[String], tree: &Value) -> Vec<StateEvent> {
    let subscribed: IndexSet<&str> = subscribed.iter().map(String::as_str).collect();
    let mut resolved: IndexMap<&str, &Payload> = IndexMap::new();

    for mark in &pending.marks {
        match mark {
            Mark::Path { path, payload } => {
                if let Some(name) = subscribed.get(path.as_str()) {
                    resolved.insert(*name, payload);
                }
            }
            Mark::Descendants { of, payload } => {
                for name in subscribed
                    .iter()
                    .filter(|name| **name != WILDCARD && is_descendant(of, name))
                {
                    resolved.insert(*name, payload);
                }
            }
        }
    }

    resolved
        .into_iter()
        .map(|(name, payload)| {
            let payload = match payload {
                Payload::Fixed(value) => value.clone(),
                Payload::Live if name == WILDCARD => Some(tree.clone()),
                Payload::Live => lookup(tree, name).cloned(),
            };
            StateEvent::new(name, payload)
        })
        .collect()
}
