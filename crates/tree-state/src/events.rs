use serde_json::Value;
use std::fmt;

/// Subscription name matching every change to the tree.
pub const WILDCARD: &str = "@";

/// What a listener receives for one changed path.
#[derive(Debug, Clone, PartialEq)]
pub struct StateEvent {
    /// The subscribed path that triggered this emission.
    pub event: String,
    /// Current value at that path, `None` when nothing is there.
    pub payload: Option<Value>,
}

impl StateEvent {
    pub fn new(event: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.event == WILDCARD
    }
}

/// Handle returned by subscriptions; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}
