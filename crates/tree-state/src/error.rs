use thiserror::Error;
use tree_state_path::NavigateError;

/// Failures raised by the toolset, the facade and the dispatcher.
///
/// Display strings are part of the public contract; listeners and callers
/// match on them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Root state should not be directly set")]
    RootSet,
    #[error("Invalid path to value")]
    InvalidPath,
    #[error("Invalid path to value or target is not an object that can be merged")]
    NotMergeable,
    #[error("Merge subject is not an object")]
    MergeSubject,
    #[error("Target is not an array")]
    NotAnArray,
    #[error("Can't get a value from an invalid path")]
    UnresolvablePath(#[from] NavigateError),
    #[error("Initial state must be an object")]
    InitialNotObject,
    #[error("mutator panicked: {0}")]
    MutatorPanicked(String),
    #[error("mutation dispatcher is not running")]
    DispatcherClosed,
    #[error("failed to start the mutation dispatcher: {0}")]
    Spawn(String),
    #[error("state cannot be cleared from inside a mutator")]
    ClearInsideMutator,
}

impl StateError {
    /// Whether the error comes from validating a toolset operation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::RootSet
                | Self::InvalidPath
                | Self::NotMergeable
                | Self::MergeSubject
                | Self::NotAnArray
                | Self::UnresolvablePath(_)
        )
    }
}
