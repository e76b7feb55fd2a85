//! Type definitions for path navigation.

use serde_json::Value;
use std::borrow::Cow;

use crate::{parse_index, NavigateError};

/// Anything that can be turned into a slash-delimited path.
///
/// Strings are taken verbatim; lists of segments are joined with `/`.
pub trait PathLike {
    fn joined(&self) -> Cow<'_, str>;
}

impl PathLike for str {
    fn joined(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl PathLike for String {
    fn joined(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl<T: PathLike + ?Sized> PathLike for &T {
    fn joined(&self) -> Cow<'_, str> {
        (**self).joined()
    }
}

impl<S: AsRef<str>> PathLike for [S] {
    fn joined(&self) -> Cow<'_, str> {
        let parts: Vec<&str> = self.iter().map(AsRef::as_ref).collect();
        Cow::Owned(parts.join("/"))
    }
}

impl<S: AsRef<str>> PathLike for Vec<S> {
    fn joined(&self) -> Cow<'_, str> {
        self.as_slice().joined()
    }
}

impl<S: AsRef<str>, const N: usize> PathLike for [S; N] {
    fn joined(&self) -> Cow<'_, str> {
        self.as_slice().joined()
    }
}

/// How [`navigate`](crate::navigate) treats missing nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Create empty mappings for missing intermediate nodes.
    pub build_to_target: bool,
    /// Also descend into the last segment instead of stopping at its parent.
    pub include_last: bool,
}

impl NavigateOptions {
    /// Read-only traversal down to the target's parent.
    pub fn check() -> Self {
        Self::default()
    }

    /// Traversal down to the target's parent, creating what is missing.
    pub fn build() -> Self {
        Self {
            build_to_target: true,
            include_last: false,
        }
    }

    /// Traversal into the target itself, creating what is missing.
    pub fn build_through() -> Self {
        Self {
            build_to_target: true,
            include_last: true,
        }
    }
}

/// One step taken while walking the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traversed {
    /// Resolved path of the node reached by this step.
    pub path: String,
    /// Whether the node was created by this traversal.
    pub created: bool,
}

/// The outcome of walking a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub segments: Vec<String>,
    /// Canonical form of the walked path.
    pub path: String,
    /// Every node passed through, outermost first.
    pub traverse: Vec<Traversed>,
    /// The final segment, left unconsumed unless `include_last` was set.
    pub target_key: String,
    pub target_is_root: bool,
    pub error: Option<NavigateError>,
}

impl Navigation {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Whether any node on the way was freshly created.
    pub fn created_any(&self) -> bool {
        self.traverse.iter().any(|step| step.created)
    }
}

/// What a key holds inside a container, resolved for a single step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot<'v> {
    /// A mapping or a sequence that can be descended into.
    Container(&'v Value),
    /// A present value that cannot be traversed, `null` included.
    Scalar(&'v Value),
    /// Nothing there yet; a node may be created at this key.
    Absent,
    /// The key can never hold a node here, e.g. a word used as a sequence
    /// index, an index past the end of a sequence, or any key on a scalar.
    Unaddressable,
}

impl<'v> Slot<'v> {
    pub fn of(node: &'v Value, key: &str) -> Self {
        match node {
            Value::Object(map) => match map.get(key) {
                Some(child) => Self::classify(child),
                None => Self::Absent,
            },
            Value::Array(items) => match parse_index(key) {
                Some(idx) if idx < items.len() => Self::classify(&items[idx]),
                Some(idx) if idx == items.len() => Self::Absent,
                _ => Self::Unaddressable,
            },
            _ => Self::Unaddressable,
        }
    }

    fn classify(child: &'v Value) -> Self {
        match child {
            Value::Object(_) | Value::Array(_) => Self::Container(child),
            _ => Self::Scalar(child),
        }
    }

    pub fn value(&self) -> Option<&'v Value> {
        match self {
            Self::Container(value) | Self::Scalar(value) => Some(value),
            Self::Absent | Self::Unaddressable => None,
        }
    }
}
