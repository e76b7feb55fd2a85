//! Slash-delimited path utilities for `serde_json` state trees.
//!
//! Paths are plain strings such as `"posts/new/0/id"` (or lists of segments
//! such as `["posts", "new"]`). Resolution collapses repeated slashes and
//! strips boundary slashes but never touches whitespace, so `" a "` and
//! `"a"` are different segments.
//!
//! # Example
//!
//! ```
//! use tree_state_path::{navigate, resolve_path, segments, NavigateOptions};
//! use serde_json::json;
//!
//! assert_eq!(resolve_path("//posts///new/"), "posts/new");
//! assert_eq!(resolve_path(["posts", "new"]), "posts/new");
//! assert_eq!(segments("posts/new"), vec!["posts", "new"]);
//!
//! let mut doc = json!({});
//! let (nav, parent) = navigate(&mut doc, "x/y/z", NavigateOptions::build());
//! assert!(nav.error.is_none());
//! assert!(parent.is_some());
//! assert_eq!(doc, json!({"x": {"y": {}}}));
//! ```

use thiserror::Error;

pub mod navigate;
pub mod types;

pub use navigate::{
    can_write_child, lookup, lookup_strict, navigate, read_child, remove_child, write_child,
};
pub use types::{NavigateOptions, Navigation, PathLike, Slot, Traversed};

/// Path separator.
pub const SEPARATOR: char = '/';

/// Normalizes a path into its canonical slash-delimited form.
///
/// Lists are joined with `/` first. Any run of slashes collapses into one and
/// exactly one leading and one trailing slash are dropped. The empty string
/// denotes the tree root.
///
/// # Example
///
/// ```
/// use tree_state_path::resolve_path;
///
/// assert_eq!(resolve_path("/cosas//////////"), "cosas");
/// assert_eq!(resolve_path("  /////cosas//////////   "), "  /cosas/   ");
/// assert_eq!(resolve_path(vec!["cosas".to_string(), "mas cosas".to_string()]), "cosas/mas cosas");
/// assert_eq!(resolve_path("/"), "");
/// ```
pub fn resolve_path<P: PathLike>(path: P) -> String {
    let joined = path.joined();
    let mut out = String::with_capacity(joined.len());
    // The virtual leading boundary slash counts as already emitted.
    let mut after_slash = true;
    for ch in joined.chars() {
        if ch == SEPARATOR {
            if !after_slash {
                out.push(SEPARATOR);
            }
            after_slash = true;
        } else {
            out.push(ch);
            after_slash = false;
        }
    }
    if out.ends_with(SEPARATOR) {
        out.pop();
    }
    out
}

/// Splits a path into its resolved segments.
///
/// The root path yields a single empty segment.
pub fn segments<P: PathLike>(path: P) -> Vec<String> {
    resolve_path(path)
        .split(SEPARATOR)
        .map(str::to_string)
        .collect()
}

/// Check if a resolved path denotes the tree root.
pub fn is_root(path: &str) -> bool {
    path.is_empty()
}

/// Joins a resolved parent path and a child key.
///
/// # Example
///
/// ```
/// use tree_state_path::join;
///
/// assert_eq!(join("", "a"), "a");
/// assert_eq!(join("a/b", "c"), "a/b/c");
/// ```
pub fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        return key.to_string();
    }
    let mut out = String::with_capacity(parent.len() + key.len() + 1);
    out.push_str(parent);
    out.push(SEPARATOR);
    out.push_str(key);
    out
}

/// Check if `child` lies strictly below `parent`.
///
/// Matching respects segment boundaries: `a/b` contains `a/b/c` but not
/// `a/bc`. Every non-root path lies below the root.
///
/// # Example
///
/// ```
/// use tree_state_path::is_descendant;
///
/// assert!(is_descendant("a/b", "a/b/c"));
/// assert!(!is_descendant("a/b", "a/bc"));
/// assert!(!is_descendant("a/b", "a/b"));
/// ```
pub fn is_descendant(parent: &str, child: &str) -> bool {
    if parent.is_empty() {
        return !child.is_empty();
    }
    child.len() > parent.len()
        && child.starts_with(parent)
        && child[parent.len()..].starts_with(SEPARATOR)
}

/// Parses a segment as a sequence index.
///
/// Leading zeros are rejected so `"01"` never aliases `"1"`.
pub fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() {
        return None;
    }
    let bytes = segment.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    if !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    segment.parse().ok()
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NavigateError {
    #[error("nothing to traverse at `{at}`")]
    Absent { at: String },
    #[error("cannot traverse through a non-container value at `{at}`")]
    NotContainer { at: String },
    #[error("`{at}` does not address a sequence slot")]
    BadIndex { at: String },
}

impl NavigateError {
    /// The path at which traversal stopped.
    pub fn at(&self) -> &str {
        match self {
            Self::Absent { at } | Self::NotContainer { at } | Self::BadIndex { at } => at,
        }
    }
}
