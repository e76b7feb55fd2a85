//! Walking, reading and writing a `serde_json` tree by resolved path.

use serde_json::{Map, Value};

use crate::types::{NavigateOptions, Navigation, PathLike, Slot, Traversed};
use crate::{is_root, join, parse_index, resolve_path, NavigateError};

/// Walks `root` along `path` and returns where it ended up.
///
/// The returned node is the target's parent (or the target itself when
/// `include_last` is set); it is `None` whenever navigation failed. The
/// whole path is probed before anything is created, so a failing navigation
/// never leaves new intermediate nodes behind.
///
/// # Example
///
/// ```
/// use tree_state_path::{navigate, NavigateOptions};
/// use serde_json::json;
///
/// let mut doc = json!({"posts": {"new": [{"id": 1}]}});
/// let (nav, parent) = navigate(&mut doc, "/posts/new/0/id", NavigateOptions::check());
/// assert_eq!(parent, Some(&mut json!({"id": 1})));
/// assert_eq!(nav.target_key, "id");
/// assert_eq!(nav.traverse.len(), 3);
/// ```
pub fn navigate<'a, P: PathLike>(
    root: &'a mut Value,
    path: P,
    options: NavigateOptions,
) -> (Navigation, Option<&'a mut Value>) {
    let path = resolve_path(path);
    let segments: Vec<String> = path.split('/').map(str::to_string).collect();
    let target_is_root = is_root(&path);
    let target_key = segments.last().cloned().unwrap_or_default();
    let limit = match (target_is_root, options.include_last) {
        (true, _) => 0,
        (false, true) => segments.len(),
        (false, false) => segments.len() - 1,
    };

    let mut nav = Navigation {
        segments,
        path,
        traverse: Vec::with_capacity(limit),
        target_key,
        target_is_root,
        error: None,
    };

    if let Some(error) = probe(root, &nav.segments[..limit], options.build_to_target) {
        let reached = nav.segments[..limit]
            .iter()
            .scan(String::new(), |at, segment| {
                *at = join(at, segment);
                Some(at.clone())
            })
            .take_while(|at| at.as_str() != error.at());
        nav.traverse = reached
            .map(|path| Traversed {
                path,
                created: false,
            })
            .collect();
        nav.error = Some(error);
        return (nav, None);
    }

    let mut node = root;
    let mut at = String::new();
    for idx in 0..limit {
        let segment = nav.segments[idx].clone();
        at = join(&at, &segment);
        match descend(node, &segment) {
            Some((child, created)) => {
                nav.traverse.push(Traversed {
                    path: at.clone(),
                    created,
                });
                node = child;
            }
            None => {
                nav.error = Some(NavigateError::NotContainer { at });
                return (nav, None);
            }
        }
    }
    (nav, Some(node))
}

/// Read-only dry run of a traversal; reports the first blocking step.
fn probe(root: &Value, segments: &[String], build: bool) -> Option<NavigateError> {
    let mut node = root;
    let mut at = String::new();
    for segment in segments {
        at = join(&at, segment);
        match Slot::of(node, segment) {
            Slot::Container(child) => node = child,
            Slot::Scalar(_) => return Some(NavigateError::NotContainer { at }),
            // Everything below a freshly created mapping is absent as well.
            Slot::Absent if build => return None,
            Slot::Absent => return Some(NavigateError::Absent { at }),
            Slot::Unaddressable if build => return Some(NavigateError::BadIndex { at }),
            Slot::Unaddressable => return Some(NavigateError::Absent { at }),
        }
    }
    None
}

/// Steps into `segment`, creating an empty mapping when nothing is there.
fn descend<'v>(node: &'v mut Value, segment: &str) -> Option<(&'v mut Value, bool)> {
    let (child, created) = match node {
        Value::Object(map) => {
            let created = !map.contains_key(segment);
            let child = map
                .entry(segment)
                .or_insert_with(|| Value::Object(Map::new()));
            (child, created)
        }
        Value::Array(items) => {
            let idx = parse_index(segment)?;
            let created = idx == items.len();
            if created {
                items.push(Value::Object(Map::new()));
            }
            (items.get_mut(idx)?, created)
        }
        _ => return None,
    };
    if child.is_object() || child.is_array() {
        Some((child, created))
    } else {
        None
    }
}

/// Reads the value at `path`, or `None` when it cannot be reached.
///
/// The empty path returns `root` itself.
pub fn lookup<'a, P: PathLike>(root: &'a Value, path: P) -> Option<&'a Value> {
    lookup_strict(root, path).ok().flatten()
}

/// Like [`lookup`] but fails when an intermediate node is missing or is not
/// a container. A missing final key is still `Ok(None)`.
///
/// # Errors
///
/// Returns the [`NavigateError`] of the first step that could not be taken.
pub fn lookup_strict<'a, P: PathLike>(
    root: &'a Value,
    path: P,
) -> Result<Option<&'a Value>, NavigateError> {
    let path = resolve_path(path);
    if is_root(&path) {
        return Ok(Some(root));
    }
    let segments: Vec<&str> = path.split('/').collect();
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return Ok(Some(root)),
    };
    let mut node = root;
    let mut at = String::new();
    for segment in parents {
        at = join(&at, segment);
        match Slot::of(node, segment) {
            Slot::Container(child) => node = child,
            Slot::Scalar(_) => return Err(NavigateError::NotContainer { at }),
            Slot::Absent | Slot::Unaddressable => return Err(NavigateError::Absent { at }),
        }
    }
    Ok(read_child(node, last))
}

/// Reads `key` directly inside a container.
pub fn read_child<'a>(parent: &'a Value, key: &str) -> Option<&'a Value> {
    Slot::of(parent, key).value()
}

/// Whether [`write_child`] would accept `key` on `parent`.
pub fn can_write_child(parent: &Value, key: &str) -> bool {
    match parent {
        Value::Object(_) => true,
        Value::Array(items) => parse_index(key).is_some_and(|idx| idx <= items.len()),
        _ => false,
    }
}

/// Stores `value` under `key`, returning what was there before.
///
/// On a sequence the key must be an existing index or the index one past the
/// end, which appends.
///
/// # Errors
///
/// Returns [`NavigateError::BadIndex`] when the key cannot address a slot.
pub fn write_child(
    parent: &mut Value,
    key: &str,
    value: Value,
) -> Result<Option<Value>, NavigateError> {
    match parent {
        Value::Object(map) => Ok(map.insert(key.to_string(), value)),
        Value::Array(items) => match parse_index(key) {
            Some(idx) if idx < items.len() => Ok(Some(std::mem::replace(&mut items[idx], value))),
            Some(idx) if idx == items.len() => {
                items.push(value);
                Ok(None)
            }
            _ => Err(NavigateError::BadIndex {
                at: key.to_string(),
            }),
        },
        _ => Err(NavigateError::NotContainer {
            at: key.to_string(),
        }),
    }
}

/// Deletes `key` from a container, returning the removed value.
///
/// Mapping keys keep the order of their remaining siblings. Removing the
/// last element of a sequence pops it; any other element is replaced by a
/// `null` hole so that sibling indices stay stable.
pub fn remove_child(parent: &mut Value, key: &str) -> Option<Value> {
    match parent {
        Value::Object(map) => map.shift_remove(key),
        Value::Array(items) => {
            let idx = parse_index(key)?;
            if idx >= items.len() {
                None
            } else if idx + 1 == items.len() {
                items.pop()
            } else {
                Some(std::mem::replace(&mut items[idx], Value::Null))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_probe_stops_on_scalar() {
        let doc = json!({"a": {"b": 1}});
        let segments = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(
            probe(&doc, &segments, true),
            Some(NavigateError::NotContainer {
                at: "a/b".to_string()
            })
        );
    }

    #[test]
    fn test_probe_allows_missing_when_building() {
        let doc = json!({});
        let segments = vec!["x".to_string(), "y".to_string()];
        assert_eq!(probe(&doc, &segments, true), None);
        assert_eq!(
            probe(&doc, &segments, false),
            Some(NavigateError::Absent {
                at: "x".to_string()
            })
        );
    }

    #[test]
    fn test_descend_appends_to_sequence() {
        let mut doc = json!([]);
        let (child, created) = descend(&mut doc, "0").unwrap();
        assert!(created);
        assert_eq!(child, &json!({}));
        assert_eq!(doc, json!([{}]));
    }

    #[test]
    fn test_remove_child_leaves_hole() {
        let mut doc = json!([1, 2, 3]);
        assert_eq!(remove_child(&mut doc, "0"), Some(json!(1)));
        assert_eq!(doc, json!([null, 2, 3]));
        assert_eq!(remove_child(&mut doc, "2"), Some(json!(3)));
        assert_eq!(doc, json!([null, 2]));
        assert_eq!(remove_child(&mut doc, "5"), None);
    }

    #[test]
    fn test_remove_child_keeps_key_order() {
        let mut doc = json!({"a": 1, "b": 2, "c": 3});
        remove_child(&mut doc, "a");
        let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["b", "c"]);
    }
}
