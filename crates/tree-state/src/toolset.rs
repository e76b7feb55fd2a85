//! The five mutation operations applied inside a mutation cycle.

use serde_json::Value;
use std::cell::RefCell;
use tree_state_path::{
    can_write_child, is_root, join, lookup, navigate, read_child, remove_child, resolve_path,
    write_child, NavigateOptions, Navigation, PathLike,
};

use crate::error::StateError;
use crate::fanout::PendingEmissions;

/// Operations a mutator may apply to the tree.
///
/// Every operation validates before it assigns: an `Err` means the tree was
/// left as it was, apart from effects of earlier operations in the same
/// mutator.
pub trait Toolset {
    /// Assigns `value` at `path`, creating missing intermediate mappings.
    ///
    /// Assigning a value equal to the current one is a no-op.
    fn set<P: PathLike>(&mut self, path: P, value: Value) -> Result<(), StateError>;

    /// Deletes the value at `path`. Deleting nothing succeeds silently.
    ///
    /// Inside a sequence only the last element is dropped; any other element
    /// is replaced by `null`, which is also what `path` reports afterwards.
    fn remove<P: PathLike>(&mut self, path: P) -> Result<(), StateError>;

    /// Shallow-merges the keys of `subject` into the mapping at `path`,
    /// creating it when missing.
    ///
    /// Only mappings are merge targets. An existing sequence at `path` is
    /// rejected with [`StateError::NotMergeable`] rather than having the
    /// subject's keys assigned onto it.
    fn merge<P: PathLike>(&mut self, path: P, subject: Value) -> Result<(), StateError>;

    /// Appends `value` to the sequence at `path`.
    ///
    /// A sequence argument is spliced in element by element. When nothing
    /// (or a falsy scalar) is there yet, `value` is stored as it is.
    fn concat<P: PathLike>(&mut self, path: P, value: Value) -> Result<(), StateError>;

    /// Replaces the value at `path` with `transformer(current)`.
    fn update<P, F>(&mut self, path: P, transformer: F) -> Result<(), StateError>
    where
        P: PathLike,
        F: FnOnce(Option<Value>) -> Value;
}

/// [`Toolset`] over a borrowed tree, recording emissions as it goes.
///
/// The tree is only borrowed for the duration of each operation, so code
/// running between operations (an update transformer included) may read it
/// through the facade.
pub struct TreeToolset<'t> {
    tree: &'t RefCell<Value>,
    pending: &'t mut PendingEmissions,
}

impl<'t> TreeToolset<'t> {
    pub fn new(tree: &'t RefCell<Value>, pending: &'t mut PendingEmissions) -> Self {
        Self { tree, pending }
    }

    /// Reads the tree as it stands mid-cycle.
    pub fn get<P: PathLike>(&self, path: P) -> Option<Value> {
        lookup(&self.tree.borrow(), path).cloned()
    }
}

impl Toolset for TreeToolset<'_> {
    fn set<P: PathLike>(&mut self, path: P, value: Value) -> Result<(), StateError> {
        let path = resolve_path(path);
        if is_root(&path) {
            return Err(StateError::RootSet);
        }
        let mut tree = self.tree.borrow_mut();
        let (nav, parent) = navigate(&mut tree, path, NavigateOptions::build());
        let parent = writable_parent(&nav, parent)?;
        if read_child(parent, &nav.target_key) == Some(&value) {
            return Ok(());
        }
        write_child(parent, &nav.target_key, value).map_err(|_| StateError::InvalidPath)?;
        mark_assigned(self.pending, &nav);
        Ok(())
    }

    fn remove<P: PathLike>(&mut self, path: P) -> Result<(), StateError> {
        let path = resolve_path(path);
        if is_root(&path) {
            return Err(StateError::InvalidPath);
        }
        let mut tree = self.tree.borrow_mut();
        let (nav, parent) = navigate(&mut tree, path, NavigateOptions::check());
        let Some(parent) = parent else {
            return Ok(());
        };
        if remove_child(parent, &nav.target_key).is_none() {
            return Ok(());
        }
        self.pending.wildcard();
        // A sequence hole still reads as null.
        if read_child(parent, &nav.target_key).is_some() {
            self.pending.live(nav.path.as_str());
        } else {
            self.pending.fixed(nav.path.as_str(), None);
        }
        mark_ancestors(self.pending, &nav);
        self.pending.descendants_vanished(nav.path.as_str());
        Ok(())
    }

    fn merge<P: PathLike>(&mut self, path: P, subject: Value) -> Result<(), StateError> {
        let Value::Object(subject) = subject else {
            return Err(StateError::MergeSubject);
        };
        let path = resolve_path(path);
        let mut tree = self.tree.borrow_mut();

        if is_root(&path) {
            let root = tree.as_object_mut().ok_or(StateError::NotMergeable)?;
            let mut changed = false;
            for (key, value) in subject {
                if root.get(&key) == Some(&value) {
                    continue;
                }
                self.pending.live(key.as_str());
                self.pending.descendants_live(key.as_str());
                root.insert(key, value);
                changed = true;
            }
            if changed {
                self.pending.wildcard();
            }
            return Ok(());
        }

        let (nav, target) = navigate(&mut tree, path, NavigateOptions::build_through());
        let target = target
            .filter(|_| nav.is_ok())
            .and_then(Value::as_object_mut)
            .ok_or(StateError::NotMergeable)?;

        let mut changed = false;
        for (key, value) in subject {
            if target.get(&key) == Some(&value) {
                continue;
            }
            let at = join(&nav.path, &key);
            self.pending.live(at.as_str());
            self.pending.descendants_live(at);
            target.insert(key, value);
            changed = true;
        }
        // The traverse list ends with the target itself.
        if changed || nav.created_any() {
            self.pending.wildcard();
            mark_ancestors(self.pending, &nav);
        }
        Ok(())
    }

    fn concat<P: PathLike>(&mut self, path: P, value: Value) -> Result<(), StateError> {
        let path = resolve_path(path);
        if is_root(&path) {
            return Err(StateError::InvalidPath);
        }
        let mut tree = self.tree.borrow_mut();
        let (nav, parent) = navigate(&mut tree, path, NavigateOptions::build());
        let parent = writable_parent(&nav, parent)?;
        let next = match read_child(parent, &nav.target_key) {
            None => value,
            Some(current) if is_falsy(current) => value,
            Some(Value::Array(items)) => {
                let mut items = items.clone();
                match value {
                    Value::Array(more) => items.extend(more),
                    other => items.push(other),
                }
                Value::Array(items)
            }
            Some(_) => return Err(StateError::NotAnArray),
        };
        write_child(parent, &nav.target_key, next).map_err(|_| StateError::InvalidPath)?;
        mark_assigned(self.pending, &nav);
        Ok(())
    }

    fn update<P, F>(&mut self, path: P, transformer: F) -> Result<(), StateError>
    where
        P: PathLike,
        F: FnOnce(Option<Value>) -> Value,
    {
        let path = resolve_path(path);
        if is_root(&path) {
            return Err(StateError::InvalidPath);
        }
        let mut tree = self.tree.borrow_mut();
        let (nav, parent) = navigate(&mut tree, path.as_str(), NavigateOptions::check());
        let current = read_child(writable_parent(&nav, parent)?, &nav.target_key).cloned();
        drop(tree);
        // The transformer runs with the tree released.
        let next = transformer(current);
        let mut tree = self.tree.borrow_mut();
        let (nav, parent) = navigate(&mut tree, path, NavigateOptions::check());
        let parent = writable_parent(&nav, parent)?;
        write_child(parent, &nav.target_key, next).map_err(|_| StateError::InvalidPath)?;
        mark_assigned(self.pending, &nav);
        Ok(())
    }
}

/// The parent to write into, provided navigation succeeded and it accepts
/// the target key.
fn writable_parent<'v>(
    nav: &Navigation,
    parent: Option<&'v mut Value>,
) -> Result<&'v mut Value, StateError> {
    parent
        .filter(|parent| nav.is_ok() && can_write_child(parent, &nav.target_key))
        .ok_or(StateError::InvalidPath)
}

fn mark_assigned(pending: &mut PendingEmissions, nav: &Navigation) {
    pending.wildcard();
    pending.live(nav.path.as_str());
    mark_ancestors(pending, nav);
    pending.descendants_live(nav.path.as_str());
}

fn mark_ancestors(pending: &mut PendingEmissions, nav: &Navigation) {
    for step in &nav.traverse {
        pending.live(step.path.as_str());
    }
}

/// `null`, `false`, zero and the empty string.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
