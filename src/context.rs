//! Shared state root and per-navigation contexts.

use std::cell::RefCell;
use std::rc::Rc;

use log::warn;
use serde_json::{Map, Value};

/// The per-navigation mapping of named references into shared state that a
/// rendered route consumes. Rebuilt on every navigation, never cached.
pub type Context = Map<String, Value>;

/// Cheap-to-clone handle over the mutable application state graph.
///
/// Reactions, hooks, and callbacks may freely replace sub-trees (or the whole
/// root, e.g. on logout); context builders re-read through this handle at
/// navigation time, so they always observe the live graph.
#[derive(Clone)]
pub struct StateRoot {
    inner: Rc<RefCell<Value>>,
}

impl StateRoot {
    pub fn new(initial: Value) -> Self {
        Self {
            inner: Rc::new(RefCell::new(initial)),
        }
    }

    /// A clone of the named top-level field, or `Null` if absent.
    pub fn get(&self, field: &str) -> Value {
        self.inner
            .borrow()
            .get(field)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Set a top-level field. A non-object root is reset to an empty object
    /// first, since field access requires one.
    pub fn set(&self, field: &str, value: Value) {
        let mut root = self.inner.borrow_mut();
        if !root.is_object() {
            warn!("state root is not an object; resetting before setting '{field}'");
            *root = Value::Object(Map::new());
        }
        if let Some(map) = root.as_object_mut() {
            map.insert(field.to_string(), value);
        }
    }

    /// Read through the live root without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Mutate the live root in place.
    pub fn update(&self, f: impl FnOnce(&mut Value)) {
        f(&mut self.inner.borrow_mut());
    }

    /// Swap the entire root out, returning the previous value. This is the
    /// logout/clear case: every handle observes the new graph immediately.
    pub fn replace(&self, value: Value) -> Value {
        std::mem::replace(&mut self.inner.borrow_mut(), value)
    }

    /// Deep clone of the current root.
    pub fn snapshot(&self) -> Value {
        self.inner.borrow().clone()
    }
}

impl Default for StateRoot {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}
