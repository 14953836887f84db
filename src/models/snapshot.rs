// Shared form snapshot
//
// The presentation layer owns the contents; the core only reads it at flush/save/trigger time
// and writes exactly one field (the generation result). Every write bumps `revision`, which is
// how the persistence layer tells "dirty" from "already saved".

use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
struct Versioned {
    value: Value,
    revision: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotHandle {
    inner: Arc<RwLock<Versioned>>,
}

impl SnapshotHandle {
    pub fn new(value: Value) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Versioned { value, revision: 0 })),
        }
    }

    /// Clone of the latest value together with its revision.
    pub fn read(&self) -> (Value, u64) {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        (guard.value.clone(), guard.revision)
    }

    pub fn revision(&self) -> u64 {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).revision
    }

    /// Borrow the latest value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f(&guard.value)
    }

    /// Apply an edit and return the new revision.
    pub fn update(&self, f: impl FnOnce(&mut Value)) -> u64 {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard.value);
        guard.revision += 1;
        guard.revision
    }

    /// Set a top-level field, turning a non-object snapshot into an object first.
    pub fn set_field(&self, key: &str, value: Value) -> u64 {
        self.update(|root| {
            if !root.is_object() {
                *root = Value::Object(Map::new());
            }
            if let Value::Object(map) = root {
                map.insert(key.to_string(), value);
            }
        })
    }

    pub fn field(&self, key: &str) -> Option<Value> {
        self.with(|root| root.get(key).cloned())
    }
}
