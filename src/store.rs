//! Shared auxiliary store for values held by stages.
//!
//! Each pipeline owns one [`HeldStore`]. A stage marked to hold its result
//! writes it here under a key; a later stage of the same flow can reference
//! that key to receive the value as an extra argument.
//!
//! The map is behind a lock only so that it can be shared with worker
//! threads. Nothing orders one flow's hold against another flow's read,
//! which is why parallel pipelines reject referencing stages at lock time.

use crate::error::{Error, Result};
use crate::stage::Carry;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Key to value map of held stage results.
pub struct HeldStore<T> {
    values: RwLock<HashMap<String, Carry<T>>>,
}

impl<T> HeldStore<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn hold(&self, key: impl Into<String>, value: impl Into<Carry<T>>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Whether a value is held under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Number of held values.
    pub fn len(&self) -> usize {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys currently held, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Drop every held value.
    pub fn clear(&self) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<T: Clone> HeldStore<T> {
    /// Get a copy of the value held under `key`.
    ///
    /// Fails with [`Error::MissingHeld`] when nothing is held there.
    pub fn retrieve(&self, key: &str) -> Result<Carry<T>> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| Error::MissingHeld(key.to_string()))
    }

    /// Copy of the whole map.
    pub fn snapshot(&self) -> HashMap<String, Carry<T>> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<T> Default for HeldStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for HeldStore<T> {
    fn clone(&self) -> Self {
        Self {
            values: RwLock::new(self.snapshot()),
        }
    }
}

impl<T> std::fmt::Debug for HeldStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys = self.keys();
        keys.sort();
        f.debug_struct("HeldStore").field("keys", &keys).finish()
    }
}
