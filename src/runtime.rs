//! `Registry<T>`: one in-memory `Arc<Mutex<T>>` per deterministic key, cached
//! for the process's lifetime. This is what gives every coordinator "one
//! active instance per key" (§2) and, because every operation on a
//! coordinator must lock that one `Mutex` before touching its state, it is
//! also what gives single-writer serialization (§5): two concurrent callers
//! racing to append to the same room block on each other in the order they
//! acquire the lock, the same as they would queueing on a single-instance
//! actor.
//!
//! Modeled directly on the teacher's `PresenceTracker`/`TypingTracker`
//! (`Arc<RwLock<HashMap<...>>>` / `Mutex<HashMap<...>>` get-or-insert), just
//! made generic and keyed by coordinator key instead of room id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct Registry<T> {
    instances: Mutex<HashMap<String, Arc<Mutex<T>>>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the coordinator for `key`, constructing it with `init` the
    /// first time `key` is seen. Holding the registry's own lock only long
    /// enough to get-or-insert keeps lookups for *different* keys from
    /// blocking on each other.
    pub fn get_or_init<F>(&self, key: &str, init: F) -> Arc<Mutex<T>>
    where
        F: FnOnce() -> T,
    {
        let mut instances = self.instances.lock().unwrap_or_else(|e| e.into_inner());
        instances
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(init())))
            .clone()
    }

    /// Look up an existing coordinator without creating one.
    pub fn get(&self, key: &str) -> Option<Arc<Mutex<T>>> {
        let instances = self.instances.lock().unwrap_or_else(|e| e.into_inner());
        instances.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.instances.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_init_returns_same_instance_for_same_key() {
        let registry: Registry<i32> = Registry::new();
        let a = registry.get_or_init("k", || 1);
        let b = registry.get_or_init("k", || 2);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*a.lock().unwrap(), 1);
    }

    #[test]
    fn different_keys_get_different_instances() {
        let registry: Registry<i32> = Registry::new();
        let a = registry.get_or_init("a", || 1);
        let b = registry.get_or_init("b", || 2);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn get_returns_none_before_init() {
        let registry: Registry<i32> = Registry::new();
        assert!(registry.get("missing").is_none());
    }
}
