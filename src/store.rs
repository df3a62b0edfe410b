use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory key-value store
///
/// Writers (`set`, `delete`, `clear`) take the lock exclusively, readers
/// (`get`, `len`, `keys`) share it. The map itself is never handed out.
#[derive(Debug)]
pub struct Store {
    data: RwLock<HashMap<String, i64>>,
}

impl Store {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    // Every critical section leaves the map consistent, so a guard poisoned by
    // a panicking holder is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, i64>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, i64>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set a key to the given value, overwriting any previous value
    pub fn set(&self, key: impl Into<String>, value: i64) {
        let key = key.into();
        self.write().insert(key, value);
    }

    /// Get the value for a key, `None` if the key is absent
    pub fn get(&self, key: &str) -> Option<i64> {
        self.read().get(key).copied()
    }

    /// Remove a key. Returns whether the key was present.
    pub fn delete(&self, key: &str) -> bool {
        self.write().remove(key).is_some()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of all present keys, in no particular order
    pub fn keys(&self) -> Vec<String> {
        let data = self.read();
        let mut keys = Vec::with_capacity(data.len());
        keys.extend(data.keys().cloned());
        keys
    }

    /// Drop every entry at once
    pub fn clear(&self) {
        let old = std::mem::take(&mut *self.write());
        // old entries are freed outside the lock
        drop(old);
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_set_and_get() {
        let store = Store::new();
        store.set("key1", 42);
        assert_eq!(store.get("key1"), Some(42));
    }

    #[test]
    fn test_get_missing_is_distinct_from_zero() {
        let store = Store::new();
        assert_eq!(store.get("zero"), None);

        store.set("zero", 0);
        assert_eq!(store.get("zero"), Some(0));
    }

    #[test]
    fn test_set_overwrites() {
        let store = Store::new();
        store.set("key", 1);
        store.set("key", 2);
        assert_eq!(store.get("key"), Some(2));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_existing() {
        let store = Store::new();
        store.set("key", 7);
        assert!(store.delete("key"));
        assert_eq!(store.get("key"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let store = Store::new();
        store.set("a", 1);
        store.set("b", 2);

        assert!(!store.delete("nonexistent"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a"), Some(1));
        assert_eq!(store.get("b"), Some(2));
    }

    #[test]
    fn test_keys_snapshot() {
        let store = Store::new();
        for i in 0..5 {
            store.set(format!("key{}", i), i);
        }

        let mut keys = store.keys();
        keys.sort();
        assert_eq!(keys, vec!["key0", "key1", "key2", "key3", "key4"]);

        // later writes do not leak into an earlier snapshot
        store.set("key5", 5);
        assert_eq!(keys.len(), 5);
        assert_eq!(store.keys().len(), 6);
    }

    #[test]
    fn test_clear_resets() {
        let store = Store::new();
        for i in 0..100 {
            store.set(format!("key{}", i), i);
        }

        store.clear();
        assert_eq!(store.len(), 0);
        assert!(store.keys().is_empty());

        // still usable afterwards
        store.set("again", 1);
        assert_eq!(store.get("again"), Some(1));
    }

    #[test]
    fn test_clear_empty_store() {
        let store = Store::default();
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_sets_same_key_last_writer_wins() {
        const WRITERS: i64 = 16;
        let store = Arc::new(Store::new());
        let barrier = Arc::new(Barrier::new(WRITERS as usize));

        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.set("contended", i * 1_000_003);
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let value = store.get("contended").unwrap();
        assert!((0..WRITERS).any(|i| i * 1_000_003 == value));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_set_and_delete_same_key() {
        const THREADS: i64 = 12;

        for _ in 0..50 {
            let store = Arc::new(Store::new());
            let barrier = Arc::new(Barrier::new(THREADS as usize));

            let handles: Vec<_> = (0..THREADS)
                .map(|i| {
                    let store = Arc::clone(&store);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        if i % 2 == 0 {
                            store.set("shared", i * 7_919);
                        } else {
                            store.delete("shared");
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }

            match store.get("shared") {
                Some(value) => {
                    assert!((0..THREADS).step_by(2).any(|i| i * 7_919 == value));
                    assert_eq!(store.len(), 1);
                    assert_eq!(store.keys(), vec!["shared"]);
                }
                None => {
                    assert_eq!(store.len(), 0);
                    assert!(store.keys().is_empty());
                }
            }
        }
    }

    #[test]
    fn test_keys_never_lists_unfinished_writes() {
        let store = Arc::new(Store::new());
        let barrier = Arc::new(Barrier::new(2));

        let writer = {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..1000 {
                    store.set(format!("key{}", i), i);
                }
            })
        };

        barrier.wait();
        let mut last = 0;
        for _ in 0..200 {
            let keys = store.keys();
            // every listed key is readable and snapshots only grow
            for key in &keys {
                assert!(store.get(key).is_some());
            }
            let unique: HashSet<_> = keys.iter().collect();
            assert_eq!(unique.len(), keys.len());
            assert!(keys.len() >= last);
            last = keys.len();
        }

        writer.join().unwrap();
        assert_eq!(store.len(), 1000);
    }

    #[test]
    fn test_concurrent_mixed_operations() {
        let store = Arc::new(Store::new());
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..500 {
                        let key = format!("t{}-{}", t, i);
                        store.set(key.clone(), i);
                        assert_eq!(store.get(&key), Some(i));
                        if i % 2 == 0 {
                            assert!(store.delete(&key));
                        }
                        let _ = store.len();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len(), threads * 250);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let store = Arc::new(Store::new());
        store.set("before", 1);

        let poisoner = Arc::clone(&store);
        let result = thread::spawn(move || {
            let _guard = poisoner.data.write().unwrap();
            panic!("panic while holding the write lock");
        })
        .join();
        assert!(result.is_err());
        assert!(store.data.is_poisoned());

        assert_eq!(store.get("before"), Some(1));
        store.set("after", 2);
        assert_eq!(store.len(), 2);
    }
}
