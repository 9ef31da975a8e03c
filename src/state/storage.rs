use std::collections::HashMap;
use std::sync::RwLock;

/// Thread-safe in-memory key/value store. Values are opaque byte blobs;
/// higher layers decide the encoding. No expiry, no persistence.
#[derive(Debug, Default)]
pub struct Storage {
    map: RwLock<HashMap<String, Vec<u8>>>,
}

impl Storage {
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    /// Store a value under `key`, overwriting any previous value.
    pub fn set(&self, key: &str, value: Vec<u8>) {
        let mut map = self.map.write().expect("storage lock poisoned");
        map.insert(key.to_string(), value);
    }

    /// Fetch the value for `key`. `None` means absent; an empty blob is a
    /// legitimate stored value and is returned as `Some`.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let map = self.map.read().expect("storage lock poisoned");
        map.get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        let map = self.map.read().expect("storage lock poisoned");
        map.contains_key(key)
    }

    /// Snapshot of all keys, safe to iterate while writers proceed.
    pub fn keys(&self) -> Vec<String> {
        let map = self.map.read().expect("storage lock poisoned");
        map.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let map = self.map.read().expect("storage lock poisoned");
        map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::Storage;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn set_get_roundtrip_and_overwrite() {
        let store = Storage::new();
        assert!(store.get("a").is_none());

        store.set("a", b"one".to_vec());
        assert_eq!(store.get("a"), Some(b"one".to_vec()));

        store.set("a", b"two".to_vec());
        assert_eq!(store.get("a"), Some(b"two".to_vec()));
    }

    #[test]
    fn empty_value_is_not_absent() {
        let store = Storage::new();
        store.set("empty", Vec::new());
        assert!(store.has("empty"));
        assert_eq!(store.get("empty"), Some(Vec::new()));
    }

    #[test]
    fn keys_returns_snapshot() {
        let store = Storage::new();
        store.set("x", vec![1]);
        store.set("y", vec![2]);

        let mut keys = store.keys();
        keys.sort();
        assert_eq!(keys, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn concurrent_disjoint_writers_lose_nothing() {
        let store = Arc::new(Storage::new());
        let mut handles = Vec::new();

        for t in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    store.set(&format!("k-{t}-{i}"), vec![t as u8, i as u8]);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len(), 800);
        for t in 0..8 {
            for i in 0..100 {
                assert_eq!(
                    store.get(&format!("k-{t}-{i}")),
                    Some(vec![t as u8, i as u8])
                );
            }
        }
    }

    #[test]
    fn same_key_writers_leave_one_intact_value() {
        let store = Arc::new(Storage::new());
        let mut handles = Vec::new();

        for t in 0u8..4 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..200 {
                    store.set("contended", vec![t; 32]);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        // Last writer wins; whatever survives must be one writer's blob,
        // never interleaved bytes.
        let value = store.get("contended").expect("key must exist");
        assert_eq!(value.len(), 32);
        assert!(value.iter().all(|b| *b == value[0]));
    }
}
