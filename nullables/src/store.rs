//! Nullable store — thread-safe in-memory key/value storage for testing.

use attest_store::{prefix_end, KvStore, StoreError};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Mutex;

pub struct NullKvStore {
    entries: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl NullKvStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NullKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for NullKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let upper = match prefix_end(prefix) {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        Ok(self
            .entries
            .lock()
            .unwrap()
            .range((Bound::Included(prefix.to_vec()), upper))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
