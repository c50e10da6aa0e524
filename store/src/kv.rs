//! Key/value store trait with ordered prefix iteration.

use crate::StoreError;

/// Byte-keyed store provided by the host chain.
///
/// Keys are compared lexicographically; `iter_prefix` returns entries in
/// ascending key order so callers can rely on deterministic iteration.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// All `(key, value)` pairs whose key starts with `prefix`, ascending by key.
    fn iter_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}

/// Smallest key strictly greater than every key starting with `prefix`.
///
/// Returns `None` when no such key exists (empty prefix or all `0xFF`).
/// Backends with range scans use this as the exclusive upper bound.
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
