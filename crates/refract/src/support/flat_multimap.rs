//! Hash-sorted vector multimap
//!
//! Same layout as [`FlatMap`](super::FlatMap) but a key may map to several
//! values (overloaded global methods share a name). Values with an equal key
//! keep their insertion order.

use std::borrow::Borrow;
use std::hash::Hash;

use super::flat_map::hash_of;

#[derive(Debug, Clone)]
struct Entry<K, V> {
    hash: u64,
    key: K,
    value: V,
}

/// Multimap backed by a vector sorted by key hash
#[derive(Debug, Clone)]
pub struct FlatMultiMap<K, V> {
    entries: Vec<Entry<K, V>>,
}

impl<K: Hash + Eq, V> FlatMultiMap<K, V> {
    /// Create an empty multimap
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert a value under `key`, after any existing values for that key
    pub fn insert(&mut self, key: K, value: V) {
        let hash = hash_of(&key);
        let index = self.entries.partition_point(|entry| entry.hash <= hash);
        self.entries.insert(index, Entry { hash, key, value });
    }

    /// Iterate over all values stored under `key`
    pub fn find<'a, Q>(&'a self, key: &'a Q) -> impl Iterator<Item = &'a V> + 'a
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_of(key);
        let start = self.entries.partition_point(|entry| entry.hash < hash);
        self.entries[start..]
            .iter()
            .take_while(move |entry| entry.hash == hash)
            .filter(move |entry| entry.key.borrow() == key)
            .map(|entry| &entry.value)
    }

    /// Remove every value under `key` matching `pred`; returns how many were removed
    pub fn remove_if<Q, F>(&mut self, key: &Q, mut pred: F) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnMut(&V) -> bool,
    {
        let hash = hash_of(key);
        let before = self.entries.len();
        self.entries
            .retain(|entry| !(entry.hash == hash && entry.key.borrow() == key && pred(&entry.value)));
        before - self.entries.len()
    }

}

impl<K: Hash + Eq, V> Default for FlatMultiMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_keys_keep_insertion_order() {
        let mut map = FlatMultiMap::new();
        map.insert("print".to_string(), 1);
        map.insert("max".to_string(), 2);
        map.insert("print".to_string(), 3);

        let found: Vec<i32> = map.find("print").copied().collect();
        assert_eq!(found, vec![1, 3]);
        assert_eq!(map.find("min").count(), 0);
        assert_eq!(map.entries.len(), 3);
    }

    #[test]
    fn test_remove_if_only_touches_matching_key() {
        let mut map = FlatMultiMap::new();
        map.insert("print".to_string(), 1);
        map.insert("print".to_string(), 2);
        map.insert("max".to_string(), 2);

        assert_eq!(map.remove_if("print", |v| *v == 2), 1);
        assert_eq!(map.find("print").copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(map.find("max").copied().collect::<Vec<_>>(), vec![2]);
    }
}
