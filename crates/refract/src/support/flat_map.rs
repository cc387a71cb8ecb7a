//! Hash-sorted vector map
//!
//! Keys are kept in a `Vec` ordered by their Fx hash, values in a parallel
//! `Vec`. Lookup is a binary search on the hash followed by a short linear
//! scan over colliding keys.

use std::borrow::Borrow;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

pub(crate) fn hash_of<Q: Hash + ?Sized>(key: &Q) -> u64 {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone)]
struct KeyData<K> {
    key: K,
    hash: u64,
}

/// Map backed by two vectors sorted by key hash
#[derive(Debug, Clone)]
pub struct FlatMap<K, V> {
    keys: Vec<KeyData<K>>,
    values: Vec<V>,
}

impl<K: Hash + Eq, V> FlatMap<K, V> {
    /// Create an empty map
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Insert a key/value pair.
    ///
    /// Returns `false` and leaves the map untouched when the key exists.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        if self.position(&key).is_some() {
            return false;
        }
        let hash = hash_of(&key);
        // Insert after every key with an equal or smaller hash (stable order)
        let index = self.keys.partition_point(|item| item.hash <= hash);
        self.keys.insert(index, KeyData { key, hash });
        self.values.insert(index, value);
        true
    }

    /// Look up a value
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.position(key).map(|index| &self.values[index])
    }

    /// Remove a key and return its value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.position(key)?;
        self.keys.remove(index);
        Some(self.values.remove(index))
    }

    fn position<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_of(key);
        let start = self.keys.partition_point(|item| item.hash < hash);
        self.keys[start..]
            .iter()
            .take_while(|item| item.hash == hash)
            .position(|item| item.key.borrow() == key)
            .map(|offset| start + offset)
    }
}

impl<K: Hash + Eq, V> Default for FlatMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_first_wins() {
        let mut map = FlatMap::new();
        assert!(map.insert("int".to_string(), 1));
        assert!(!map.insert("int".to_string(), 2));
        assert_eq!(map.get("int"), Some(&1));
    }

    #[test]
    fn test_lookup_by_borrowed_key() {
        let mut map = FlatMap::new();
        for (i, name) in ["bool", "char", "i32", "f64", "String"].iter().enumerate() {
            map.insert(name.to_string(), i);
        }

        assert_eq!(map.get("f64"), Some(&3));
        assert_eq!(map.get("String"), Some(&4));
        assert!(map.get("u8").is_none());
        assert_eq!(map.get("bool"), Some(&0));
    }

    #[test]
    fn test_remove_keeps_parallel_vectors() {
        let mut map = FlatMap::new();
        map.insert("a".to_string(), 'a');
        map.insert("b".to_string(), 'b');
        map.insert("c".to_string(), 'c');

        assert_eq!(map.remove("b"), Some('b'));
        assert_eq!(map.remove("b"), None);
        assert_eq!(map.get("a"), Some(&'a'));
        assert_eq!(map.get("c"), Some(&'c'));
        assert_eq!(map.keys.len(), map.values.len());
    }
}
