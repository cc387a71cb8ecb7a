//! Metadata side tables
//!
//! Every type and registered item carries a small table of key/value pairs.
//! The table is kept sorted by key and looked up by binary search; inserting
//! a key that is already present keeps the existing value.

use std::borrow::Cow;
use std::fmt;

use crate::variant::Variant;

/// Metadata key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataKey {
    /// Integral key (enum discriminants are usually cast to this)
    Int(i64),
    /// Textual key
    Name(Cow<'static, str>),
}

impl From<&'static str> for MetadataKey {
    fn from(name: &'static str) -> Self {
        MetadataKey::Name(Cow::Borrowed(name))
    }
}

impl From<String> for MetadataKey {
    fn from(name: String) -> Self {
        MetadataKey::Name(Cow::Owned(name))
    }
}

impl From<i64> for MetadataKey {
    fn from(key: i64) -> Self {
        MetadataKey::Int(key)
    }
}

impl From<i32> for MetadataKey {
    fn from(key: i32) -> Self {
        MetadataKey::Int(key as i64)
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataKey::Int(key) => write!(f, "{}", key),
            MetadataKey::Name(name) => f.write_str(name),
        }
    }
}

/// Sorted key/value table
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    entries: Vec<(MetadataKey, Variant)>,
}

impl MetadataTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `key`; returns false if the key already exists
    pub fn insert(&mut self, key: MetadataKey, value: Variant) -> bool {
        match self.entries.binary_search_by(|(existing, _)| existing.cmp(&key)) {
            Ok(_) => false,
            Err(index) => {
                self.entries.insert(index, (key, value));
                true
            }
        }
    }

    /// Look up `key`
    pub fn get(&self, key: &MetadataKey) -> Option<&Variant> {
        self.entries
            .binary_search_by(|(existing, _)| existing.cmp(key))
            .ok()
            .map(|index| &self.entries[index].1)
    }

    /// Iterate in key order
    pub fn iter(&self) -> impl Iterator<Item = (&MetadataKey, &Variant)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Registry;

    #[test]
    fn test_first_key_wins_and_sorted_lookup() {
        let registry = Registry::isolated();
        let mut table = MetadataTable::new();

        assert!(table.insert("tooltip".into(), Variant::new_in(registry, "first".to_string())));
        assert!(table.insert(MetadataKey::Int(3), Variant::new_in(registry, 3i32)));
        assert!(!table.insert("tooltip".into(), Variant::new_in(registry, "second".to_string())));

        let tooltip = table.get(&"tooltip".into()).and_then(|v| v.get_value::<String>());
        assert_eq!(tooltip.map(String::as_str), Some("first"));
        assert_eq!(table.len(), 2);

        // integer keys order before names
        let keys: Vec<String> = table.iter().map(|(key, _)| key.to_string()).collect();
        assert_eq!(keys, vec!["3".to_string(), "tooltip".to_string()]);
    }
}
