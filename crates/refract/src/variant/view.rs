//! Read-only views over container variants
//!
//! A view borrows a variant holding a `Vec` or a map and hands out copies of
//! its elements as variants of the registered element types.

use std::fmt;

use super::Variant;
use crate::types::{AssociativeOps, SequentialOps, Type};

/// Elements of a variant holding a sequential container
pub struct SequentialView<'a> {
    variant: &'a Variant,
    element: Type,
    ops: SequentialOps,
}

impl<'a> SequentialView<'a> {
    /// Type of the elements
    pub fn value_type(&self) -> Type {
        self.element
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.variant.as_any().and_then(|value| (self.ops.len)(value)).unwrap_or(0)
    }

    /// Whether there are no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the element at `index`
    pub fn get(&self, index: usize) -> Option<Variant> {
        let value = (self.ops.get)(self.variant.as_any()?, index)?;
        Some(Variant::from_parts(self.element, value))
    }

    /// Copies of every element, in order
    pub fn iter(&self) -> impl Iterator<Item = Variant> + '_ {
        (0..self.len()).filter_map(move |index| self.get(index))
    }
}

impl fmt::Debug for SequentialView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequentialView")
            .field("value_type", &self.element.name())
            .field("len", &self.len())
            .finish()
    }
}

/// Entries of a variant holding an associative container
pub struct AssociativeView<'a> {
    variant: &'a Variant,
    key: Type,
    value: Type,
    ops: AssociativeOps,
}

impl<'a> AssociativeView<'a> {
    /// Type of the keys
    pub fn key_type(&self) -> Type {
        self.key
    }

    /// Type of the mapped values
    pub fn value_type(&self) -> Type {
        self.value
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.variant.as_any().and_then(|value| (self.ops.len)(value)).unwrap_or(0)
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies of every entry, in the container's iteration order
    pub fn iter(&self) -> impl Iterator<Item = (Variant, Variant)> + '_ {
        let entries = match self.variant.as_any() {
            Some(value) => (self.ops.entries)(value),
            None => Vec::new(),
        };
        entries.into_iter().map(move |(key, value)| {
            (Variant::from_parts(self.key, key), Variant::from_parts(self.value, value))
        })
    }

    /// Copy of the value mapped to a key equal to `key`
    pub fn find(&self, key: &Variant) -> Option<Variant> {
        self.iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value)
    }
}

impl fmt::Debug for AssociativeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssociativeView")
            .field("key_type", &self.key.name())
            .field("value_type", &self.value.name())
            .field("len", &self.len())
            .finish()
    }
}

impl Variant {
    /// View over the elements of a held `Vec`
    pub fn sequential_view(&self) -> Option<SequentialView<'_>> {
        let ty = self.get_type()?;
        let ops = ty.sequential_ops()?;
        let element = ty.template_arguments().first().copied()?;
        Some(SequentialView {
            variant: self,
            element,
            ops,
        })
    }

    /// View over the entries of a held map
    pub fn associative_view(&self) -> Option<AssociativeView<'_>> {
        let ty = self.get_type()?;
        let ops = ty.associative_ops()?;
        let arguments = ty.template_arguments();
        let (key, value) = match arguments.as_slice() {
            [key, value, ..] => (*key, *value),
            _ => return None,
        };
        Some(AssociativeView {
            variant: self,
            key,
            value,
            ops,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::registry::Registry;

    #[test]
    fn test_sequential_view_reads_elements() {
        let registry = Registry::isolated();
        let list = Variant::new_in(registry, vec![3_i32, 5, 8]);
        let view = list.sequential_view().expect("vec view");

        assert_eq!(view.value_type(), registry.type_of::<i32>());
        assert_eq!(view.len(), 3);
        assert_eq!(view.get(1).and_then(|v| v.to_i64()), Some(5));
        assert!(view.get(3).is_none());
        let values: Vec<i64> = view.iter().filter_map(|v| v.to_i64()).collect();
        assert_eq!(values, vec![3, 5, 8]);
    }

    #[test]
    fn test_associative_view_finds_by_key() {
        let registry = Registry::isolated();
        let mut ports = BTreeMap::new();
        ports.insert("http".to_string(), 80_u16);
        ports.insert("https".to_string(), 443_u16);
        let map = Variant::new_in(registry, ports);
        let view = map.associative_view().expect("map view");

        assert_eq!(view.key_type(), registry.type_of::<String>());
        assert_eq!(view.value_type(), registry.type_of::<u16>());
        assert_eq!(view.len(), 2);

        let key = Variant::new_in(registry, "https".to_string());
        assert_eq!(view.find(&key).and_then(|v| v.to_u32()), Some(443));
        let keys: Vec<String> = view.iter().filter_map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["http".to_string(), "https".to_string()]);
    }

    #[test]
    fn test_views_need_matching_container() {
        let registry = Registry::isolated();
        let number = Variant::new_in(registry, 4_u8);
        assert!(number.sequential_view().is_none());
        assert!(number.associative_view().is_none());
        assert!(Variant::empty().sequential_view().is_none());

        let list = Variant::new_in(registry, Vec::<u8>::new());
        assert!(list.associative_view().is_none());
        assert!(list.sequential_view().is_some_and(|view| view.is_empty()));
    }
}
