//! Registered converters and comparators
//!
//! Converters are kept in one vector sorted by source identity (stable, so
//! converters of the same source stay in registration order). A lookup is a
//! binary search on the source followed by a short linear scan for the
//! target. Comparators are looked up by the single operand type.

use std::any::Any;
use std::sync::Arc;

use crate::types::TypeIndex;
use crate::variant::Variant;

/// Type-erased conversion from a source value to a variant of the target type
pub type ConverterFn = Arc<dyn Fn(&dyn Any) -> Option<Variant> + Send + Sync>;

/// Type-erased binary predicate over two values of the same type
pub type ComparatorFn = Arc<dyn Fn(&dyn Any, &dyn Any) -> bool + Send + Sync>;

/// Which comparison a comparator implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparatorKind {
    /// `a == b`
    Equal,
    /// `a < b`
    LessThan,
}

/// Identifies one registration in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ConversionKey {
    Converter {
        source: TypeIndex,
        target: TypeIndex,
        sequence: u64,
    },
    Comparator {
        kind: ComparatorKind,
        ty: TypeIndex,
        sequence: u64,
    },
}

impl ConversionKey {
    pub(crate) fn sequence(&self) -> u64 {
        match self {
            ConversionKey::Converter { sequence, .. } | ConversionKey::Comparator { sequence, .. } => {
                *sequence
            }
        }
    }
}

struct ConverterEntry {
    source: TypeIndex,
    target: TypeIndex,
    convert: ConverterFn,
    sequence: u64,
}

struct ComparatorEntry {
    ty: TypeIndex,
    compare: ComparatorFn,
    sequence: u64,
}

#[derive(Default)]
pub(crate) struct ConversionGraph {
    converters: Vec<ConverterEntry>,
    equal: Vec<ComparatorEntry>,
    less_than: Vec<ComparatorEntry>,
}

impl ConversionGraph {
    fn source_range(&self, source: TypeIndex) -> &[ConverterEntry] {
        let start = self.converters.partition_point(|entry| entry.source < source);
        let end = self.converters.partition_point(|entry| entry.source <= source);
        &self.converters[start..end]
    }

    /// Register a converter; the first one registered for a pair wins
    pub fn register_converter(
        &mut self,
        source: TypeIndex,
        target: TypeIndex,
        convert: ConverterFn,
        sequence: u64,
    ) -> bool {
        if self.find_converter(source, target).is_some() {
            return false;
        }
        let at = self.converters.partition_point(|entry| entry.source <= source);
        self.converters.insert(
            at,
            ConverterEntry {
                source,
                target,
                convert,
                sequence,
            },
        );
        true
    }

    pub fn find_converter(&self, source: TypeIndex, target: TypeIndex) -> Option<&ConverterFn> {
        self.source_range(source)
            .iter()
            .find(|entry| entry.target == target)
            .map(|entry| &entry.convert)
    }

    pub fn remove_converter(&mut self, source: TypeIndex, target: TypeIndex) -> bool {
        let before = self.converters.len();
        self.converters
            .retain(|entry| !(entry.source == source && entry.target == target));
        before != self.converters.len()
    }

    fn comparators(&self, kind: ComparatorKind) -> &Vec<ComparatorEntry> {
        match kind {
            ComparatorKind::Equal => &self.equal,
            ComparatorKind::LessThan => &self.less_than,
        }
    }

    fn comparators_mut(&mut self, kind: ComparatorKind) -> &mut Vec<ComparatorEntry> {
        match kind {
            ComparatorKind::Equal => &mut self.equal,
            ComparatorKind::LessThan => &mut self.less_than,
        }
    }

    /// Register a comparator; the first one registered for a type wins
    pub fn register_comparator(
        &mut self,
        kind: ComparatorKind,
        ty: TypeIndex,
        compare: ComparatorFn,
        sequence: u64,
    ) -> bool {
        let list = self.comparators_mut(kind);
        match list.binary_search_by(|entry| entry.ty.cmp(&ty)) {
            Ok(_) => false,
            Err(at) => {
                list.insert(at, ComparatorEntry { ty, compare, sequence });
                true
            }
        }
    }

    pub fn find_comparator(&self, kind: ComparatorKind, ty: TypeIndex) -> Option<&ComparatorFn> {
        let list = self.comparators(kind);
        list.binary_search_by(|entry| entry.ty.cmp(&ty))
            .ok()
            .map(|at| &list[at].compare)
    }

    pub fn remove_comparator(&mut self, kind: ComparatorKind, ty: TypeIndex) -> bool {
        let list = self.comparators_mut(kind);
        match list.binary_search_by(|entry| entry.ty.cmp(&ty)) {
            Ok(at) => {
                list.remove(at);
                true
            }
            Err(_) => false,
        }
    }

    /// Drop every converter and comparator touching `ty`
    pub fn remove_type(&mut self, ty: TypeIndex) -> usize {
        let before = self.len();
        self.converters
            .retain(|entry| entry.source != ty && entry.target != ty);
        self.equal.retain(|entry| entry.ty != ty);
        self.less_than.retain(|entry| entry.ty != ty);
        before - self.len()
    }

    /// Keys of every registration made at or after `sequence`
    pub fn entries_since(&self, sequence: u64) -> Vec<ConversionKey> {
        let converters = self
            .converters
            .iter()
            .filter(|entry| entry.sequence >= sequence)
            .map(|entry| ConversionKey::Converter {
                source: entry.source,
                target: entry.target,
                sequence: entry.sequence,
            });
        let comparators = [ComparatorKind::Equal, ComparatorKind::LessThan]
            .into_iter()
            .flat_map(move |kind| {
                self.comparators(kind)
                    .iter()
                    .filter(move |entry| entry.sequence >= sequence)
                    .map(move |entry| ConversionKey::Comparator {
                        kind,
                        ty: entry.ty,
                        sequence: entry.sequence,
                    })
            });
        let mut keys: Vec<ConversionKey> = converters.chain(comparators).collect();
        keys.sort_by_key(|key| match key {
            ConversionKey::Converter { sequence, .. } | ConversionKey::Comparator { sequence, .. } => {
                *sequence
            }
        });
        keys
    }

    /// Remove exactly the registration identified by `key`
    pub fn remove_entry(&mut self, key: &ConversionKey) -> bool {
        match *key {
            ConversionKey::Converter {
                source,
                target,
                sequence,
            } => {
                let before = self.converters.len();
                self.converters.retain(|entry| {
                    !(entry.source == source && entry.target == target && entry.sequence == sequence)
                });
                before != self.converters.len()
            }
            ConversionKey::Comparator { kind, ty, sequence } => {
                let list = self.comparators_mut(kind);
                let before = list.len();
                list.retain(|entry| !(entry.ty == ty && entry.sequence == sequence));
                before != list.len()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.converters.len() + self.equal.len() + self.less_than.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_converter() -> ConverterFn {
        Arc::new(|_: &dyn Any| -> Option<Variant> { None })
    }

    fn always(result: bool) -> ComparatorFn {
        Arc::new(move |_: &dyn Any, _: &dyn Any| result)
    }

    #[test]
    fn test_first_converter_wins() {
        let mut graph = ConversionGraph::default();
        let first = noop_converter();
        assert!(graph.register_converter(TypeIndex(4), TypeIndex(2), first.clone(), 1));
        assert!(!graph.register_converter(TypeIndex(4), TypeIndex(2), noop_converter(), 2));
        assert!(graph.register_converter(TypeIndex(1), TypeIndex(2), noop_converter(), 3));
        assert!(graph.register_converter(TypeIndex(4), TypeIndex(3), noop_converter(), 4));

        let found = graph.find_converter(TypeIndex(4), TypeIndex(2)).expect("converter");
        assert!(Arc::ptr_eq(found, &first));
        assert!(graph.find_converter(TypeIndex(2), TypeIndex(4)).is_none());
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_remove_type_drops_both_directions() {
        let mut graph = ConversionGraph::default();
        graph.register_converter(TypeIndex(1), TypeIndex(2), noop_converter(), 1);
        graph.register_converter(TypeIndex(2), TypeIndex(3), noop_converter(), 2);
        graph.register_converter(TypeIndex(3), TypeIndex(1), noop_converter(), 3);
        graph.register_comparator(ComparatorKind::Equal, TypeIndex(2), always(true), 4);

        assert_eq!(graph.remove_type(TypeIndex(2)), 3);
        assert!(graph.find_converter(TypeIndex(3), TypeIndex(1)).is_some());
        assert!(graph.find_comparator(ComparatorKind::Equal, TypeIndex(2)).is_none());
    }

    #[test]
    fn test_entries_since_and_remove_entry() {
        let mut graph = ConversionGraph::default();
        graph.register_converter(TypeIndex(1), TypeIndex(2), noop_converter(), 1);
        graph.register_comparator(ComparatorKind::LessThan, TypeIndex(1), always(false), 5);
        graph.register_converter(TypeIndex(2), TypeIndex(1), noop_converter(), 6);

        let keys = graph.entries_since(5);
        assert_eq!(keys.len(), 2);
        for key in &keys {
            assert!(graph.remove_entry(key));
        }
        assert!(!graph.remove_entry(&keys[0]));
        assert_eq!(graph.len(), 1);
    }
}
