//! Registration transactions
//!
//! A transaction records everything registered between `begin` and `end` so
//! it can be removed again as a unit. Libraries use one per load: the
//! library's registration entry point runs between `begin` and `end`, and
//! unloading the library rolls the journal back.
//!
//! Entries are recognized by their registration sequence number, not by
//! container sizes, so removals made by other transactions in the meantime
//! never shift what this one captured.

use super::{Method, Property, Registry};
use crate::convert::ConversionKey;
use crate::support::ItemId;
use crate::types::{Type, TypeIndex};

/// One captured class member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MemberKey {
    Property(ItemId),
    Method(ItemId),
    Constructor(ItemId),
    Destructor(ItemId),
    Enumeration(TypeIndex, u64),
}

/// Sequence numbers in `(after, through]`, the span one transaction recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SequenceRange {
    pub after: u64,
    pub through: u64,
}

impl SequenceRange {
    pub fn contains(&self, sequence: u64) -> bool {
        sequence > self.after && sequence <= self.through
    }
}

/// Journal of registrations
#[derive(Debug, Default)]
pub(crate) struct Captured {
    pub types: Vec<TypeIndex>,
    pub global_properties: Vec<ItemId>,
    pub global_methods: Vec<ItemId>,
    pub members: Vec<MemberKey>,
    pub conversions: Vec<ConversionKey>,
}

impl Captured {
    fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.global_properties.is_empty()
            && self.global_methods.is_empty()
            && self.members.is_empty()
            && self.conversions.is_empty()
    }

    fn append(&mut self, other: Captured) {
        self.types.extend(other.types);
        self.global_properties.extend(other.global_properties);
        self.global_methods.extend(other.global_methods);
        self.members.extend(other.members);
        self.conversions.extend(other.conversions);
    }
}

/// Journal of everything registered while the transaction was open.
///
/// Dropping the transaction rolls it back.
pub struct RegistrationTransaction {
    registry: &'static Registry,
    mark: Option<u64>,
    captured: Captured,
}

impl RegistrationTransaction {
    /// Idle transaction on `registry`
    pub fn new(registry: &'static Registry) -> Self {
        Self {
            registry,
            mark: None,
            captured: Captured::default(),
        }
    }

    /// Start recording
    pub fn begin(&mut self) {
        self.mark = Some(self.registry.read().sequence());
    }

    /// Stop recording and keep what was registered since `begin`
    pub fn end(&mut self) {
        self.end_excluding(&[]);
    }

    /// Like [`end`](Self::end), leaving out the spans recorded by nested
    /// transactions. Returns the span this transaction covered.
    pub(crate) fn end_excluding(&mut self, excluded: &[SequenceRange]) -> Option<SequenceRange> {
        let mark = self.mark.take()?;
        let state = self.registry.read();
        let captured = state.captured_since(mark, excluded);
        let through = state.sequence();
        drop(state);
        self.captured.append(captured);
        Some(SequenceRange {
            after: mark,
            through,
        })
    }

    /// Stop recording without capturing anything
    pub fn abandon(&mut self) {
        self.mark = None;
    }

    /// Whether `begin` was called without a matching `end`
    pub fn is_recording(&self) -> bool {
        self.mark.is_some()
    }

    /// Whether nothing was captured
    pub fn is_empty(&self) -> bool {
        self.captured.is_empty()
    }

    /// Captured types, in registration order
    pub fn types(&self) -> Vec<Type> {
        self.captured
            .types
            .iter()
            .map(|index| Type::new(self.registry, *index))
            .collect()
    }

    /// Captured global properties
    pub fn global_properties(&self) -> Vec<Property> {
        self.captured
            .global_properties
            .iter()
            .map(|id| Property::new(self.registry, *id))
            .filter(Property::is_valid)
            .collect()
    }

    /// Captured global methods
    pub fn global_methods(&self) -> Vec<Method> {
        self.captured
            .global_methods
            .iter()
            .map(|id| Method::new(self.registry, *id))
            .filter(Method::is_valid)
            .collect()
    }

    /// Remove everything captured. Calling it again does nothing.
    pub fn rollback(&mut self) {
        self.mark = None;
        let captured = std::mem::take(&mut self.captured);
        if captured.is_empty() {
            return;
        }
        log::debug!(
            "Rolling back {} types, {} members, {} conversions",
            captured.types.len(),
            captured.members.len(),
            captured.conversions.len()
        );
        self.registry.write().rollback(&captured);
    }
}

impl Drop for RegistrationTransaction {
    fn drop(&mut self) {
        self.rollback();
    }
}

impl std::fmt::Debug for RegistrationTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationTransaction")
            .field("recording", &self.is_recording())
            .field("captured", &self.captured)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{AccessLevel, PropertyAccessor, PropertyDefinition};
    use crate::{Instance, Variant};
    use std::sync::Arc;

    struct Constant(i32);

    impl PropertyAccessor for Constant {
        fn get_value(&self, _: &Instance<'_>) -> Option<Variant> {
            Some(Variant::new(self.0))
        }

        fn set_value(&self, _: &mut Instance<'_>, _: &Variant) -> bool {
            false
        }

        fn is_readonly(&self) -> bool {
            true
        }
    }

    fn constant(registry: &'static Registry, name: &str, value: i32) -> PropertyDefinition {
        PropertyDefinition {
            name: name.to_string(),
            access: AccessLevel::Public,
            is_static: true,
            value_type: registry.type_of::<i32>(),
            accessor: Arc::new(Constant(value)),
            metadata: Vec::new(),
        }
    }

    #[derive(Clone)]
    struct Marker;
    crate::reflect_class!(Marker);

    #[test]
    fn test_rollback_removes_only_captured_entries() {
        let registry = Registry::isolated();
        registry.register_property(None, constant(registry, "before", 1));

        let mut transaction = RegistrationTransaction::new(registry);
        transaction.begin();
        let marker = registry.type_of::<Marker>();
        registry.register_property(None, constant(registry, "during", 2));
        transaction.end();

        registry.register_property(None, constant(registry, "after", 3));

        assert_eq!(transaction.types(), vec![marker]);
        assert_eq!(transaction.global_properties().len(), 1);

        transaction.rollback();
        assert!(!marker.is_valid());
        assert!(registry.global_property("before").is_some());
        assert!(registry.global_property("during").is_none());
        assert!(registry.global_property("after").is_some());

        // idempotent
        transaction.rollback();
        assert!(registry.global_property("before").is_some());
    }

    #[test]
    fn test_begin_without_end_captures_nothing() {
        let registry = Registry::isolated();
        let mut transaction = RegistrationTransaction::new(registry);
        transaction.begin();
        registry.register_property(None, constant(registry, "kept", 1));
        transaction.abandon();
        transaction.rollback();
        assert!(registry.global_property("kept").is_some());
    }

    #[test]
    fn test_excluded_span_stays_registered() {
        let registry = Registry::isolated();
        let mut outer = RegistrationTransaction::new(registry);
        outer.begin();
        registry.register_property(None, constant(registry, "outer", 1));

        let mut inner = RegistrationTransaction::new(registry);
        inner.begin();
        registry.register_property(None, constant(registry, "inner", 2));
        let span = inner.end_excluding(&[]).expect("inner span");

        registry.register_property(None, constant(registry, "outer_tail", 3));
        outer.end_excluding(&[span]);

        let names: Vec<String> = outer.global_properties().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["outer".to_string(), "outer_tail".to_string()]);

        outer.rollback();
        assert!(registry.global_property("outer").is_none());
        assert!(registry.global_property("outer_tail").is_none());
        assert!(registry.global_property("inner").is_some());

        inner.rollback();
        assert!(registry.global_property("inner").is_none());
    }

    #[test]
    fn test_drop_rolls_back() {
        let registry = Registry::isolated();
        {
            let mut transaction = RegistrationTransaction::new(registry);
            transaction.begin();
            registry.register_property(None, constant(registry, "scoped", 1));
            transaction.end();
        }
        assert!(registry.global_property("scoped").is_none());
    }
}
