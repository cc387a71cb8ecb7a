//! Enumeration descriptions

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::types::{ReflectEnum, Type};
use crate::variant::{Variant, VariantValue};

struct Enumerator {
    name: String,
    value: i128,
    boxed: Box<dyn VariantValue>,
}

/// Names and underlying values of an enumeration
pub struct EnumerationData {
    underlying_type: Type,
    enumerators: Vec<Enumerator>,
    read: fn(&dyn Any) -> Option<i128>,
}

fn read_underlying<E: ReflectEnum>(value: &dyn Any) -> Option<i128> {
    value.downcast_ref::<E>().map(ReflectEnum::to_underlying)
}

impl EnumerationData {
    /// Describe `E` with the given name/value pairs
    pub fn new<E, N>(underlying_type: Type, values: impl IntoIterator<Item = (N, E)>) -> Self
    where
        E: ReflectEnum,
        N: Into<String>,
    {
        let enumerators = values
            .into_iter()
            .map(|(name, value)| Enumerator {
                name: name.into(),
                value: value.to_underlying(),
                boxed: Box::new(value),
            })
            .collect();
        Self {
            underlying_type,
            enumerators,
            read: read_underlying::<E>,
        }
    }

    /// Type of the integral representation
    pub fn underlying_type(&self) -> Type {
        self.underlying_type
    }

    /// Number of enumerators
    pub fn len(&self) -> usize {
        self.enumerators.len()
    }

    /// Whether no enumerator was registered
    pub fn is_empty(&self) -> bool {
        self.enumerators.is_empty()
    }

    pub(crate) fn underlying_of(&self, value: &dyn Any) -> Option<i128> {
        (self.read)(value)
    }

    pub(crate) fn name_of(&self, value: i128) -> Option<&str> {
        self.enumerators
            .iter()
            .find(|enumerator| enumerator.value == value)
            .map(|enumerator| enumerator.name.as_str())
    }

    pub(crate) fn boxed_by_name(&self, name: &str) -> Option<Box<dyn VariantValue>> {
        self.enumerators
            .iter()
            .find(|enumerator| enumerator.name == name)
            .map(|enumerator| enumerator.boxed.clone_value())
    }

    pub(crate) fn boxed_by_value(&self, value: i128) -> Option<Box<dyn VariantValue>> {
        self.enumerators
            .iter()
            .find(|enumerator| enumerator.value == value)
            .map(|enumerator| enumerator.boxed.clone_value())
    }
}

impl fmt::Debug for EnumerationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.enumerators.iter().map(|e| (&e.name, e.value)))
            .finish()
    }
}

/// Handle to a registered enumeration
#[derive(Clone)]
pub struct Enumeration {
    ty: Type,
    data: Arc<EnumerationData>,
}

impl Enumeration {
    pub(crate) fn new(ty: Type, data: Arc<EnumerationData>) -> Self {
        Self { ty, data }
    }

    /// The enum type
    pub fn declaring_type(&self) -> Type {
        self.ty
    }

    /// Type of the integral representation
    pub fn underlying_type(&self) -> Type {
        self.data.underlying_type
    }

    /// Enumerator names in registration order
    pub fn names(&self) -> Vec<String> {
        self.data.enumerators.iter().map(|e| e.name.clone()).collect()
    }

    /// Enumerator values in registration order
    pub fn values(&self) -> Vec<Variant> {
        self.data
            .enumerators
            .iter()
            .map(|e| Variant::from_parts(self.ty, e.boxed.clone_value()))
            .collect()
    }

    /// Name of the enumerator held by `value` (an enum value or an integer)
    pub fn value_to_name(&self, value: &Variant) -> Option<String> {
        let underlying = match value.as_any().and_then(|any| self.data.underlying_of(any)) {
            Some(underlying) => underlying,
            None => value.to_i64()? as i128,
        };
        self.data.name_of(underlying).map(str::to_string)
    }

    /// Enumerator named `name`
    pub fn name_to_value(&self, name: &str) -> Option<Variant> {
        self.data
            .boxed_by_name(name)
            .map(|boxed| Variant::from_parts(self.ty, boxed))
    }
}

impl fmt::Debug for Enumeration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enumeration")
            .field("type", &self.ty)
            .field("enumerators", &self.data)
            .finish()
    }
}
