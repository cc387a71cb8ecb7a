//! Variant conversions
//!
//! Resolution order: identity, built-in scalar rules, enumeration rules,
//! then converters registered in the conversion graph. A failed conversion
//! never modifies the variant.

use std::any::{Any, TypeId};

use super::{Held, Variant};
use crate::convert::{is_scalar_type, Scalar};
use crate::types::{Reflect, Type};

fn is_scalar_value(value: &dyn Any) -> bool {
    is_scalar_type(value.type_id()) || value.is::<&'static str>()
}

impl Variant {
    /// Whether a conversion path to `T` exists
    pub fn can_convert<T: Reflect>(&self) -> bool {
        match self.registry() {
            Some(registry) => self.can_convert_to(registry.type_of::<T>()),
            None => false,
        }
    }

    /// Whether a conversion path to `target` exists
    pub fn can_convert_to(&self, target: Type) -> bool {
        let Some(held) = &self.held else {
            return false;
        };
        if held.ty == target {
            return true;
        }

        let registry = target.registry();
        let source = held.value.as_any();
        let target_is_scalar = registry
            .type_id_of(target.index())
            .is_some_and(is_scalar_type);
        let source_is_enum = registry.enumeration_data(held.ty.index()).is_some();
        let target_is_enum = registry.enumeration_data(target.index()).is_some();

        if is_scalar_value(source) && (target_is_scalar || target_is_enum) {
            return true;
        }
        if source_is_enum && target_is_scalar {
            return true;
        }
        registry.find_converter(held.ty, target).is_some()
    }

    /// Convert a copy of the held value into `T`
    pub fn convert<T: Reflect + Clone + Send + Sync>(&self) -> Option<T> {
        let held = self.held.as_ref()?;
        if let Some(value) = held.value.as_any().downcast_ref::<T>() {
            return Some(value.clone());
        }
        let target = held.ty.registry().type_of::<T>();
        self.convert_to(target)?.take::<T>().ok()
    }

    /// Convert a copy of the held value into `target`
    pub fn convert_to(&self, target: Type) -> Option<Variant> {
        let held = self.held.as_ref()?;
        if held.ty == target {
            return Some(self.clone());
        }

        let registry = target.registry();
        let target_id = registry.type_id_of(target.index());

        if let (Some(scalar), Some(target_id)) = (Scalar::read(held.value.as_any()), target_id) {
            if is_scalar_type(target_id) {
                return scalar
                    .convert_to(target_id)
                    .map(|value| Variant::from_parts(target, value));
            }
        }

        if let Some(result) = convert_enumeration(held, target, target_id) {
            return result;
        }

        let converter = registry.find_converter(held.ty, target)?;
        let converted = converter(held.value.as_any())?;
        (converted.get_type() == Some(target)).then_some(converted)
    }

    /// Replace the held value by its conversion into `target`.
    ///
    /// On failure the variant keeps its original value and type.
    pub fn convert_in_place(&mut self, target: Type) -> bool {
        match self.convert_to(target) {
            Some(converted) => {
                *self = converted;
                true
            }
            None => false,
        }
    }

    /// Truthiness of the held value
    pub fn to_bool(&self) -> Option<bool> {
        self.convert::<bool>()
    }

    /// Held value as `i8`
    pub fn to_i8(&self) -> Option<i8> {
        self.convert::<i8>()
    }

    /// Held value as `i16`
    pub fn to_i16(&self) -> Option<i16> {
        self.convert::<i16>()
    }

    /// Held value as `i32`
    pub fn to_i32(&self) -> Option<i32> {
        self.convert::<i32>()
    }

    /// Held value as `i64`
    pub fn to_i64(&self) -> Option<i64> {
        self.convert::<i64>()
    }

    /// Held value as `u8`
    pub fn to_u8(&self) -> Option<u8> {
        self.convert::<u8>()
    }

    /// Held value as `u16`
    pub fn to_u16(&self) -> Option<u16> {
        self.convert::<u16>()
    }

    /// Held value as `u32`
    pub fn to_u32(&self) -> Option<u32> {
        self.convert::<u32>()
    }

    /// Held value as `u64`
    pub fn to_u64(&self) -> Option<u64> {
        self.convert::<u64>()
    }

    /// Held value as `f32`
    pub fn to_f32(&self) -> Option<f32> {
        self.convert::<f32>()
    }

    /// Held value as `f64`
    pub fn to_f64(&self) -> Option<f64> {
        self.convert::<f64>()
    }

    /// Held value as text
    pub fn to_string(&self) -> Option<String> {
        self.convert::<String>()
    }
}

/// Conversions from or into a registered enumeration.
///
/// Returns `None` when neither side is an enumeration.
fn convert_enumeration(held: &Held, target: Type, target_id: Option<TypeId>) -> Option<Option<Variant>> {
    let registry = target.registry();
    let source = held.value.as_any();

    if let Some(enumeration) = registry.enumeration_data(held.ty.index()) {
        if let Some(target_id) = target_id.filter(|id| is_scalar_type(*id)) {
            let underlying = enumeration.underlying_of(source)?;
            let converted = if target_id == TypeId::of::<String>() {
                enumeration
                    .name_of(underlying)
                    .map(|name| Variant::from_parts(target, Box::new(name.to_string())))
            } else if target_id == TypeId::of::<bool>() {
                match underlying {
                    0 => Some(Variant::from_parts(target, Box::new(false))),
                    1 => Some(Variant::from_parts(target, Box::new(true))),
                    _ => None,
                }
            } else {
                Scalar::Int(underlying)
                    .convert_to(target_id)
                    .map(|value| Variant::from_parts(target, value))
            };
            return Some(converted);
        }
    }

    if let Some(enumeration) = registry.enumeration_data(target.index()) {
        let scalar = Scalar::read(source)?;
        let boxed = match scalar {
            Scalar::Str(name) => enumeration.boxed_by_name(&name),
            Scalar::F32(_) | Scalar::F64(_) => scalar
                .to_f64()
                .filter(|value| value.fract() == 0.0)
                .and_then(|value| enumeration.boxed_by_value(value as i128)),
            other => other
                .to_integer()
                .and_then(|value| enumeration.boxed_by_value(value)),
        };
        return Some(boxed.map(|value| Variant::from_parts(target, value)));
    }

    None
}
