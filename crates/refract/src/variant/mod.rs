//! Dynamic value container
//!
//! A [`Variant`] owns at most one value of one registered type. It is cloned
//! by value, queried by type identity and converted through the built-in
//! rules or the registry's conversion graph.

mod compare;
mod convert;
mod value;
mod view;

pub use value::VariantValue;
pub use view::{AssociativeView, SequentialView};

use std::any::Any;
use std::fmt;

use crate::convert::Scalar;
use crate::registry::Registry;
use crate::types::{Reflect, Type};

struct Held {
    ty: Type,
    value: Box<dyn VariantValue>,
}

/// Type-erased value of a registered type
#[derive(Default)]
pub struct Variant {
    held: Option<Held>,
}

impl Variant {
    /// Wrap `value`, registering its type in the process-wide registry
    pub fn new<T: Reflect + Clone + Send + Sync>(value: T) -> Self {
        Self::new_in(Registry::global(), value)
    }

    /// Wrap `value`, registering its type in `registry`
    pub fn new_in<T: Reflect + Clone + Send + Sync>(registry: &'static Registry, value: T) -> Self {
        let ty = registry.type_of::<T>();
        Self::from_parts(ty, Box::new(value))
    }

    pub(crate) fn from_parts(ty: Type, value: Box<dyn VariantValue>) -> Self {
        Self {
            held: Some(Held { ty, value }),
        }
    }

    /// Variant holding nothing
    pub fn empty() -> Self {
        Self { held: None }
    }

    /// Whether a value is held
    pub fn is_valid(&self) -> bool {
        self.held.is_some()
    }

    /// Type of the held value
    pub fn get_type(&self) -> Option<Type> {
        self.held.as_ref().map(|held| held.ty)
    }

    /// Registry the held type belongs to
    pub fn registry(&self) -> Option<&'static Registry> {
        self.held.as_ref().map(|held| held.ty.registry())
    }

    /// Whether the held type is `T`'s registered type
    pub fn is_type<T: Reflect>(&self) -> bool {
        match &self.held {
            Some(held) => held.ty.registry().lookup::<T>() == Some(held.ty),
            None => false,
        }
    }

    /// Borrow the held value as exactly `T`
    pub fn get_value<T: Any>(&self) -> Option<&T> {
        self.held
            .as_ref()
            .and_then(|held| held.value.as_any().downcast_ref::<T>())
    }

    /// Mutably borrow the held value as exactly `T`
    pub fn get_value_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.held
            .as_mut()
            .and_then(|held| held.value.as_any_mut().downcast_mut::<T>())
    }

    /// Move the held value out as exactly `T`; gives the variant back otherwise
    pub fn take<T: Any>(self) -> Result<T, Variant> {
        let Some(held) = self.held else {
            return Err(Variant::empty());
        };
        if !held.value.as_any().is::<T>() {
            return Err(Variant { held: Some(held) });
        }
        match held.value.into_any().downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(Variant::empty()),
        }
    }

    /// Copy of the value behind a held `Box`, `Rc` or `Arc`, typed as the
    /// wrapped type
    pub fn extract_wrapped_value(&self) -> Option<Variant> {
        let held = self.held.as_ref()?;
        let wrapper = held.ty.wrapper_info()?;
        let wrapped = held.ty.wrapped_type()?;
        let value = (wrapper.extract)(held.value.as_any())?;
        Some(Variant::from_parts(wrapped, value))
    }

    /// Drop the held value
    pub fn clear(&mut self) {
        self.held = None;
    }

    pub(crate) fn as_any(&self) -> Option<&dyn Any> {
        self.held.as_ref().map(|held| held.value.as_any())
    }

    pub(crate) fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        self.held.as_mut().map(|held| held.value.as_any_mut())
    }

    /// Built-in scalar view (enums read as their underlying value)
    pub(crate) fn scalar(&self) -> Option<Scalar> {
        let held = self.held.as_ref()?;
        let any = held.value.as_any();
        if let Some(scalar) = Scalar::read(any) {
            return Some(scalar);
        }
        let enumeration = held.ty.registry().enumeration_data(held.ty.index())?;
        enumeration.underlying_of(any).map(Scalar::Int)
    }
}

impl Clone for Variant {
    fn clone(&self) -> Self {
        Self {
            held: self.held.as_ref().map(|held| Held {
                ty: held.ty,
                value: held.value.clone_value(),
            }),
        }
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.held {
            None => f.write_str("Variant(<empty>)"),
            Some(held) => match Scalar::read(held.value.as_any()) {
                Some(scalar) => write!(f, "Variant({}: {})", held.ty.name(), scalar.to_text()),
                None => write!(f, "Variant({})", held.ty.name()),
            },
        }
    }
}
