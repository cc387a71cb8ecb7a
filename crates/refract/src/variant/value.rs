//! Type-erased storage for variant payloads

use std::any::Any;
use std::fmt;

/// A value a [`Variant`](super::Variant) can own.
///
/// Implemented for every `Clone + Send + Sync + 'static` type. Boxed values
/// must not become `Clone`: a `Box<dyn VariantValue>` would then match the
/// blanket implementation itself.
pub trait VariantValue: Any + Send + Sync {
    /// Deep copy behind a fresh box
    fn clone_value(&self) -> Box<dyn VariantValue>;

    /// Borrow as `Any`
    fn as_any(&self) -> &dyn Any;

    /// Mutably borrow as `Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Convert into a boxed `Any` for by-value extraction
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any + Clone + Send + Sync> VariantValue for T {
    fn clone_value(&self) -> Box<dyn VariantValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl fmt::Debug for dyn VariantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VariantValue")
    }
}
