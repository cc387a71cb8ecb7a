//! Static type descriptors
//!
//! A [`TypeDescriptor`] is everything the registry needs to know about a
//! type the first time it is requested: its compiler-derived signature, its
//! static traits and links to related types (raw type, array element type,
//! wrapped type, generic arguments, base classes). Links are function
//! pointers so they are only followed when the registry builds the record.
//!
//! Smart pointers and standard containers also carry accessors
//! ([`WrapperInfo`], [`SequentialOps`], [`AssociativeOps`]) that reach the
//! values inside them without knowing their static type.

use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use super::traits::TypeTraits;
use crate::variant::VariantValue;

/// Lazily evaluated link to another descriptor
pub type DescriptorFn = fn() -> TypeDescriptor;

/// Up-cast from a derived value to one of its direct base values
pub type UpcastFn = fn(&dyn Any) -> Option<&dyn Any>;

/// Mutable up-cast from a derived value to one of its direct base values
pub type UpcastMutFn = fn(&mut dyn Any) -> Option<&mut dyn Any>;

/// Boxed copy of a value reached through a type-erased reference
pub type ExtractFn = fn(&dyn Any) -> Option<Box<dyn VariantValue>>;

/// Boxed key/value copies of an associative container's entries
pub type EntriesFn = fn(&dyn Any) -> Vec<(Box<dyn VariantValue>, Box<dyn VariantValue>)>;

/// Access to the value behind a smart pointer
#[derive(Clone, Copy)]
pub struct WrapperInfo {
    /// Descriptor of the wrapped type
    pub descriptor: DescriptorFn,
    /// Borrow the wrapped value
    pub unwrap: UpcastFn,
    /// Mutably borrow the wrapped value; `None` while it is shared
    pub unwrap_mut: UpcastMutFn,
    /// Copy the wrapped value out
    pub extract: ExtractFn,
}

impl fmt::Debug for WrapperInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapperInfo")
            .field("wrapped", &(self.descriptor)().signature)
            .finish()
    }
}

/// Element access of a sequential container
#[derive(Clone, Copy)]
pub struct SequentialOps {
    /// Number of elements
    pub len: fn(&dyn Any) -> Option<usize>,
    /// Copy of the element at an index
    pub get: fn(&dyn Any, usize) -> Option<Box<dyn VariantValue>>,
}

/// Entry access of an associative container
#[derive(Clone, Copy)]
pub struct AssociativeOps {
    /// Number of entries
    pub len: fn(&dyn Any) -> Option<usize>,
    /// Copies of every entry, in the container's iteration order
    pub entries: EntriesFn,
}

/// A direct base class edge
#[derive(Clone, Copy)]
pub struct BaseClassInfo {
    /// Descriptor of the base class
    pub descriptor: DescriptorFn,
    /// Borrow the base part of a derived value
    pub upcast: UpcastFn,
    /// Mutably borrow the base part of a derived value
    pub upcast_mut: UpcastMutFn,
}

impl fmt::Debug for BaseClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseClassInfo")
            .field("base", &(self.descriptor)().signature)
            .finish()
    }
}

/// Static description of a type
#[derive(Clone)]
pub struct TypeDescriptor {
    /// Compiler-derived (or hand-written) signature
    pub signature: Cow<'static, str>,
    /// Rust type id, when the type is a Rust type
    pub type_id: Option<TypeId>,
    /// Size in bytes
    pub size: usize,
    /// Number of pointer/reference indirections
    pub pointer_dimension: usize,
    /// Static traits
    pub traits: TypeTraits,
    /// Type with every pointer/reference stripped; `None` when this is the raw type
    pub raw_type: Option<DescriptorFn>,
    /// Element type of an array with every extent stripped
    pub array_raw_type: Option<DescriptorFn>,
    /// Type wrapped by a smart pointer
    pub wrapped_type: Option<DescriptorFn>,
    /// Generic arguments of a generic instantiation
    pub template_arguments: Vec<DescriptorFn>,
    /// Direct base classes
    pub base_classes: Vec<BaseClassInfo>,
    /// Accessors of a smart pointer
    pub wrapper: Option<WrapperInfo>,
    /// Accessors of a sequential container
    pub sequential: Option<SequentialOps>,
    /// Accessors of an associative container
    pub associative: Option<AssociativeOps>,
}

impl TypeDescriptor {
    /// Descriptor for a Rust type with the given traits
    pub fn of<T: Any>(traits: TypeTraits) -> Self {
        Self {
            signature: Cow::Borrowed(type_name::<T>()),
            type_id: Some(TypeId::of::<T>()),
            size: std::mem::size_of::<T>(),
            pointer_dimension: 0,
            traits,
            raw_type: None,
            array_raw_type: None,
            wrapped_type: None,
            template_arguments: Vec::new(),
            base_classes: Vec::new(),
            wrapper: None,
            sequential: None,
            associative: None,
        }
    }

    /// Descriptor for a type known only by its signature
    pub fn opaque(signature: impl Into<Cow<'static, str>>, size: usize) -> Self {
        Self {
            signature: signature.into(),
            type_id: None,
            size,
            pointer_dimension: 0,
            traits: TypeTraits::NONE,
            raw_type: None,
            array_raw_type: None,
            wrapped_type: None,
            template_arguments: Vec::new(),
            base_classes: Vec::new(),
            wrapper: None,
            sequential: None,
            associative: None,
        }
    }

    /// Set the static traits
    pub fn with_traits(mut self, traits: TypeTraits) -> Self {
        self.traits = traits;
        self
    }

    /// Set the pointer depth
    pub fn with_pointer_dimension(mut self, dimension: usize) -> Self {
        self.pointer_dimension = dimension;
        self
    }

    /// Link the raw type
    pub fn with_raw_type(mut self, raw: DescriptorFn) -> Self {
        self.raw_type = Some(raw);
        self
    }

    /// Link the array element type
    pub fn with_array_raw_type(mut self, raw: DescriptorFn) -> Self {
        self.array_raw_type = Some(raw);
        self
    }

    /// Link the wrapped type
    pub fn with_wrapped_type(mut self, wrapped: DescriptorFn) -> Self {
        self.wrapped_type = Some(wrapped);
        self
    }

    /// Add a generic argument
    pub fn with_template_argument(mut self, argument: DescriptorFn) -> Self {
        self.template_arguments.push(argument);
        self.traits |= TypeTraits::TEMPLATE_INSTANTIATION;
        self
    }

    /// Add a direct base class
    pub fn with_base(mut self, base: BaseClassInfo) -> Self {
        self.base_classes.push(base);
        self
    }

    /// Make this a smart pointer around `wrapper.descriptor`
    pub fn with_wrapper(mut self, wrapper: WrapperInfo) -> Self {
        self.wrapped_type = Some(wrapper.descriptor);
        self.wrapper = Some(wrapper);
        self
    }

    /// Attach element accessors
    pub fn with_sequential(mut self, ops: SequentialOps) -> Self {
        self.sequential = Some(ops);
        self
    }

    /// Attach entry accessors
    pub fn with_associative(mut self, ops: AssociativeOps) -> Self {
        self.associative = Some(ops);
        self
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("signature", &self.signature)
            .field("size", &self.size)
            .field("pointer_dimension", &self.pointer_dimension)
            .field("traits", &self.traits)
            .field("base_classes", &self.base_classes.len())
            .finish()
    }
}

/// A type that can be described to the registry
pub trait Reflect: Any {
    /// Static description of `Self`
    fn type_descriptor() -> TypeDescriptor;
}

/// An enumeration with an integral representation
pub trait ReflectEnum: Reflect + Clone + Send + Sync {
    /// Underlying integer type
    type Underlying: Reflect;

    /// Integral value of this enumerator
    fn to_underlying(&self) -> i128;
}

/// Descriptor of `T` with all pointer/reference levels stripped
pub fn raw_descriptor<T: Reflect>() -> TypeDescriptor {
    let descriptor = T::type_descriptor();
    match descriptor.raw_type {
        Some(raw) => raw(),
        None => descriptor,
    }
}

/// Descriptor of `T` with array extents and pointer levels stripped
pub fn array_raw_descriptor<T: Reflect>() -> TypeDescriptor {
    let descriptor = T::type_descriptor();
    if let Some(element) = descriptor.array_raw_type {
        return element();
    }
    match descriptor.raw_type {
        Some(raw) => raw(),
        None => descriptor,
    }
}

// ============================================================================
// Primitive implementations
// ============================================================================

macro_rules! impl_reflect_leaf {
    ($traits:expr => $($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn type_descriptor() -> TypeDescriptor {
                    TypeDescriptor::of::<$ty>($traits)
                }
            }
        )*
    };
}

impl_reflect_leaf!(TypeTraits::ARITHMETIC =>
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);
impl_reflect_leaf!(TypeTraits::CLASS => String);
impl_reflect_leaf!(TypeTraits::NONE => ());

impl Reflect for &'static str {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<&'static str>(TypeTraits::POINTER).with_pointer_dimension(1)
    }
}

// ============================================================================
// Pointers and references
// ============================================================================

fn pointer_descriptor<P: Any, T: Reflect>() -> TypeDescriptor {
    let inner = T::type_descriptor();
    TypeDescriptor::of::<P>(TypeTraits::POINTER)
        .with_pointer_dimension(inner.pointer_dimension + 1)
        .with_raw_type(raw_descriptor::<T>)
}

impl<T: Reflect> Reflect for *const T {
    fn type_descriptor() -> TypeDescriptor {
        pointer_descriptor::<*const T, T>()
    }
}

impl<T: Reflect> Reflect for *mut T {
    fn type_descriptor() -> TypeDescriptor {
        pointer_descriptor::<*mut T, T>()
    }
}

impl<T: Reflect> Reflect for &'static T {
    fn type_descriptor() -> TypeDescriptor {
        pointer_descriptor::<&'static T, T>()
    }
}

impl<T: Reflect> Reflect for &'static mut T {
    fn type_descriptor() -> TypeDescriptor {
        pointer_descriptor::<&'static mut T, T>()
    }
}

// ============================================================================
// Arrays and containers
// ============================================================================

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<[T; N]>(TypeTraits::ARRAY).with_array_raw_type(array_raw_descriptor::<T>)
    }
}

fn boxed<T: VariantValue + Clone>(value: &T) -> Box<dyn VariantValue> {
    Box::new(value.clone())
}

fn boxed_entries<'a, K, V>(
    entries: impl Iterator<Item = (&'a K, &'a V)>,
) -> Vec<(Box<dyn VariantValue>, Box<dyn VariantValue>)>
where
    K: VariantValue + Clone,
    V: VariantValue + Clone,
{
    entries.map(|(key, value)| (boxed(key), boxed(value))).collect()
}

impl<T: Reflect + Clone + Send + Sync> Reflect for Vec<T> {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Vec<T>>(TypeTraits::CLASS | TypeTraits::SEQUENTIAL_CONTAINER)
            .with_template_argument(T::type_descriptor)
            .with_sequential(SequentialOps {
                len: |value| value.downcast_ref::<Vec<T>>().map(Vec::len),
                get: |value, index| value.downcast_ref::<Vec<T>>()?.get(index).map(boxed),
            })
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<Option<T>>(TypeTraits::CLASS).with_template_argument(T::type_descriptor)
    }
}

macro_rules! impl_reflect_map {
    ($($map:ident),*) => {
        $(
            impl<K, V> Reflect for $map<K, V>
            where
                K: Reflect + Clone + Send + Sync,
                V: Reflect + Clone + Send + Sync,
            {
                fn type_descriptor() -> TypeDescriptor {
                    TypeDescriptor::of::<$map<K, V>>(TypeTraits::CLASS | TypeTraits::ASSOCIATIVE_CONTAINER)
                        .with_template_argument(K::type_descriptor)
                        .with_template_argument(V::type_descriptor)
                        .with_associative(AssociativeOps {
                            len: |value| value.downcast_ref::<$map<K, V>>().map($map::len),
                            entries: |value| match value.downcast_ref::<$map<K, V>>() {
                                Some(map) => boxed_entries(map.iter()),
                                None => Vec::new(),
                            },
                        })
                }
            }
        )*
    };
}

impl_reflect_map!(HashMap, BTreeMap);

// ============================================================================
// Wrappers
// ============================================================================

macro_rules! impl_reflect_wrapper {
    ($($wrapper:ident => |$inner:ident| $get_mut:expr),* $(,)?) => {
        $(
            impl<T: Reflect + Clone + Send + Sync> Reflect for $wrapper<T> {
                fn type_descriptor() -> TypeDescriptor {
                    TypeDescriptor::of::<$wrapper<T>>(TypeTraits::CLASS | TypeTraits::WRAPPER)
                        .with_wrapper(WrapperInfo {
                            descriptor: T::type_descriptor,
                            unwrap: |value| {
                                value.downcast_ref::<$wrapper<T>>().map(|w| &**w as &dyn Any)
                            },
                            unwrap_mut: |value| {
                                let $inner = value.downcast_mut::<$wrapper<T>>()?;
                                let inner: Option<&mut T> = $get_mut;
                                inner.map(|inner| inner as &mut dyn Any)
                            },
                            extract: |value| value.downcast_ref::<$wrapper<T>>().map(|w| boxed(&**w)),
                        })
                        .with_template_argument(T::type_descriptor)
                }
            }
        )*
    };
}

impl_reflect_wrapper!(
    Box => |pointer| Some(&mut **pointer),
    Rc => |pointer| Rc::get_mut(pointer),
    Arc => |pointer| Arc::get_mut(pointer),
);

// ============================================================================
// Function pointers
// ============================================================================

macro_rules! impl_reflect_fn {
    ($($arg:ident),*) => {
        impl<R: Reflect $(, $arg: Reflect)*> Reflect for fn($($arg),*) -> R {
            fn type_descriptor() -> TypeDescriptor {
                TypeDescriptor::of::<fn($($arg),*) -> R>(TypeTraits::FUNCTION_POINTER)
            }
        }
    };
}

impl_reflect_fn!();
impl_reflect_fn!(A);
impl_reflect_fn!(A, B);
impl_reflect_fn!(A, B, C);

// ============================================================================
// Declarative glue for user types
// ============================================================================

/// Implement [`Reflect`] for a struct, optionally declaring base classes.
///
/// A base class is named together with the field holding it:
///
/// ```ignore
/// struct Shape { id: u32 }
/// struct Circle { shape: Shape, radius: f64 }
///
/// refract::reflect_class!(Shape);
/// refract::reflect_class!(Circle: Shape => shape);
/// ```
#[macro_export]
macro_rules! reflect_class {
    ($ty:ty) => {
        impl $crate::Reflect for $ty {
            fn type_descriptor() -> $crate::TypeDescriptor {
                $crate::TypeDescriptor::of::<$ty>($crate::TypeTraits::CLASS)
            }
        }
    };
    ($ty:ty : $($base:ty => $($field:ident).+),+ $(,)?) => {
        impl $crate::Reflect for $ty {
            fn type_descriptor() -> $crate::TypeDescriptor {
                $crate::TypeDescriptor::of::<$ty>($crate::TypeTraits::CLASS)
                    $(
                        .with_base($crate::BaseClassInfo {
                            descriptor: <$base as $crate::Reflect>::type_descriptor,
                            upcast: |value| {
                                value
                                    .downcast_ref::<$ty>()
                                    .map(|this| &this.$($field).+ as &dyn ::std::any::Any)
                            },
                            upcast_mut: |value| {
                                value
                                    .downcast_mut::<$ty>()
                                    .map(|this| &mut this.$($field).+ as &mut dyn ::std::any::Any)
                            },
                        })
                    )+
            }
        }
    };
}

/// Implement [`Reflect`] and [`ReflectEnum`] for a field-less enum.
///
/// ```ignore
/// #[derive(Clone, Copy, PartialEq)]
/// enum Color { Red, Green, Blue }
///
/// refract::reflect_enum!(Color as i32);
/// ```
#[macro_export]
macro_rules! reflect_enum {
    ($ty:ty as $repr:ty) => {
        impl $crate::Reflect for $ty {
            fn type_descriptor() -> $crate::TypeDescriptor {
                $crate::TypeDescriptor::of::<$ty>($crate::TypeTraits::ENUM)
            }
        }

        impl $crate::ReflectEnum for $ty {
            type Underlying = $repr;

            fn to_underlying(&self) -> i128 {
                (*self as $repr) as i128
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_descriptor_links_raw_type() {
        let descriptor = <*const *const i32>::type_descriptor();
        assert_eq!(descriptor.pointer_dimension, 2);
        assert!(descriptor.traits.contains(TypeTraits::POINTER));

        let raw = (descriptor.raw_type.expect("raw link"))();
        assert_eq!(raw.signature, "i32");
        assert!(raw.raw_type.is_none());
    }

    #[test]
    fn test_array_descriptor_links_element() {
        let descriptor = <[[u8; 2]; 3]>::type_descriptor();
        assert!(descriptor.traits.contains(TypeTraits::ARRAY));
        let element = (descriptor.array_raw_type.expect("element link"))();
        assert_eq!(element.signature, "u8");
    }

    #[test]
    fn test_wrapper_descriptor() {
        let descriptor = <Arc<String>>::type_descriptor();
        assert!(descriptor.traits.contains(TypeTraits::WRAPPER));
        assert!(descriptor.traits.contains(TypeTraits::TEMPLATE_INSTANTIATION));
        let wrapped = (descriptor.wrapped_type.expect("wrapped link"))();
        assert_eq!(wrapped.signature, "alloc::string::String");
    }

    struct Base {
        value: i32,
    }

    struct Derived {
        base: Base,
    }

    reflect_class!(Base);
    reflect_class!(Derived: Base => base);

    #[test]
    fn test_class_macro_upcasts() {
        let descriptor = Derived::type_descriptor();
        assert_eq!(descriptor.base_classes.len(), 1);

        let derived = Derived {
            base: Base { value: 7 },
        };
        let base = (descriptor.base_classes[0].upcast)(&derived)
            .and_then(|any| any.downcast_ref::<Base>())
            .expect("upcast");
        assert_eq!(base.value, 7);
    }
}
