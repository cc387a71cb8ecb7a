//! Type identity
//!
//! A [`Type`] is a cheap, copyable handle to a record owned by a
//! [`Registry`]. Two handles denote the same runtime type iff they point to
//! the same registry and carry the same index; no string comparison happens
//! after registration.

mod descriptor;
mod name;
mod traits;

pub use descriptor::{
    array_raw_descriptor, raw_descriptor, AssociativeOps, BaseClassInfo, DescriptorFn, EntriesFn,
    ExtractFn, Reflect, ReflectEnum, SequentialOps, TypeDescriptor, UpcastFn, UpcastMutFn,
    WrapperInfo,
};
pub use name::{normalize_signature, remove_whitespace, replace_raw_name, template_instance_name};
pub use traits::TypeTraits;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::ReflectError;
use crate::registry::{
    Constructor, Destructor, Enumeration, Filter, MetadataKey, Method, Property, Registry,
    TypeData,
};
use crate::variant::Variant;

/// Numeric identity of a type record. Index 0 is reserved for "invalid".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TypeIndex(pub(crate) u32);

impl TypeIndex {
    /// The reserved invalid index
    pub const INVALID: TypeIndex = TypeIndex(0);

    /// Raw numeric value
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Whether this is the reserved invalid index
    pub fn is_invalid(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a registered type
#[derive(Clone, Copy)]
pub struct Type {
    registry: &'static Registry,
    index: TypeIndex,
}

impl Type {
    pub(crate) fn new(registry: &'static Registry, index: TypeIndex) -> Self {
        Self { registry, index }
    }

    /// Register (or look up) `T` in the process-wide registry
    pub fn of<T: Reflect>() -> Type {
        Registry::global().type_of::<T>()
    }

    /// Look up a type by display name in the process-wide registry
    pub fn get_by_name(name: &str) -> Option<Type> {
        Registry::global().get_by_name(name)
    }

    /// Every live type of the process-wide registry, in registration order
    pub fn get_types() -> Vec<Type> {
        Registry::global().types()
    }

    /// Global property of the process-wide registry
    pub fn global_property(name: &str) -> Option<Property> {
        Registry::global().global_property(name)
    }

    /// Global method of the process-wide registry matching `arguments`
    pub fn global_method(name: &str, arguments: &[Type]) -> Option<Method> {
        Registry::global().global_method(name, arguments)
    }

    /// Registry owning this type
    pub fn registry(&self) -> &'static Registry {
        self.registry
    }

    /// Numeric identity
    pub fn index(&self) -> TypeIndex {
        self.index
    }

    /// Numeric identity as an integer
    pub fn id(&self) -> u32 {
        self.index.0
    }

    /// Whether the record still exists (it is removed when its library unloads)
    pub fn is_valid(&self) -> bool {
        self.registry.read().type_data(self.index).is_some()
    }

    fn with_data<R>(&self, default: R, f: impl FnOnce(&TypeData) -> R) -> R {
        let state = self.registry.read();
        match state.type_data(self.index) {
            Some(data) => f(data),
            None => default,
        }
    }

    fn handle(&self, index: TypeIndex) -> Type {
        Type::new(self.registry, index)
    }

    fn handles(&self, indices: &[TypeIndex]) -> Vec<Type> {
        indices.iter().map(|index| self.handle(*index)).collect()
    }

    // ========================================================================
    // Names and static attributes
    // ========================================================================

    /// Display name (custom name, or derived from related types' names)
    pub fn name(&self) -> String {
        self.with_data(String::new(), |data| data.name.clone())
    }

    /// Canonical normalized signature
    pub fn signature(&self) -> String {
        self.with_data(String::new(), |data| data.signature.clone())
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.with_data(0, |data| data.size)
    }

    /// Number of pointer/reference indirections
    pub fn pointer_dimension(&self) -> usize {
        self.with_data(0, |data| data.pointer_dimension)
    }

    /// Static traits
    pub fn traits(&self) -> TypeTraits {
        self.with_data(TypeTraits::NONE, |data| data.traits)
    }

    /// Struct/class-like type
    pub fn is_class(&self) -> bool {
        self.traits().contains(TypeTraits::CLASS)
    }

    /// Enumeration type
    pub fn is_enumeration(&self) -> bool {
        self.traits().contains(TypeTraits::ENUM)
    }

    /// Fixed-size array type
    pub fn is_array(&self) -> bool {
        self.traits().contains(TypeTraits::ARRAY)
    }

    /// Pointer or reference type
    pub fn is_pointer(&self) -> bool {
        self.traits().contains(TypeTraits::POINTER)
    }

    /// Arithmetic type
    pub fn is_arithmetic(&self) -> bool {
        self.traits().contains(TypeTraits::ARITHMETIC)
    }

    /// Function pointer type
    pub fn is_function_pointer(&self) -> bool {
        self.traits().contains(TypeTraits::FUNCTION_POINTER)
    }

    /// Member pointer type
    pub fn is_member_pointer(&self) -> bool {
        self.traits().contains(TypeTraits::MEMBER_POINTER)
    }

    /// Key/value container
    pub fn is_associative_container(&self) -> bool {
        self.traits().contains(TypeTraits::ASSOCIATIVE_CONTAINER)
    }

    /// Dynamically sized sequence
    pub fn is_sequential_container(&self) -> bool {
        self.traits().contains(TypeTraits::SEQUENTIAL_CONTAINER)
    }

    /// Smart-pointer-like wrapper
    pub fn is_wrapper(&self) -> bool {
        self.traits().contains(TypeTraits::WRAPPER)
    }

    /// Generic instantiation
    pub fn is_template_instantiation(&self) -> bool {
        self.traits().contains(TypeTraits::TEMPLATE_INSTANTIATION)
    }

    // ========================================================================
    // Related types
    // ========================================================================

    /// Type with every pointer/reference stripped (itself for raw types)
    pub fn raw_type(&self) -> Type {
        self.with_data(*self, |data| self.handle(data.raw_type))
    }

    /// Whether this type is its own raw type
    pub fn is_raw(&self) -> bool {
        self.raw_type() == *self
    }

    /// Array element type with every extent stripped
    pub fn array_raw_type(&self) -> Option<Type> {
        self.with_data(None, |data| data.array_raw_type.map(|index| self.handle(index)))
    }

    /// Type wrapped by this smart pointer
    pub fn wrapped_type(&self) -> Option<Type> {
        self.with_data(None, |data| data.wrapped_type.map(|index| self.handle(index)))
    }

    /// Generic arguments
    pub fn template_arguments(&self) -> Vec<Type> {
        self.with_data(Vec::new(), |data| self.handles(&data.template_arguments))
    }

    // ========================================================================
    // Inheritance
    // ========================================================================

    /// Every ancestor class, ordered by identity
    pub fn base_classes(&self) -> Vec<Type> {
        self.with_data(Vec::new(), |data| self.handles(&data.class.base_types))
    }

    /// Every descendant class, in registration order
    pub fn derived_classes(&self) -> Vec<Type> {
        self.with_data(Vec::new(), |data| self.handles(&data.class.derived_types))
    }

    /// `self` is `other` or one of its descendants
    pub fn is_derived_from(&self, other: Type) -> bool {
        if *self == other {
            return true;
        }
        self.with_data(false, |data| data.class.base_types.contains(&other.index))
    }

    /// `self` is `other` or one of its ancestors
    pub fn is_base_of(&self, other: Type) -> bool {
        other.is_derived_from(*self)
    }

    pub(crate) fn direct_bases(&self) -> Vec<BaseClassInfo> {
        self.with_data(Vec::new(), |data| {
            data.class.direct_bases.iter().map(|(_, info)| *info).collect()
        })
    }

    pub(crate) fn wrapper_info(&self) -> Option<WrapperInfo> {
        self.with_data(None, |data| data.wrapper)
    }

    pub(crate) fn sequential_ops(&self) -> Option<SequentialOps> {
        self.with_data(None, |data| data.sequential)
    }

    pub(crate) fn associative_ops(&self) -> Option<AssociativeOps> {
        self.with_data(None, |data| data.associative)
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// Every visible property (inherited first, then own)
    pub fn properties(&self) -> Vec<Property> {
        self.properties_filtered(Filter::default())
    }

    /// Visible properties matching `filter`
    pub fn properties_filtered(&self, filter: Filter) -> Vec<Property> {
        self.registry.read().class_properties(self.index, filter)
            .into_iter()
            .map(|id| Property::new(self.registry, id))
            .collect()
    }

    /// First visible property named `name`
    pub fn property(&self, name: &str) -> Option<Property> {
        self.registry
            .read()
            .find_class_property(self.index, name)
            .map(|id| Property::new(self.registry, id))
    }

    /// Every visible method (inherited first, then own)
    pub fn methods(&self) -> Vec<Method> {
        self.methods_filtered(Filter::default())
    }

    /// Visible methods matching `filter`
    pub fn methods_filtered(&self, filter: Filter) -> Vec<Method> {
        self.registry.read().class_methods(self.index, filter)
            .into_iter()
            .map(|id| Method::new(self.registry, id))
            .collect()
    }

    /// First visible method named `name`
    pub fn method(&self, name: &str) -> Option<Method> {
        self.registry
            .read()
            .find_class_method(self.index, name, None)
            .map(|id| Method::new(self.registry, id))
    }

    /// Visible method named `name` accepting `arguments`
    pub fn method_with_args(&self, name: &str, arguments: &[Type]) -> Option<Method> {
        self.registry
            .read()
            .find_class_method(self.index, name, Some(arguments))
            .map(|id| Method::new(self.registry, id))
    }

    /// Registered constructors
    pub fn constructors(&self) -> Vec<Constructor> {
        self.with_data(Vec::new(), |data| {
            data.class
                .constructors
                .iter()
                .map(|id| Constructor::new(self.registry, *id))
                .collect()
        })
    }

    /// Constructor accepting `arguments`
    pub fn constructor(&self, arguments: &[Type]) -> Option<Constructor> {
        self.registry
            .read()
            .find_constructor(self.index, arguments)
            .map(|id| Constructor::new(self.registry, id))
    }

    /// Registered destructor
    pub fn destructor(&self) -> Option<Destructor> {
        self.with_data(None, |data| {
            data.class.destructor.map(|id| Destructor::new(self.registry, id))
        })
    }

    /// Enumeration description, for registered enums
    pub fn enumeration(&self) -> Option<Enumeration> {
        self.with_data(None, |data| {
            data.enumeration.clone().map(|data| Enumeration::new(*self, data))
        })
    }

    /// Metadata registered on the type
    pub fn metadata(&self, key: impl Into<MetadataKey>) -> Option<Variant> {
        let key = key.into();
        self.with_data(None, |data| data.metadata.get(&key).cloned())
    }

    // ========================================================================
    // Object lifecycle
    // ========================================================================

    /// Create an instance with the first constructor accepting `arguments`.
    ///
    /// Returns an invalid variant when no constructor matches.
    pub fn create(&self, arguments: &[Variant]) -> Variant {
        self.try_create(arguments).unwrap_or_default()
    }

    /// Create an instance, reporting why creation failed
    pub fn try_create(&self, arguments: &[Variant]) -> Result<Variant, ReflectError> {
        if !self.is_valid() {
            return Err(ReflectError::InvalidType(self.id()));
        }
        let argument_types = arguments
            .iter()
            .map(Variant::get_type)
            .collect::<Option<Vec<Type>>>()
            .ok_or(ReflectError::InvalidArgument)?;
        let constructor = self
            .constructor(&argument_types)
            .ok_or_else(|| ReflectError::NoMatchingConstructor(self.name()))?;
        constructor.try_invoke(arguments)
    }

    /// Destroy the value held by `value` with the registered destructor
    pub fn destroy(&self, value: &mut Variant) -> bool {
        match self.destructor() {
            Some(destructor) => destructor.invoke(value),
            None => false,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && std::ptr::eq(self.registry, other.registry)
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl PartialOrd for Type {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Type {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({}, {:?})", self.index.0, self.name())
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
