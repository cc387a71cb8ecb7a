//! Registered items: properties, methods, constructors and destructors
//!
//! The registry stores item entries in generational arenas. Public handles
//! are `Copy` and hold the owning registry plus an [`ItemId`]; a handle whose
//! slot has been removed reports `is_valid() == false` and every accessor on
//! it fails softly.

use std::fmt;
use std::sync::Arc;

use super::metadata::{MetadataKey, MetadataTable};
use super::Registry;
use crate::error::ReflectError;
use crate::instance::Instance;
use crate::support::ItemId;
use crate::types::{Type, TypeIndex};
use crate::variant::Variant;

// ============================================================================
// Descriptive data
// ============================================================================

/// Access level of a member. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessLevel {
    /// Public member
    #[default]
    Public,
    /// Protected member
    Protected,
    /// Private member
    Private,
}

/// Parameter of a method or constructor
#[derive(Debug, Clone)]
pub struct ParameterInfo {
    /// Parameter name (may be empty)
    pub name: String,
    /// Parameter type
    pub ty: Type,
    /// Default value used when the argument is omitted
    pub default: Option<Variant>,
}

impl ParameterInfo {
    /// Parameter without a default value
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    /// Attach a default value
    pub fn with_default(mut self, value: Variant) -> Self {
        self.default = Some(value);
        self
    }
}

/// Whether `arguments` can call a member declared with `parameters`.
///
/// Types are compared positionally; parameters past the supplied arguments
/// must all have defaults.
pub(crate) fn parameters_accept(parameters: &[ParameterInfo], arguments: &[Type]) -> bool {
    if arguments.len() > parameters.len() {
        return false;
    }
    let positional = parameters
        .iter()
        .zip(arguments)
        .all(|(parameter, argument)| parameter.ty == *argument);
    positional && parameters[arguments.len()..].iter().all(|p| p.default.is_some())
}

/// Exact parameter type list equality (used for duplicate detection)
pub(crate) fn same_parameter_types(left: &[ParameterInfo], right: &[ParameterInfo]) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(l, r)| l.ty == r.ty)
}

/// Fill omitted trailing arguments from parameter defaults
fn complete_arguments(
    parameters: &[ParameterInfo],
    arguments: &[Variant],
) -> Result<Vec<Variant>, ReflectError> {
    if arguments.len() > parameters.len() {
        return Err(ReflectError::ArgumentCountMismatch {
            expected: parameters.len(),
            got: arguments.len(),
        });
    }

    let mut full = arguments.to_vec();
    for parameter in &parameters[arguments.len()..] {
        match &parameter.default {
            Some(default) => full.push(default.clone()),
            None => {
                return Err(ReflectError::ArgumentCountMismatch {
                    expected: parameters.len(),
                    got: arguments.len(),
                })
            }
        }
    }
    Ok(full)
}

// ============================================================================
// Accessor capabilities
// ============================================================================

/// Reads and writes a property value
pub trait PropertyAccessor: Send + Sync {
    /// Read the value from `instance` (ignored for static properties)
    fn get_value(&self, instance: &Instance<'_>) -> Option<Variant>;

    /// Write `value` into `instance`; returns false on failure
    fn set_value(&self, instance: &mut Instance<'_>, value: &Variant) -> bool;

    /// Whether writes are rejected
    fn is_readonly(&self) -> bool {
        false
    }
}

/// Invokes a method or free function
pub trait MethodInvoker: Send + Sync {
    /// Invoke with a complete argument list (defaults already filled in)
    fn invoke(&self, instance: &mut Instance<'_>, arguments: &[Variant]) -> Option<Variant>;
}

/// Creates an instance
pub trait ConstructorInvoker: Send + Sync {
    /// Invoke with a complete argument list (defaults already filled in)
    fn invoke(&self, arguments: &[Variant]) -> Option<Variant>;
}

/// Destroys an instance held by a variant
pub trait DestructorInvoker: Send + Sync {
    /// Destroy the held value, leaving the variant empty
    fn destroy(&self, value: &mut Variant) -> bool;
}

// ============================================================================
// Definitions handed to the registry
// ============================================================================

/// Everything needed to register a property
pub struct PropertyDefinition {
    /// Property name
    pub name: String,
    /// Access level
    pub access: AccessLevel,
    /// Static (class-level) property
    pub is_static: bool,
    /// Type of the value
    pub value_type: Type,
    /// Value accessor
    pub accessor: Arc<dyn PropertyAccessor>,
    /// Metadata pairs
    pub metadata: Vec<(MetadataKey, Variant)>,
}

/// Everything needed to register a method or free function
pub struct MethodDefinition {
    /// Method name
    pub name: String,
    /// Access level
    pub access: AccessLevel,
    /// Static method or free function
    pub is_static: bool,
    /// Parameters
    pub parameters: Vec<ParameterInfo>,
    /// Return type
    pub return_type: Type,
    /// Invoker
    pub invoker: Arc<dyn MethodInvoker>,
    /// Metadata pairs
    pub metadata: Vec<(MetadataKey, Variant)>,
}

/// Everything needed to register a constructor
pub struct ConstructorDefinition {
    /// Access level
    pub access: AccessLevel,
    /// Parameters
    pub parameters: Vec<ParameterInfo>,
    /// Type of the created value
    pub instantiated_type: Type,
    /// Invoker
    pub invoker: Arc<dyn ConstructorInvoker>,
    /// Metadata pairs
    pub metadata: Vec<(MetadataKey, Variant)>,
}

// ============================================================================
// Stored entries
// ============================================================================

pub(crate) struct ItemInfo {
    pub name: String,
    pub declaring: Option<TypeIndex>,
    pub access: AccessLevel,
    pub is_static: bool,
    pub metadata: MetadataTable,
    pub sequence: u64,
}

impl ItemInfo {
    pub(crate) fn new(
        name: String,
        declaring: Option<TypeIndex>,
        access: AccessLevel,
        is_static: bool,
        metadata: Vec<(MetadataKey, Variant)>,
        sequence: u64,
    ) -> Self {
        let mut table = MetadataTable::new();
        for (key, value) in metadata {
            table.insert(key, value);
        }
        Self {
            name,
            declaring,
            access,
            is_static,
            metadata: table,
            sequence,
        }
    }
}

pub(crate) struct PropertyEntry {
    pub info: ItemInfo,
    pub value_type: TypeIndex,
    pub accessor: Arc<dyn PropertyAccessor>,
}

pub(crate) struct MethodEntry {
    pub info: ItemInfo,
    pub parameters: Vec<ParameterInfo>,
    pub return_type: TypeIndex,
    pub invoker: Arc<dyn MethodInvoker>,
}

pub(crate) struct ConstructorEntry {
    pub info: ItemInfo,
    pub parameters: Vec<ParameterInfo>,
    pub instantiated_type: TypeIndex,
    pub invoker: Arc<dyn ConstructorInvoker>,
}

pub(crate) struct DestructorEntry {
    pub declaring: TypeIndex,
    pub invoker: Arc<dyn DestructorInvoker>,
    pub sequence: u64,
}

// ============================================================================
// Handles
// ============================================================================

macro_rules! item_handle {
    ($name:ident, $kind:literal) => {
        #[doc = concat!("Handle to a registered ", $kind)]
        #[derive(Clone, Copy)]
        pub struct $name {
            registry: &'static Registry,
            id: ItemId,
        }

        impl $name {
            pub(crate) fn new(registry: &'static Registry, id: ItemId) -> Self {
                Self { registry, id }
            }

            pub(crate) fn id(&self) -> ItemId {
                self.id
            }

            /// Registry owning the item
            pub fn registry(&self) -> &'static Registry {
                self.registry
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id && std::ptr::eq(self.registry, other.registry)
            }
        }

        impl Eq for $name {}
    };
}

item_handle!(Property, "property");
item_handle!(Method, "method");
item_handle!(Constructor, "constructor");
item_handle!(Destructor, "destructor");

impl Property {
    fn with_entry<R>(&self, default: R, f: impl FnOnce(&PropertyEntry) -> R) -> R {
        let state = self.registry.read();
        state.properties.get(self.id).map_or(default, f)
    }

    /// Whether the property still exists
    pub fn is_valid(&self) -> bool {
        self.with_entry(false, |_| true)
    }

    /// Property name
    pub fn name(&self) -> String {
        self.with_entry(String::new(), |entry| entry.info.name.clone())
    }

    /// Declaring type; `None` for global properties
    pub fn declaring_type(&self) -> Option<Type> {
        self.with_entry(None, |entry| entry.info.declaring)
            .map(|index| Type::new(self.registry, index))
    }

    /// Access level
    pub fn access_level(&self) -> AccessLevel {
        self.with_entry(AccessLevel::Public, |entry| entry.info.access)
    }

    /// Static property
    pub fn is_static(&self) -> bool {
        self.with_entry(false, |entry| entry.info.is_static)
    }

    /// Read-only property
    pub fn is_readonly(&self) -> bool {
        self.with_entry(true, |entry| entry.accessor.is_readonly())
    }

    /// Type of the value
    pub fn value_type(&self) -> Type {
        let index = self.with_entry(TypeIndex::INVALID, |entry| entry.value_type);
        Type::new(self.registry, index)
    }

    /// Metadata registered on the property
    pub fn metadata(&self, key: impl Into<MetadataKey>) -> Option<Variant> {
        let key = key.into();
        self.with_entry(None, |entry| entry.info.metadata.get(&key).cloned())
    }

    fn accessor(&self) -> Option<Arc<dyn PropertyAccessor>> {
        self.with_entry(None, |entry| Some(entry.accessor.clone()))
    }

    /// Read the value; an invalid variant on failure
    pub fn get_value(&self, instance: &Instance<'_>) -> Variant {
        self.accessor()
            .and_then(|accessor| accessor.get_value(instance))
            .unwrap_or_default()
    }

    /// Write the value; false on failure
    pub fn set_value(&self, instance: &mut Instance<'_>, value: &Variant) -> bool {
        self.try_set_value(instance, value).is_ok()
    }

    /// Write the value, reporting why it failed
    pub fn try_set_value(&self, instance: &mut Instance<'_>, value: &Variant) -> Result<(), ReflectError> {
        let accessor = self.accessor().ok_or(ReflectError::InvalidItem("property"))?;
        if accessor.is_readonly() {
            return Err(ReflectError::ReadOnlyProperty(self.name()));
        }
        if !value.is_valid() {
            return Err(ReflectError::InvalidArgument);
        }
        let value_type = self.value_type();
        if !value.can_convert_to(value_type) {
            return Err(ReflectError::ConversionFailed {
                from: value.get_type().map(|ty| ty.name()).unwrap_or_default(),
                to: value_type.name(),
            });
        }
        if accessor.set_value(instance, value) {
            Ok(())
        } else {
            Err(ReflectError::InvocationFailed(self.name()))
        }
    }
}

impl Method {
    fn with_entry<R>(&self, default: R, f: impl FnOnce(&MethodEntry) -> R) -> R {
        let state = self.registry.read();
        state.methods.get(self.id).map_or(default, f)
    }

    /// Whether the method still exists
    pub fn is_valid(&self) -> bool {
        self.with_entry(false, |_| true)
    }

    /// Method name
    pub fn name(&self) -> String {
        self.with_entry(String::new(), |entry| entry.info.name.clone())
    }

    /// Declaring type; `None` for free functions
    pub fn declaring_type(&self) -> Option<Type> {
        self.with_entry(None, |entry| entry.info.declaring)
            .map(|index| Type::new(self.registry, index))
    }

    /// Access level
    pub fn access_level(&self) -> AccessLevel {
        self.with_entry(AccessLevel::Public, |entry| entry.info.access)
    }

    /// Static method or free function
    pub fn is_static(&self) -> bool {
        self.with_entry(false, |entry| entry.info.is_static)
    }

    /// Declared parameters
    pub fn parameter_infos(&self) -> Vec<ParameterInfo> {
        self.with_entry(Vec::new(), |entry| entry.parameters.clone())
    }

    /// Return type
    pub fn return_type(&self) -> Type {
        let index = self.with_entry(TypeIndex::INVALID, |entry| entry.return_type);
        Type::new(self.registry, index)
    }

    /// `name(param, param)` using display names
    pub fn signature(&self) -> String {
        let parameters: Vec<String> = self
            .parameter_infos()
            .iter()
            .map(|parameter| parameter.ty.name())
            .collect();
        format!("{}({})", self.name(), parameters.join(", "))
    }

    /// Metadata registered on the method
    pub fn metadata(&self, key: impl Into<MetadataKey>) -> Option<Variant> {
        let key = key.into();
        self.with_entry(None, |entry| entry.info.metadata.get(&key).cloned())
    }

    /// Invoke; an invalid variant on failure
    pub fn invoke(&self, instance: &mut Instance<'_>, arguments: &[Variant]) -> Variant {
        self.try_invoke(instance, arguments).unwrap_or_default()
    }

    /// Invoke, reporting why the call failed
    pub fn try_invoke(
        &self,
        instance: &mut Instance<'_>,
        arguments: &[Variant],
    ) -> Result<Variant, ReflectError> {
        let (invoker, parameters, is_static) = self
            .with_entry(None, |entry| {
                Some((entry.invoker.clone(), entry.parameters.clone(), entry.info.is_static))
            })
            .ok_or(ReflectError::InvalidItem("method"))?;
        if !is_static && instance.is_empty() {
            return Err(ReflectError::InstanceMismatch {
                expected: self.declaring_type().map(|ty| ty.name()).unwrap_or_default(),
            });
        }
        let full = complete_arguments(&parameters, arguments)?;
        invoker
            .invoke(instance, &full)
            .ok_or_else(|| ReflectError::InvocationFailed(self.name()))
    }
}

impl Constructor {
    fn with_entry<R>(&self, default: R, f: impl FnOnce(&ConstructorEntry) -> R) -> R {
        let state = self.registry.read();
        state.constructors.get(self.id).map_or(default, f)
    }

    /// Whether the constructor still exists
    pub fn is_valid(&self) -> bool {
        self.with_entry(false, |_| true)
    }

    /// Declaring type
    pub fn declaring_type(&self) -> Option<Type> {
        self.with_entry(None, |entry| entry.info.declaring)
            .map(|index| Type::new(self.registry, index))
    }

    /// Type of the created value
    pub fn instantiated_type(&self) -> Type {
        let index = self.with_entry(TypeIndex::INVALID, |entry| entry.instantiated_type);
        Type::new(self.registry, index)
    }

    /// Access level
    pub fn access_level(&self) -> AccessLevel {
        self.with_entry(AccessLevel::Public, |entry| entry.info.access)
    }

    /// Declared parameters
    pub fn parameter_infos(&self) -> Vec<ParameterInfo> {
        self.with_entry(Vec::new(), |entry| entry.parameters.clone())
    }

    /// Metadata registered on the constructor
    pub fn metadata(&self, key: impl Into<MetadataKey>) -> Option<Variant> {
        let key = key.into();
        self.with_entry(None, |entry| entry.info.metadata.get(&key).cloned())
    }

    /// Create an instance; an invalid variant on failure
    pub fn invoke(&self, arguments: &[Variant]) -> Variant {
        self.try_invoke(arguments).unwrap_or_default()
    }

    /// Create an instance, reporting why it failed
    pub fn try_invoke(&self, arguments: &[Variant]) -> Result<Variant, ReflectError> {
        let (invoker, parameters) = self
            .with_entry(None, |entry| Some((entry.invoker.clone(), entry.parameters.clone())))
            .ok_or(ReflectError::InvalidItem("constructor"))?;
        let full = complete_arguments(&parameters, arguments)?;
        invoker
            .invoke(&full)
            .ok_or_else(|| ReflectError::InvocationFailed(self.instantiated_type().name()))
    }
}

impl Destructor {
    /// Whether the destructor still exists
    pub fn is_valid(&self) -> bool {
        self.registry.read().destructors.contains(self.id)
    }

    /// Declaring type
    pub fn declaring_type(&self) -> Option<Type> {
        let state = self.registry.read();
        state
            .destructors
            .get(self.id)
            .map(|entry| Type::new(self.registry, entry.declaring))
    }

    /// Destroy the value held by `value`
    pub fn invoke(&self, value: &mut Variant) -> bool {
        let invoker = {
            let state = self.registry.read();
            match state.destructors.get(self.id) {
                Some(entry) => entry.invoker.clone(),
                None => return false,
            }
        };
        invoker.destroy(value)
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Property({:?})", self.name())
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method({})", self.signature())
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constructor({})", self.instantiated_type().name())
    }
}

impl fmt::Debug for Destructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Destructor")
    }
}
