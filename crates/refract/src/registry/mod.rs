//! Type registry
//!
//! The registry owns every type record, every registered member and the
//! conversion graph. All of it sits behind a single `RwLock`: registration
//! and deregistration take the write lock, queries take the read lock. User
//! callbacks (accessors, converters, comparators) are cloned out of the
//! registry and run after the lock is released, so they may freely query the
//! registry themselves.
//!
//! # Identity
//!
//! Type identities are assigned in registration order and never reused. A
//! record removed by a library unload leaves its slot empty, so stale
//! [`Type`] handles report `is_valid() == false` instead of aliasing a newer
//! type.

mod class_data;
mod enumeration;
mod filter;
mod items;
mod metadata;
mod transaction;

pub use enumeration::{Enumeration, EnumerationData};
pub use filter::Filter;
pub use items::{
    AccessLevel, Constructor, ConstructorDefinition, ConstructorInvoker, Destructor,
    DestructorInvoker, Method, MethodDefinition, MethodInvoker, ParameterInfo, Property,
    PropertyAccessor, PropertyDefinition,
};
pub use metadata::{MetadataKey, MetadataTable};
pub use transaction::RegistrationTransaction;
pub(crate) use transaction::SequenceRange;

pub(crate) use class_data::ClassData;

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rustc_hash::FxHashMap;

use crate::convert::{ComparatorFn, ComparatorKind, ConversionGraph, ConverterFn};
use crate::library::LibraryManager;
use crate::support::{Arena, FlatMap, FlatMultiMap, ItemId};
use crate::types::{
    normalize_signature, replace_raw_name, template_instance_name, AssociativeOps, BaseClassInfo,
    Reflect, SequentialOps, Type, TypeDescriptor, TypeIndex, TypeTraits, WrapperInfo,
};
use crate::variant::Variant;
use items::{
    parameters_accept, same_parameter_types, ConstructorEntry, DestructorEntry, ItemInfo,
    MethodEntry, PropertyEntry,
};
use transaction::{Captured, MemberKey};

// ============================================================================
// Stored records
// ============================================================================

/// Per-type record
pub(crate) struct TypeData {
    pub signature: String,
    pub name: String,
    pub custom_name: Option<String>,
    pub type_id: Option<TypeId>,
    pub size: usize,
    pub pointer_dimension: usize,
    pub traits: TypeTraits,
    pub raw_type: TypeIndex,
    pub array_raw_type: Option<TypeIndex>,
    pub wrapped_type: Option<TypeIndex>,
    pub template_arguments: Vec<TypeIndex>,
    pub wrapper: Option<WrapperInfo>,
    pub sequential: Option<SequentialOps>,
    pub associative: Option<AssociativeOps>,
    pub class: ClassData,
    pub enumeration: Option<Arc<EnumerationData>>,
    pub enumeration_sequence: u64,
    pub metadata: MetadataTable,
    pub sequence: u64,
}

/// Related types resolved before a record is allocated
struct RelatedTypes {
    raw: Option<TypeIndex>,
    array_raw: Option<TypeIndex>,
    wrapped: Option<TypeIndex>,
    template_arguments: Vec<TypeIndex>,
    bases: Vec<(TypeIndex, BaseClassInfo)>,
}

/// Everything guarded by the registry lock
pub(crate) struct RegistryState {
    /// Records indexed by identity; slot 0 is the invalid type
    types: Vec<Option<TypeData>>,
    /// Live identities in registration order
    type_order: Vec<TypeIndex>,
    by_signature: FlatMap<String, TypeIndex>,
    by_name: FlatMap<String, TypeIndex>,
    by_type_id: FxHashMap<TypeId, TypeIndex>,

    pub(crate) properties: Arena<PropertyEntry>,
    pub(crate) methods: Arena<MethodEntry>,
    pub(crate) constructors: Arena<ConstructorEntry>,
    pub(crate) destructors: Arena<DestructorEntry>,

    global_properties: FlatMultiMap<String, ItemId>,
    global_methods: FlatMultiMap<String, ItemId>,
    global_property_order: Vec<ItemId>,
    global_method_order: Vec<ItemId>,

    conversions: ConversionGraph,

    /// Last registration sequence number handed out
    sequence: u64,
}

impl RegistryState {
    fn new() -> Self {
        Self {
            types: vec![None],
            type_order: Vec::new(),
            by_signature: FlatMap::new(),
            by_name: FlatMap::new(),
            by_type_id: FxHashMap::default(),
            properties: Arena::new(),
            methods: Arena::new(),
            constructors: Arena::new(),
            destructors: Arena::new(),
            global_properties: FlatMultiMap::new(),
            global_methods: FlatMultiMap::new(),
            global_property_order: Vec::new(),
            global_method_order: Vec::new(),
            conversions: ConversionGraph::default(),
            sequence: 0,
        }
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn type_data(&self, index: TypeIndex) -> Option<&TypeData> {
        self.types.get(index.slot()).and_then(Option::as_ref)
    }

    pub(crate) fn type_data_mut(&mut self, index: TypeIndex) -> Option<&mut TypeData> {
        self.types.get_mut(index.slot()).and_then(Option::as_mut)
    }

    // ========================================================================
    // Type records
    // ========================================================================

    fn find_descriptor(&self, descriptor: &TypeDescriptor) -> Option<TypeIndex> {
        if let Some(index) = descriptor.type_id.and_then(|id| self.by_type_id.get(&id)) {
            return Some(*index);
        }
        self.by_signature
            .get(normalize_signature(&descriptor.signature).as_str())
            .copied()
    }

    fn insert_type(&mut self, descriptor: TypeDescriptor, related: RelatedTypes) -> TypeIndex {
        let signature = normalize_signature(&descriptor.signature);
        if let Some(existing) = self.find_descriptor(&descriptor) {
            // same signature reached through a different type id
            if let Some(id) = descriptor.type_id {
                self.by_type_id.entry(id).or_insert(existing);
            }
            return existing;
        }

        let index = TypeIndex(self.types.len() as u32);
        let sequence = self.next_sequence();
        self.types.push(Some(TypeData {
            signature: signature.clone(),
            name: signature.clone(),
            custom_name: None,
            type_id: descriptor.type_id,
            size: descriptor.size,
            pointer_dimension: descriptor.pointer_dimension,
            traits: descriptor.traits,
            raw_type: related.raw.unwrap_or(index),
            array_raw_type: related.array_raw,
            wrapped_type: related.wrapped,
            template_arguments: related.template_arguments,
            wrapper: descriptor.wrapper,
            sequential: descriptor.sequential,
            associative: descriptor.associative,
            class: ClassData::default(),
            enumeration: None,
            enumeration_sequence: 0,
            metadata: MetadataTable::new(),
            sequence,
        }));
        self.type_order.push(index);
        self.by_signature.insert(signature.clone(), index);
        if let Some(id) = descriptor.type_id {
            self.by_type_id.insert(id, index);
        }

        let name = self.derive_name(index);
        if let Some(data) = self.type_data_mut(index) {
            data.name = name.clone();
        }
        self.by_name.insert(name, index);

        self.link_bases(index, related.bases);
        log::trace!("Registered type '{}' as {}", signature, index.0);
        index
    }

    /// Display name of `index` from its custom name or its related types' names
    fn derive_name(&self, index: TypeIndex) -> String {
        let Some(data) = self.type_data(index) else {
            return String::new();
        };
        if let Some(custom) = &data.custom_name {
            return custom.clone();
        }

        let mut name = data.signature.clone();
        for related in [Some(data.raw_type), data.array_raw_type].into_iter().flatten() {
            if related == index {
                continue;
            }
            if let Some(related) = self.type_data(related) {
                if related.name != related.signature {
                    name = replace_raw_name(&name, &related.signature, &related.name);
                }
            }
        }

        if !data.template_arguments.is_empty() {
            let arguments: Vec<String> = data
                .template_arguments
                .iter()
                .filter_map(|argument| self.type_data(*argument))
                .map(|argument| argument.name.clone())
                .collect();
            if let Some(rebuilt) = template_instance_name(&name, &arguments) {
                name = rebuilt;
            }
        }
        name
    }

    fn set_custom_name(&mut self, index: TypeIndex, name: String) -> bool {
        let Some(data) = self.type_data_mut(index) else {
            return false;
        };
        log::debug!("Renaming type '{}' to '{}'", data.signature, name);
        data.custom_name = Some(name);
        self.refresh_names();
        true
    }

    /// Re-derive every display name.
    ///
    /// Registration order is dependency order (raw, element and argument
    /// types are registered before the types built from them), so a single
    /// pass sees every dependency's final name.
    fn refresh_names(&mut self) {
        for index in self.type_order.clone() {
            let derived = self.derive_name(index);
            let Some(data) = self.type_data_mut(index) else {
                continue;
            };
            if data.name == derived {
                continue;
            }
            let previous = std::mem::replace(&mut data.name, derived.clone());
            if self.by_name.get(previous.as_str()) == Some(&index) {
                self.by_name.remove(previous.as_str());
            }
            self.by_name.insert(derived, index);
        }
    }

    fn remove_type(&mut self, index: TypeIndex) -> bool {
        let Some(data) = self.types.get_mut(index.slot()).and_then(Option::take) else {
            return false;
        };

        if self.by_signature.get(data.signature.as_str()) == Some(&index) {
            self.by_signature.remove(data.signature.as_str());
        }
        if self.by_name.get(data.name.as_str()) == Some(&index) {
            self.by_name.remove(data.name.as_str());
        }
        self.by_type_id.retain(|_, mapped| *mapped != index);
        self.type_order.retain(|live| *live != index);

        for base in &data.class.base_types {
            if let Some(base) = self.type_data_mut(*base) {
                base.class.derived_types.retain(|derived| *derived != index);
            }
        }
        for derived in &data.class.derived_types {
            if let Some(derived) = self.type_data_mut(*derived) {
                derived.class.base_types.retain(|base| *base != index);
                derived.class.direct_bases.retain(|(base, _)| *base != index);
            }
        }

        for id in &data.class.properties {
            if self.properties.get(*id).is_some_and(|e| e.info.declaring == Some(index)) {
                self.properties.remove(*id);
            }
        }
        for id in &data.class.methods {
            if self.methods.get(*id).is_some_and(|e| e.info.declaring == Some(index)) {
                self.methods.remove(*id);
            }
        }
        for id in &data.class.constructors {
            self.constructors.remove(*id);
        }
        if let Some(id) = data.class.destructor {
            self.destructors.remove(id);
        }
        self.conversions.remove_type(index);

        for derived in &data.class.derived_types {
            self.refresh_members(*derived);
        }

        log::debug!("Unregistered type '{}' ({})", data.name, index.0);
        true
    }

    // ========================================================================
    // Members
    // ========================================================================

    fn add_property(&mut self, declaring: Option<TypeIndex>, definition: PropertyDefinition) -> Option<ItemId> {
        let PropertyDefinition {
            name,
            access,
            is_static,
            value_type,
            accessor,
            metadata,
        } = definition;

        let duplicate = match declaring {
            Some(owner) => self.type_data(owner)?.class.properties.iter().any(|id| {
                self.properties.get(*id).is_some_and(|entry| {
                    entry.info.declaring == Some(owner)
                        && entry.info.name == name
                        && entry.info.is_static == is_static
                })
            }),
            None => self.global_properties.find(name.as_str()).next().is_some(),
        };
        if duplicate {
            log::debug!("Ignoring duplicate property '{}'", name);
            return None;
        }

        let sequence = self.next_sequence();
        let id = self.properties.insert(PropertyEntry {
            info: ItemInfo::new(name.clone(), declaring, access, is_static, metadata, sequence),
            value_type: value_type.index(),
            accessor,
        });

        match declaring {
            Some(owner) => {
                if let Some(data) = self.type_data_mut(owner) {
                    data.class.properties.push(id);
                }
                self.refresh_members(owner);
            }
            None => {
                self.global_properties.insert(name, id);
                self.global_property_order.push(id);
            }
        }
        Some(id)
    }

    fn add_method(&mut self, declaring: Option<TypeIndex>, definition: MethodDefinition) -> Option<ItemId> {
        let MethodDefinition {
            name,
            access,
            is_static,
            parameters,
            return_type,
            invoker,
            metadata,
        } = definition;

        let same = |entry: &MethodEntry| {
            entry.info.name == name
                && entry.info.is_static == is_static
                && same_parameter_types(&entry.parameters, &parameters)
        };
        let duplicate = match declaring {
            Some(owner) => self.type_data(owner)?.class.methods.iter().any(|id| {
                self.methods
                    .get(*id)
                    .is_some_and(|entry| entry.info.declaring == Some(owner) && same(entry))
            }),
            None => self
                .global_methods
                .find(name.as_str())
                .any(|id| self.methods.get(*id).is_some_and(same)),
        };
        if duplicate {
            log::debug!("Ignoring duplicate method '{}'", name);
            return None;
        }

        let sequence = self.next_sequence();
        let id = self.methods.insert(MethodEntry {
            info: ItemInfo::new(name.clone(), declaring, access, is_static, metadata, sequence),
            parameters,
            return_type: return_type.index(),
            invoker,
        });

        match declaring {
            Some(owner) => {
                if let Some(data) = self.type_data_mut(owner) {
                    data.class.methods.push(id);
                }
                self.refresh_members(owner);
            }
            None => {
                self.global_methods.insert(name, id);
                self.global_method_order.push(id);
            }
        }
        Some(id)
    }

    fn add_constructor(&mut self, owner: TypeIndex, definition: ConstructorDefinition) -> Option<ItemId> {
        let duplicate = self.type_data(owner)?.class.constructors.iter().any(|id| {
            self.constructors
                .get(*id)
                .is_some_and(|entry| same_parameter_types(&entry.parameters, &definition.parameters))
        });
        if duplicate {
            return None;
        }

        let sequence = self.next_sequence();
        let id = self.constructors.insert(ConstructorEntry {
            info: ItemInfo::new(
                String::new(),
                Some(owner),
                definition.access,
                true,
                definition.metadata,
                sequence,
            ),
            parameters: definition.parameters,
            instantiated_type: definition.instantiated_type.index(),
            invoker: definition.invoker,
        });
        if let Some(data) = self.type_data_mut(owner) {
            data.class.constructors.push(id);
        }
        Some(id)
    }

    fn add_destructor(&mut self, owner: TypeIndex, invoker: Arc<dyn DestructorInvoker>) -> Option<ItemId> {
        if self.type_data(owner)?.class.destructor.is_some() {
            return None;
        }
        let sequence = self.next_sequence();
        let id = self.destructors.insert(DestructorEntry {
            declaring: owner,
            invoker,
            sequence,
        });
        if let Some(data) = self.type_data_mut(owner) {
            data.class.destructor = Some(id);
        }
        Some(id)
    }

    fn add_enumeration(&mut self, owner: TypeIndex, enumeration: EnumerationData) -> bool {
        let sequence = self.sequence + 1;
        let Some(data) = self.type_data_mut(owner) else {
            return false;
        };
        if data.enumeration.is_some() {
            return false;
        }
        data.enumeration = Some(Arc::new(enumeration));
        data.enumeration_sequence = sequence;
        self.sequence = sequence;
        true
    }

    fn remove_property(&mut self, id: ItemId) -> bool {
        let Some(entry) = self.properties.remove(id) else {
            return false;
        };
        match entry.info.declaring {
            Some(owner) => {
                if let Some(data) = self.type_data_mut(owner) {
                    data.class.properties.retain(|item| *item != id);
                }
                self.refresh_members(owner);
            }
            None => {
                self.global_properties.remove_if(entry.info.name.as_str(), |item| *item == id);
                self.global_property_order.retain(|item| *item != id);
            }
        }
        true
    }

    fn remove_method(&mut self, id: ItemId) -> bool {
        let Some(entry) = self.methods.remove(id) else {
            return false;
        };
        match entry.info.declaring {
            Some(owner) => {
                if let Some(data) = self.type_data_mut(owner) {
                    data.class.methods.retain(|item| *item != id);
                }
                self.refresh_members(owner);
            }
            None => {
                self.global_methods.remove_if(entry.info.name.as_str(), |item| *item == id);
                self.global_method_order.retain(|item| *item != id);
            }
        }
        true
    }

    fn remove_constructor(&mut self, id: ItemId) -> bool {
        let Some(entry) = self.constructors.remove(id) else {
            return false;
        };
        if let Some(data) = entry.info.declaring.and_then(|owner| self.type_data_mut(owner)) {
            data.class.constructors.retain(|item| *item != id);
        }
        true
    }

    fn remove_destructor(&mut self, id: ItemId) -> bool {
        let Some(entry) = self.destructors.remove(id) else {
            return false;
        };
        if let Some(data) = self.type_data_mut(entry.declaring) {
            if data.class.destructor == Some(id) {
                data.class.destructor = None;
            }
        }
        true
    }

    fn remove_enumeration(&mut self, owner: TypeIndex) -> bool {
        match self.type_data_mut(owner) {
            Some(data) => data.enumeration.take().is_some(),
            None => false,
        }
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Everything registered after sequence number `mark`, minus the
    /// `excluded` ranges owned by nested transactions
    pub(crate) fn captured_since(&self, mark: u64, excluded: &[SequenceRange]) -> Captured {
        let after =
            |sequence: u64| sequence > mark && !excluded.iter().any(|range| range.contains(sequence));
        let mut captured = Captured::default();

        captured.types = self
            .type_order
            .iter()
            .copied()
            .filter(|index| self.type_data(*index).is_some_and(|data| after(data.sequence)))
            .collect();

        captured.global_properties = self
            .global_property_order
            .iter()
            .copied()
            .filter(|id| self.properties.get(*id).is_some_and(|e| after(e.info.sequence)))
            .collect();
        captured.global_methods = self
            .global_method_order
            .iter()
            .copied()
            .filter(|id| self.methods.get(*id).is_some_and(|e| after(e.info.sequence)))
            .collect();

        let mut members: Vec<(u64, MemberKey)> = Vec::new();
        for (id, entry) in self.properties.iter() {
            if entry.info.declaring.is_some() && after(entry.info.sequence) {
                members.push((entry.info.sequence, MemberKey::Property(id)));
            }
        }
        for (id, entry) in self.methods.iter() {
            if entry.info.declaring.is_some() && after(entry.info.sequence) {
                members.push((entry.info.sequence, MemberKey::Method(id)));
            }
        }
        for (id, entry) in self.constructors.iter() {
            if after(entry.info.sequence) {
                members.push((entry.info.sequence, MemberKey::Constructor(id)));
            }
        }
        for (id, entry) in self.destructors.iter() {
            if after(entry.sequence) {
                members.push((entry.sequence, MemberKey::Destructor(id)));
            }
        }
        for index in &self.type_order {
            if let Some(data) = self.type_data(*index) {
                if data.enumeration.is_some() && after(data.enumeration_sequence) {
                    members.push((
                        data.enumeration_sequence,
                        MemberKey::Enumeration(*index, data.enumeration_sequence),
                    ));
                }
            }
        }
        members.sort_by_key(|(sequence, _)| *sequence);
        captured.members = members.into_iter().map(|(_, key)| key).collect();

        captured.conversions = self
            .conversions
            .entries_since(mark + 1)
            .into_iter()
            .filter(|key| after(key.sequence()))
            .collect();
        captured
    }

    /// Remove exactly the captured entries.
    ///
    /// Members and conversions go first, then global properties, global
    /// methods and finally the types themselves, newest first.
    pub(crate) fn rollback(&mut self, captured: &Captured) {
        for member in captured.members.iter().rev() {
            match *member {
                MemberKey::Property(id) => {
                    self.remove_property(id);
                }
                MemberKey::Method(id) => {
                    self.remove_method(id);
                }
                MemberKey::Constructor(id) => {
                    self.remove_constructor(id);
                }
                MemberKey::Destructor(id) => {
                    self.remove_destructor(id);
                }
                MemberKey::Enumeration(owner, sequence) => {
                    if self
                        .type_data(owner)
                        .is_some_and(|data| data.enumeration_sequence == sequence)
                    {
                        self.remove_enumeration(owner);
                    }
                }
            }
        }
        for key in captured.conversions.iter().rev() {
            self.conversions.remove_entry(key);
        }
        for id in &captured.global_properties {
            self.remove_property(*id);
        }
        for id in &captured.global_methods {
            self.remove_method(*id);
        }
        for index in captured.types.iter().rev() {
            self.remove_type(*index);
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Registry of reflected types
pub struct Registry {
    state: RwLock<RegistryState>,
    builtins: OnceCell<()>,
    libraries: LibraryManager,
}

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

impl Registry {
    fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::new()),
            builtins: OnceCell::new(),
            libraries: LibraryManager::new(),
        }
    }

    /// The process-wide registry
    pub fn global() -> &'static Registry {
        let registry: &'static Registry = &GLOBAL;
        registry.ensure_builtins();
        registry
    }

    /// A fresh registry that lives for the rest of the process.
    ///
    /// Useful for plugin hosts that keep plugins apart and for tests.
    pub fn isolated() -> &'static Registry {
        let registry: &'static Registry = Box::leak(Box::new(Registry::new()));
        registry.ensure_builtins();
        registry
    }

    fn ensure_builtins(&'static self) {
        self.builtins.get_or_init(|| {
            self.type_of::<()>();
            self.type_of::<bool>();
            self.type_of::<char>();
            self.type_of::<i8>();
            self.type_of::<i16>();
            self.type_of::<i32>();
            self.type_of::<i64>();
            self.type_of::<i128>();
            self.type_of::<isize>();
            self.type_of::<u8>();
            self.type_of::<u16>();
            self.type_of::<u32>();
            self.type_of::<u64>();
            self.type_of::<u128>();
            self.type_of::<usize>();
            self.type_of::<f32>();
            self.type_of::<f64>();
            self.type_of::<&'static str>();
            let string = self.type_of::<String>();
            self.register_custom_name(string, "String");
        });
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write()
    }

    pub(crate) fn libraries(&self) -> &LibraryManager {
        &self.libraries
    }

    // ========================================================================
    // Types
    // ========================================================================

    /// Register `T` (and every type it refers to) if needed and return its handle
    pub fn type_of<T: Reflect>(&'static self) -> Type {
        match self.lookup::<T>() {
            Some(ty) => ty,
            None => self.register_descriptor(T::type_descriptor()),
        }
    }

    /// Handle of `T` if it is already registered
    pub fn lookup<T: Reflect>(&'static self) -> Option<Type> {
        let index = self.read().by_type_id.get(&TypeId::of::<T>()).copied()?;
        Some(Type::new(self, index))
    }

    /// Register a type from its descriptor; idempotent per signature
    pub fn register_descriptor(&'static self, descriptor: TypeDescriptor) -> Type {
        if let Some(index) = self.read().find_descriptor(&descriptor) {
            return Type::new(self, index);
        }

        // related types first, so they end up with lower identities
        let related = RelatedTypes {
            raw: descriptor.raw_type.map(|raw| self.register_descriptor(raw()).index()),
            array_raw: descriptor
                .array_raw_type
                .map(|element| self.register_descriptor(element()).index()),
            wrapped: descriptor
                .wrapped_type
                .map(|wrapped| self.register_descriptor(wrapped()).index()),
            template_arguments: descriptor
                .template_arguments
                .iter()
                .map(|argument| self.register_descriptor(argument()).index())
                .collect(),
            bases: descriptor
                .base_classes
                .iter()
                .map(|base| (self.register_descriptor((base.descriptor)()).index(), *base))
                .collect(),
        };

        let index = self.write().insert_type(descriptor, related);
        Type::new(self, index)
    }

    /// Look up a type by display name
    pub fn get_by_name(&'static self, name: &str) -> Option<Type> {
        let index = self.read().by_name.get(name).copied()?;
        Some(Type::new(self, index))
    }

    /// Look up a type by canonical signature
    pub fn get_by_signature(&'static self, signature: &str) -> Option<Type> {
        let index = self
            .read()
            .by_signature
            .get(normalize_signature(signature).as_str())
            .copied()?;
        Some(Type::new(self, index))
    }

    /// Every live type, in registration order
    pub fn types(&'static self) -> Vec<Type> {
        self.read()
            .type_order
            .iter()
            .map(|index| Type::new(self, *index))
            .collect()
    }

    /// Number of live types
    pub fn type_count(&self) -> usize {
        self.read().type_order.len()
    }

    /// Give `ty` a display name; names of types built from it follow
    pub fn register_custom_name(&'static self, ty: Type, name: impl Into<String>) -> bool {
        self.write().set_custom_name(ty.index(), name.into())
    }

    /// Attach metadata to a type; an existing key is kept
    pub fn register_metadata(&'static self, ty: Type, key: impl Into<MetadataKey>, value: Variant) -> bool {
        match self.write().type_data_mut(ty.index()) {
            Some(data) => data.metadata.insert(key.into(), value),
            None => false,
        }
    }

    /// Remove a type record together with its members and conversions
    pub fn unregister_type(&'static self, ty: Type) -> bool {
        self.write().remove_type(ty.index())
    }

    pub(crate) fn type_id_of(&self, index: TypeIndex) -> Option<TypeId> {
        self.read().type_data(index).and_then(|data| data.type_id)
    }

    pub(crate) fn enumeration_data(&self, index: TypeIndex) -> Option<Arc<EnumerationData>> {
        self.read().type_data(index).and_then(|data| data.enumeration.clone())
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// Register a property on `declaring`, or a global property for `None`.
    ///
    /// Returns `None` when an item with the same name and staticness is
    /// already registered there.
    pub fn register_property(
        &'static self,
        declaring: Option<Type>,
        definition: PropertyDefinition,
    ) -> Option<Property> {
        let id = self
            .write()
            .add_property(declaring.map(|ty| ty.index()), definition)?;
        Some(Property::new(self, id))
    }

    /// Register a method on `declaring`, or a free function for `None`.
    ///
    /// Returns `None` when a method with the same name, staticness and
    /// parameter types is already registered there.
    pub fn register_method(&'static self, declaring: Option<Type>, definition: MethodDefinition) -> Option<Method> {
        let id = self
            .write()
            .add_method(declaring.map(|ty| ty.index()), definition)?;
        Some(Method::new(self, id))
    }

    /// Register a constructor of `declaring`
    pub fn register_constructor(&'static self, declaring: Type, definition: ConstructorDefinition) -> Option<Constructor> {
        let id = self.write().add_constructor(declaring.index(), definition)?;
        Some(Constructor::new(self, id))
    }

    /// Register the destructor of `declaring`; the first one wins
    pub fn register_destructor(
        &'static self,
        declaring: Type,
        invoker: Arc<dyn DestructorInvoker>,
    ) -> Option<Destructor> {
        let id = self.write().add_destructor(declaring.index(), invoker)?;
        Some(Destructor::new(self, id))
    }

    /// Register the enumerators of `declaring`; the first registration wins
    pub fn register_enumeration(&'static self, declaring: Type, enumeration: EnumerationData) -> bool {
        self.write().add_enumeration(declaring.index(), enumeration)
    }

    /// Remove a property
    pub fn unregister_property(&'static self, property: Property) -> bool {
        self.write().remove_property(property.id())
    }

    /// Remove a method
    pub fn unregister_method(&'static self, method: Method) -> bool {
        self.write().remove_method(method.id())
    }

    /// Remove a constructor
    pub fn unregister_constructor(&'static self, constructor: Constructor) -> bool {
        self.write().remove_constructor(constructor.id())
    }

    /// Remove a destructor
    pub fn unregister_destructor(&'static self, destructor: Destructor) -> bool {
        self.write().remove_destructor(destructor.id())
    }

    /// Remove the enumerators of `ty`
    pub fn unregister_enumeration(&'static self, ty: Type) -> bool {
        self.write().remove_enumeration(ty.index())
    }

    // ========================================================================
    // Global members
    // ========================================================================

    /// Global properties, in registration order
    pub fn global_properties(&'static self) -> Vec<Property> {
        self.read()
            .global_property_order
            .iter()
            .map(|id| Property::new(self, *id))
            .collect()
    }

    /// Global methods, in registration order
    pub fn global_methods(&'static self) -> Vec<Method> {
        self.read()
            .global_method_order
            .iter()
            .map(|id| Method::new(self, *id))
            .collect()
    }

    /// Global property named `name`
    pub fn global_property(&'static self, name: &str) -> Option<Property> {
        let id = self.read().global_properties.find(name).next().copied()?;
        Some(Property::new(self, id))
    }

    /// Every global method named `name` (all overloads)
    pub fn global_methods_named(&'static self, name: &str) -> Vec<Method> {
        self.read()
            .global_methods
            .find(name)
            .map(|id| Method::new(self, *id))
            .collect()
    }

    /// Global method named `name` accepting `arguments`
    pub fn global_method(&'static self, name: &str, arguments: &[Type]) -> Option<Method> {
        let state = self.read();
        let id = state
            .global_methods
            .find(name)
            .copied()
            .find(|id| {
                state
                    .methods
                    .get(*id)
                    .is_some_and(|entry| parameters_accept(&entry.parameters, arguments))
            })?;
        Some(Method::new(self, id))
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// Register a converter from `source` to `target`; the first one wins
    pub fn register_converter(&'static self, source: Type, target: Type, converter: ConverterFn) -> bool {
        let mut state = self.write();
        let sequence = state.sequence + 1;
        let added = state
            .conversions
            .register_converter(source.index(), target.index(), converter, sequence);
        if added {
            state.sequence = sequence;
        }
        added
    }

    /// Register an equality or less-than comparator for `ty`; the first one wins
    pub fn register_comparator(&'static self, kind: ComparatorKind, ty: Type, comparator: ComparatorFn) -> bool {
        let mut state = self.write();
        let sequence = state.sequence + 1;
        let added = state
            .conversions
            .register_comparator(kind, ty.index(), comparator, sequence);
        if added {
            state.sequence = sequence;
        }
        added
    }

    /// Remove the converter from `source` to `target`
    pub fn unregister_converter(&'static self, source: Type, target: Type) -> bool {
        self.write()
            .conversions
            .remove_converter(source.index(), target.index())
    }

    /// Remove a comparator of `ty`
    pub fn unregister_comparator(&'static self, kind: ComparatorKind, ty: Type) -> bool {
        self.write().conversions.remove_comparator(kind, ty.index())
    }

    pub(crate) fn find_converter(&self, source: Type, target: Type) -> Option<ConverterFn> {
        self.read()
            .conversions
            .find_converter(source.index(), target.index())
            .cloned()
    }

    pub(crate) fn find_comparator(&self, kind: ComparatorKind, ty: Type) -> Option<ComparatorFn> {
        self.read()
            .conversions
            .find_comparator(kind, ty.index())
            .cloned()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("Registry")
            .field("types", &state.type_order.len())
            .field("properties", &state.properties.len())
            .field("methods", &state.methods.len())
            .field("conversions", &state.conversions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_registered() {
        let registry = Registry::isolated();
        let string = registry.type_of::<String>();
        assert_eq!(string.name(), "String");
        assert_eq!(string.signature(), "alloc::string::String");
        assert_eq!(registry.get_by_name("String"), Some(string));
        assert_eq!(registry.get_by_signature("alloc::string::String"), Some(string));
        assert!(registry.lookup::<i32>().is_some());
    }

    #[test]
    fn test_identity_is_stable() {
        let registry = Registry::isolated();
        let first = registry.type_of::<Vec<u8>>();
        let second = registry.register_descriptor(<Vec<u8>>::type_descriptor());
        assert_eq!(first, second);
        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn test_related_types_get_lower_identities() {
        let registry = Registry::isolated();
        let pointer = registry.type_of::<*const Vec<String>>();
        let vector = registry.type_of::<Vec<String>>();
        assert!(vector.id() < pointer.id());
        assert_eq!(pointer.raw_type(), vector);
        assert_eq!(pointer.name(), "*const alloc::vec::Vec<String>");
    }

    #[test]
    fn test_opaque_descriptor_by_signature() {
        let registry = Registry::isolated();
        let first = registry.register_descriptor(TypeDescriptor::opaque("plugin::Widget *", 8));
        let second = registry.register_descriptor(TypeDescriptor::opaque("plugin::Widget*", 8));
        assert_eq!(first, second);
        assert_eq!(first.signature(), "plugin::Widget*");
    }

    #[test]
    fn test_sequence_advances_only_on_success() {
        let registry = Registry::isolated();
        let i32_type = registry.type_of::<i32>();
        let before = registry.read().sequence();
        let converter: ConverterFn = Arc::new(|_: &dyn std::any::Any| -> Option<Variant> { None });
        assert!(registry.register_converter(i32_type, i32_type, converter.clone()));
        assert!(!registry.register_converter(i32_type, i32_type, converter));
        assert_eq!(registry.read().sequence(), before + 1);
    }
}
