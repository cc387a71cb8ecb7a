//! Typed registration front end
//!
//! [`Registration`] turns ordinary Rust closures and functions into the
//! type-erased accessors and invokers stored in the [`Registry`]:
//!
//! ```ignore
//! Registration::class::<Point>()
//!     .default_constructor()
//!     .property("x", |p: &Point| p.x, |p: &mut Point, x| p.x = x)
//!     .with_parameter_names(["dx", "dy"])
//!     .method("translate", |p: &mut Point, dx: f64, dy: f64| p.translate(dx, dy));
//! ```
//!
//! Options such as access level, metadata, parameter names and default
//! arguments are set with the `with_*` methods and apply to the next item
//! registered on the builder.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::convert::{ComparatorKind, ConverterFn};
use crate::instance::Instance;
use crate::registry::{
    AccessLevel, ConstructorDefinition, ConstructorInvoker, DestructorInvoker, EnumerationData,
    MetadataKey, MethodDefinition, MethodInvoker, ParameterInfo, PropertyAccessor,
    PropertyDefinition, Registry,
};
use crate::types::{Reflect, ReflectEnum, Type};
use crate::variant::Variant;

// ============================================================================
// Callable adapters
// ============================================================================

/// Receiver marker for methods taking `&C`
#[doc(hidden)]
pub struct ByRef;

/// Receiver marker for methods taking `&mut C`
#[doc(hidden)]
pub struct ByMut;

/// A free function (or static method, or constructor) with reflected arguments
pub trait IntoFunction<Marker>: Send + Sync + 'static {
    /// Result type
    type Output: Reflect + Clone + Send + Sync;

    /// Registered types of the parameters
    fn parameter_types(registry: &'static Registry) -> Vec<Type>;

    /// Call with converted arguments; `None` when one does not convert
    fn call(&self, arguments: &[Variant]) -> Option<Self::Output>;
}

/// A method taking `&C` or `&mut C` followed by reflected arguments
pub trait IntoMethod<C, Marker>: Send + Sync + 'static {
    /// Result type
    type Output: Reflect + Clone + Send + Sync;

    /// Registered types of the parameters (receiver excluded)
    fn parameter_types(registry: &'static Registry) -> Vec<Type>;

    /// Call on `instance`; `None` when the receiver or an argument does not fit
    fn call(&self, instance: &mut Instance<'_>, arguments: &[Variant]) -> Option<Self::Output>;
}

macro_rules! impl_callables {
    ($($arg:ident),*) => {
        impl<R, F, $($arg,)*> IntoFunction<($($arg,)*)> for F
        where
            R: Reflect + Clone + Send + Sync,
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            $($arg: Reflect + Clone + Send + Sync,)*
        {
            type Output = R;

            fn parameter_types(registry: &'static Registry) -> Vec<Type> {
                let _ = registry;
                vec![$(registry.type_of::<$arg>()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, arguments: &[Variant]) -> Option<R> {
                let mut arguments = arguments.iter();
                $(let $arg = arguments.next()?.convert::<$arg>()?;)*
                Some((self)($($arg),*))
            }
        }

        impl<C, R, F, $($arg,)*> IntoMethod<C, (ByRef, $($arg,)*)> for F
        where
            C: Any,
            R: Reflect + Clone + Send + Sync,
            F: Fn(&C, $($arg),*) -> R + Send + Sync + 'static,
            $($arg: Reflect + Clone + Send + Sync,)*
        {
            type Output = R;

            fn parameter_types(registry: &'static Registry) -> Vec<Type> {
                let _ = registry;
                vec![$(registry.type_of::<$arg>()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, instance: &mut Instance<'_>, arguments: &[Variant]) -> Option<R> {
                let mut arguments = arguments.iter();
                $(let $arg = arguments.next()?.convert::<$arg>()?;)*
                let this = instance.downcast_ref::<C>()?;
                Some((self)(this, $($arg),*))
            }
        }

        impl<C, R, F, $($arg,)*> IntoMethod<C, (ByMut, $($arg,)*)> for F
        where
            C: Any,
            R: Reflect + Clone + Send + Sync,
            F: Fn(&mut C, $($arg),*) -> R + Send + Sync + 'static,
            $($arg: Reflect + Clone + Send + Sync,)*
        {
            type Output = R;

            fn parameter_types(registry: &'static Registry) -> Vec<Type> {
                let _ = registry;
                vec![$(registry.type_of::<$arg>()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, instance: &mut Instance<'_>, arguments: &[Variant]) -> Option<R> {
                let mut arguments = arguments.iter();
                $(let $arg = arguments.next()?.convert::<$arg>()?;)*
                let this = instance.downcast_mut::<C>()?;
                Some((self)(this, $($arg),*))
            }
        }
    };
}

impl_callables!();
impl_callables!(A1);
impl_callables!(A1, A2);
impl_callables!(A1, A2, A3);
impl_callables!(A1, A2, A3, A4);

struct FunctionInvoker<F, M> {
    function: F,
    return_type: Type,
    _marker: PhantomData<fn() -> M>,
}

impl<F: IntoFunction<M>, M: 'static> MethodInvoker for FunctionInvoker<F, M> {
    fn invoke(&self, _instance: &mut Instance<'_>, arguments: &[Variant]) -> Option<Variant> {
        let output = self.function.call(arguments)?;
        Some(Variant::from_parts(self.return_type, Box::new(output)))
    }
}

impl<F: IntoFunction<M>, M: 'static> ConstructorInvoker for FunctionInvoker<F, M> {
    fn invoke(&self, arguments: &[Variant]) -> Option<Variant> {
        let output = self.function.call(arguments)?;
        Some(Variant::from_parts(self.return_type, Box::new(output)))
    }
}

struct MethodAdapter<C, F, M> {
    method: F,
    return_type: Type,
    _marker: PhantomData<fn(&C) -> M>,
}

impl<C: Any, F: IntoMethod<C, M>, M: 'static> MethodInvoker for MethodAdapter<C, F, M> {
    fn invoke(&self, instance: &mut Instance<'_>, arguments: &[Variant]) -> Option<Variant> {
        let output = self.method.call(instance, arguments)?;
        Some(Variant::from_parts(self.return_type, Box::new(output)))
    }
}

// ============================================================================
// Property accessors
// ============================================================================

type Setter<C, T> = Box<dyn Fn(&mut C, T) + Send + Sync>;
type StaticSetter<T> = Box<dyn Fn(T) + Send + Sync>;

struct MemberAccessor<C, T> {
    get: Box<dyn Fn(&C) -> T + Send + Sync>,
    set: Option<Setter<C, T>>,
    value_type: Type,
}

impl<C, T> PropertyAccessor for MemberAccessor<C, T>
where
    C: Any,
    T: Reflect + Clone + Send + Sync,
{
    fn get_value(&self, instance: &Instance<'_>) -> Option<Variant> {
        let this = instance.downcast_ref::<C>()?;
        Some(Variant::from_parts(self.value_type, Box::new((self.get)(this))))
    }

    fn set_value(&self, instance: &mut Instance<'_>, value: &Variant) -> bool {
        let Some(set) = &self.set else {
            return false;
        };
        let Some(value) = value.convert::<T>() else {
            return false;
        };
        match instance.downcast_mut::<C>() {
            Some(this) => {
                set(this, value);
                true
            }
            None => false,
        }
    }

    fn is_readonly(&self) -> bool {
        self.set.is_none()
    }
}

struct StaticAccessor<T> {
    get: Box<dyn Fn() -> T + Send + Sync>,
    set: Option<StaticSetter<T>>,
    value_type: Type,
}

impl<T: Reflect + Clone + Send + Sync> PropertyAccessor for StaticAccessor<T> {
    fn get_value(&self, _instance: &Instance<'_>) -> Option<Variant> {
        Some(Variant::from_parts(self.value_type, Box::new((self.get)())))
    }

    fn set_value(&self, _instance: &mut Instance<'_>, value: &Variant) -> bool {
        match (&self.set, value.convert::<T>()) {
            (Some(set), Some(value)) => {
                set(value);
                true
            }
            _ => false,
        }
    }

    fn is_readonly(&self) -> bool {
        self.set.is_none()
    }
}

fn variable_accessor<T: Reflect + Clone + Send + Sync>(value_type: Type, initial: T) -> StaticAccessor<T> {
    let cell = Arc::new(RwLock::new(initial));
    let reader = cell.clone();
    StaticAccessor {
        get: Box::new(move || reader.read().clone()),
        set: Some(Box::new(move |value| *cell.write() = value)),
        value_type,
    }
}

struct DropValue<C>(PhantomData<fn(C)>);

impl<C: Any> DestructorInvoker for DropValue<C> {
    fn destroy(&self, value: &mut Variant) -> bool {
        if value.get_value::<C>().is_none() {
            return false;
        }
        value.clear();
        true
    }
}

// ============================================================================
// Per-item options
// ============================================================================

#[derive(Default)]
struct ItemOptions {
    access: AccessLevel,
    metadata: Vec<(MetadataKey, Variant)>,
    parameter_names: Vec<String>,
    defaults: Vec<Variant>,
}

impl ItemOptions {
    /// Build parameter infos; defaults cover the trailing parameters
    fn parameters(&self, types: Vec<Type>) -> Vec<ParameterInfo> {
        let first_default = types.len().saturating_sub(self.defaults.len());
        types
            .into_iter()
            .enumerate()
            .map(|(position, ty)| {
                let name = self
                    .parameter_names
                    .get(position)
                    .cloned()
                    .unwrap_or_else(|| format!("arg{position}"));
                let parameter = ParameterInfo::new(name, ty);
                match position.checked_sub(first_default) {
                    Some(offset) => match self.defaults.get(offset) {
                        Some(default) => parameter.with_default(default.clone()),
                        None => parameter,
                    },
                    None => parameter,
                }
            })
            .collect()
    }
}

macro_rules! item_option_methods {
    () => {
        /// Access level of the next item
        pub fn with_access(mut self, access: AccessLevel) -> Self {
            self.pending.access = access;
            self
        }

        /// Attach metadata to the next item
        pub fn with_metadata(mut self, key: impl Into<MetadataKey>, value: Variant) -> Self {
            self.pending.metadata.push((key.into(), value));
            self
        }

        /// Parameter names of the next function
        pub fn with_parameter_names<I, N>(mut self, names: I) -> Self
        where
            I: IntoIterator<Item = N>,
            N: Into<String>,
        {
            self.pending.parameter_names = names.into_iter().map(Into::into).collect();
            self
        }

        /// Default values for the trailing parameters of the next function
        pub fn with_defaults(mut self, defaults: impl IntoIterator<Item = Variant>) -> Self {
            self.pending.defaults = defaults.into_iter().collect();
            self
        }

        fn take_options(&mut self) -> ItemOptions {
            std::mem::take(&mut self.pending)
        }
    };
}

// ============================================================================
// Entry points
// ============================================================================

/// Registration entry points
pub struct Registration;

impl Registration {
    /// Register the class `C` in the process-wide registry
    pub fn class<C: Reflect>() -> ClassRegistration<C> {
        Self::class_in::<C>(Registry::global())
    }

    /// Register the class `C` in `registry`
    pub fn class_in<C: Reflect>(registry: &'static Registry) -> ClassRegistration<C> {
        ClassRegistration::new(registry)
    }

    /// Register free functions and global properties in the process-wide registry
    pub fn global() -> GlobalRegistration {
        Self::global_in(Registry::global())
    }

    /// Register free functions and global properties in `registry`
    pub fn global_in(registry: &'static Registry) -> GlobalRegistration {
        GlobalRegistration {
            registry,
            pending: ItemOptions::default(),
        }
    }

    /// Register the enumerators of `E` in the process-wide registry
    pub fn enumeration<E, N>(values: impl IntoIterator<Item = (N, E)>) -> Type
    where
        E: ReflectEnum,
        N: Into<String>,
    {
        Self::enumeration_in(Registry::global(), values)
    }

    /// Register the enumerators of `E` in `registry`
    pub fn enumeration_in<E, N>(registry: &'static Registry, values: impl IntoIterator<Item = (N, E)>) -> Type
    where
        E: ReflectEnum,
        N: Into<String>,
    {
        let ty = registry.type_of::<E>();
        let underlying = registry.type_of::<E::Underlying>();
        registry.register_enumeration(ty, EnumerationData::new(underlying, values));
        ty
    }

    /// Give `T` a display name in the process-wide registry
    pub fn custom_name<T: Reflect>(name: impl Into<String>) -> Type {
        Self::custom_name_in::<T>(Registry::global(), name)
    }

    /// Give `T` a display name in `registry`
    pub fn custom_name_in<T: Reflect>(registry: &'static Registry, name: impl Into<String>) -> Type {
        let ty = registry.type_of::<T>();
        registry.register_custom_name(ty, name);
        ty
    }

    /// Register a conversion from `S` to `T` in the process-wide registry
    pub fn converter<S, T, F>(convert: F) -> bool
    where
        S: Reflect,
        T: Reflect + Clone + Send + Sync,
        F: Fn(&S) -> Option<T> + Send + Sync + 'static,
    {
        Self::converter_in(Registry::global(), convert)
    }

    /// Register a conversion from `S` to `T` in `registry`
    pub fn converter_in<S, T, F>(registry: &'static Registry, convert: F) -> bool
    where
        S: Reflect,
        T: Reflect + Clone + Send + Sync,
        F: Fn(&S) -> Option<T> + Send + Sync + 'static,
    {
        let source = registry.type_of::<S>();
        let target = registry.type_of::<T>();
        let converter: ConverterFn = Arc::new(move |value: &dyn Any| {
            let converted = convert(value.downcast_ref::<S>()?)?;
            Some(Variant::from_parts(target, Box::new(converted)))
        });
        registry.register_converter(source, target, converter)
    }

    /// Use `T`'s `PartialEq` for variant equality in `registry`
    pub fn equal_comparator_in<T: Reflect + PartialEq>(registry: &'static Registry) -> bool {
        let ty = registry.type_of::<T>();
        registry.register_comparator(
            ComparatorKind::Equal,
            ty,
            Arc::new(|lhs: &dyn Any, rhs: &dyn Any| {
                matches!((lhs.downcast_ref::<T>(), rhs.downcast_ref::<T>()), (Some(l), Some(r)) if l == r)
            }),
        )
    }

    /// Use `T`'s `PartialOrd` for variant ordering in `registry`
    pub fn less_than_comparator_in<T: Reflect + PartialOrd>(registry: &'static Registry) -> bool {
        let ty = registry.type_of::<T>();
        registry.register_comparator(
            ComparatorKind::LessThan,
            ty,
            Arc::new(|lhs: &dyn Any, rhs: &dyn Any| {
                matches!((lhs.downcast_ref::<T>(), rhs.downcast_ref::<T>()), (Some(l), Some(r)) if l < r)
            }),
        )
    }

    /// Use `T`'s `PartialEq` for variant equality
    pub fn equal_comparator<T: Reflect + PartialEq>() -> bool {
        Self::equal_comparator_in::<T>(Registry::global())
    }

    /// Use `T`'s `PartialOrd` for variant ordering
    pub fn less_than_comparator<T: Reflect + PartialOrd>() -> bool {
        Self::less_than_comparator_in::<T>(Registry::global())
    }
}

// ============================================================================
// Class builder
// ============================================================================

/// Builder registering the members of `C`
pub struct ClassRegistration<C> {
    registry: &'static Registry,
    ty: Type,
    pending: ItemOptions,
    _marker: PhantomData<fn() -> C>,
}

impl<C: Reflect> ClassRegistration<C> {
    fn new(registry: &'static Registry) -> Self {
        let ty = registry.type_of::<C>();
        registry.register_destructor(ty, Arc::new(DropValue::<C>(PhantomData)));
        Self {
            registry,
            ty,
            pending: ItemOptions::default(),
            _marker: PhantomData,
        }
    }

    item_option_methods!();

    /// The registered class
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// Attach metadata to the class itself
    pub fn metadata(self, key: impl Into<MetadataKey>, value: Variant) -> Self {
        self.registry.register_metadata(self.ty, key, value);
        self
    }

    /// Register a constructor built from a function returning `C`
    pub fn constructor<F, M>(mut self, function: F) -> Self
    where
        F: IntoFunction<M, Output = C>,
        M: 'static,
    {
        let options = self.take_options();
        let definition = ConstructorDefinition {
            access: options.access,
            parameters: options.parameters(F::parameter_types(self.registry)),
            instantiated_type: self.ty,
            invoker: Arc::new(FunctionInvoker {
                function,
                return_type: self.ty,
                _marker: PhantomData::<fn() -> M>,
            }),
            metadata: options.metadata,
        };
        self.registry.register_constructor(self.ty, definition);
        self
    }

    /// Register `C::default` as the parameterless constructor
    pub fn default_constructor(self) -> Self
    where
        C: Default + Clone + Send + Sync,
    {
        self.constructor(C::default)
    }

    /// Register a read-write property
    pub fn property<T, G, S>(mut self, name: &str, get: G, set: S) -> Self
    where
        T: Reflect + Clone + Send + Sync,
        G: Fn(&C) -> T + Send + Sync + 'static,
        S: Fn(&mut C, T) + Send + Sync + 'static,
    {
        let accessor = MemberAccessor {
            get: Box::new(get),
            set: Some(Box::new(set) as Setter<C, T>),
            value_type: self.registry.type_of::<T>(),
        };
        self.add_property(name, false, accessor.value_type, Arc::new(accessor));
        self
    }

    /// Register a read-only property
    pub fn property_readonly<T, G>(mut self, name: &str, get: G) -> Self
    where
        T: Reflect + Clone + Send + Sync,
        G: Fn(&C) -> T + Send + Sync + 'static,
    {
        let accessor = MemberAccessor {
            get: Box::new(get),
            set: None,
            value_type: self.registry.type_of::<T>(),
        };
        self.add_property(name, false, accessor.value_type, Arc::new(accessor));
        self
    }

    /// Register a static property backed by getter and setter functions
    pub fn static_property<T, G, S>(mut self, name: &str, get: G, set: S) -> Self
    where
        T: Reflect + Clone + Send + Sync,
        G: Fn() -> T + Send + Sync + 'static,
        S: Fn(T) + Send + Sync + 'static,
    {
        let accessor = StaticAccessor {
            get: Box::new(get),
            set: Some(Box::new(set) as StaticSetter<T>),
            value_type: self.registry.type_of::<T>(),
        };
        self.add_property(name, true, accessor.value_type, Arc::new(accessor));
        self
    }

    /// Register a read-only static property
    pub fn static_property_readonly<T, G>(mut self, name: &str, get: G) -> Self
    where
        T: Reflect + Clone + Send + Sync,
        G: Fn() -> T + Send + Sync + 'static,
    {
        let accessor = StaticAccessor {
            get: Box::new(get),
            set: None,
            value_type: self.registry.type_of::<T>(),
        };
        self.add_property(name, true, accessor.value_type, Arc::new(accessor));
        self
    }

    fn add_property(&mut self, name: &str, is_static: bool, value_type: Type, accessor: Arc<dyn PropertyAccessor>) {
        let options = self.take_options();
        self.registry.register_property(
            Some(self.ty),
            PropertyDefinition {
                name: name.to_string(),
                access: options.access,
                is_static,
                value_type,
                accessor,
                metadata: options.metadata,
            },
        );
    }

    /// Register a method taking `&C` or `&mut C`
    pub fn method<F, M>(mut self, name: &str, method: F) -> Self
    where
        F: IntoMethod<C, M>,
        M: 'static,
    {
        let options = self.take_options();
        let return_type = self.registry.type_of::<F::Output>();
        let definition = MethodDefinition {
            name: name.to_string(),
            access: options.access,
            is_static: false,
            parameters: options.parameters(F::parameter_types(self.registry)),
            return_type,
            invoker: Arc::new(MethodAdapter {
                method,
                return_type,
                _marker: PhantomData::<fn(&C) -> M>,
            }),
            metadata: options.metadata,
        };
        self.registry.register_method(Some(self.ty), definition);
        self
    }

    /// Register a static method
    pub fn static_method<F, M>(mut self, name: &str, function: F) -> Self
    where
        F: IntoFunction<M>,
        M: 'static,
    {
        let options = self.take_options();
        let definition = function_definition(self.registry, name, options, function);
        self.registry.register_method(Some(self.ty), definition);
        self
    }
}

fn function_definition<F, M>(registry: &'static Registry, name: &str, options: ItemOptions, function: F) -> MethodDefinition
where
    F: IntoFunction<M>,
    M: 'static,
{
    let return_type = registry.type_of::<F::Output>();
    MethodDefinition {
        name: name.to_string(),
        access: options.access,
        is_static: true,
        parameters: options.parameters(F::parameter_types(registry)),
        return_type,
        invoker: Arc::new(FunctionInvoker {
            function,
            return_type,
            _marker: PhantomData::<fn() -> M>,
        }),
        metadata: options.metadata,
    }
}

// ============================================================================
// Global builder
// ============================================================================

/// Builder registering free functions and global properties
pub struct GlobalRegistration {
    registry: &'static Registry,
    pending: ItemOptions,
}

impl GlobalRegistration {
    item_option_methods!();

    /// Register a free function
    pub fn function<F, M>(mut self, name: &str, function: F) -> Self
    where
        F: IntoFunction<M>,
        M: 'static,
    {
        let options = self.take_options();
        let definition = function_definition(self.registry, name, options, function);
        self.registry.register_method(None, definition);
        self
    }

    /// Register a global property backed by getter and setter functions
    pub fn property<T, G, S>(mut self, name: &str, get: G, set: S) -> Self
    where
        T: Reflect + Clone + Send + Sync,
        G: Fn() -> T + Send + Sync + 'static,
        S: Fn(T) + Send + Sync + 'static,
    {
        let accessor = StaticAccessor {
            get: Box::new(get),
            set: Some(Box::new(set) as StaticSetter<T>),
            value_type: self.registry.type_of::<T>(),
        };
        self.add_property(name, accessor.value_type, Arc::new(accessor));
        self
    }

    /// Register a read-only global property
    pub fn property_readonly<T, G>(mut self, name: &str, get: G) -> Self
    where
        T: Reflect + Clone + Send + Sync,
        G: Fn() -> T + Send + Sync + 'static,
    {
        let accessor = StaticAccessor {
            get: Box::new(get),
            set: None,
            value_type: self.registry.type_of::<T>(),
        };
        self.add_property(name, accessor.value_type, Arc::new(accessor));
        self
    }

    /// Register a global variable owned by the registry, starting at `initial`
    pub fn variable<T: Reflect + Clone + Send + Sync>(mut self, name: &str, initial: T) -> Self {
        let accessor = variable_accessor(self.registry.type_of::<T>(), initial);
        self.add_property(name, accessor.value_type, Arc::new(accessor));
        self
    }

    fn add_property(&mut self, name: &str, value_type: Type, accessor: Arc<dyn PropertyAccessor>) {
        let options = self.take_options();
        self.registry.register_property(
            None,
            PropertyDefinition {
                name: name.to_string(),
                access: options.access,
                is_static: true,
                value_type,
                accessor,
                metadata: options.metadata,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Counter {
        value: i32,
    }

    crate::reflect_class!(Counter);

    impl Counter {
        fn get(&self) -> i32 {
            self.value
        }

        fn add(&mut self, amount: i32) -> i32 {
            self.value += amount;
            self.value
        }
    }

    #[test]
    fn test_method_receivers() {
        let registry = Registry::isolated();
        let ty = Registration::class_in::<Counter>(registry)
            .method("get", Counter::get)
            .method("add", Counter::add)
            .ty();

        let mut counter = Counter { value: 1 };
        let add = ty.method("add").expect("add registered");
        let result = add.invoke(&mut Instance::from_mut(&mut counter), &[Variant::new_in(registry, 4)]);
        assert_eq!(result.get_value::<i32>(), Some(&5));
        assert_eq!(counter.value, 5);

        // `&mut` methods need a mutable receiver
        let shared = Counter { value: 2 };
        let result = add.invoke(&mut Instance::from_ref(&shared), &[Variant::new_in(registry, 1)]);
        assert!(!result.is_valid());

        let get = ty.method("get").expect("get registered");
        let result = get.invoke(&mut Instance::from_ref(&shared), &[]);
        assert_eq!(result.get_value::<i32>(), Some(&2));
    }

    #[test]
    fn test_parameter_options_apply_to_next_item_only() {
        let registry = Registry::isolated();
        let ty = Registration::class_in::<Counter>(registry)
            .with_parameter_names(["amount"])
            .with_defaults([Variant::new_in(registry, 10)])
            .method("add", Counter::add)
            .method("get", Counter::get)
            .ty();

        let add = ty.method("add").expect("add registered");
        let parameters = add.parameter_infos();
        assert_eq!(parameters[0].name, "amount");
        assert!(parameters[0].default.is_some());

        let mut counter = Counter::default();
        let result = add.invoke(&mut Instance::from_mut(&mut counter), &[]);
        assert_eq!(result.get_value::<i32>(), Some(&10));
        assert_eq!(ty.method("get").map(|m| m.parameter_infos().len()), Some(0));
    }

    #[test]
    fn test_destructor_is_registered_with_class() {
        let registry = Registry::isolated();
        let ty = Registration::class_in::<Counter>(registry).default_constructor().ty();
        let mut value = ty.create(&[]);
        assert!(value.is_valid());
        assert!(ty.destroy(&mut value));
        assert!(!value.is_valid());
    }

    #[test]
    fn test_global_variable() {
        let registry = Registry::isolated();
        Registration::global_in(registry).variable("limit", 3_u32);
        let limit = registry.global_property("limit").expect("registered");
        assert!(limit.set_value(&mut Instance::empty(), &Variant::new_in(registry, 7_u32)));
        assert_eq!(limit.get_value(&Instance::empty()).get_value::<u32>(), Some(&7));
    }
}
