//! Refract: runtime type reflection for Rust
//!
//! This crate provides a registry of runtime type information:
//! - **Types**: identity, names, traits and inheritance of registered types (`types` module)
//! - **Registry**: properties, methods, constructors, enumerations and metadata (`registry` module)
//! - **Variant**: a type-erased value with conversions and comparisons (`variant` module)
//! - **Libraries**: reference-counted plugin loading that unregisters on unload (`library` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use refract::{reflect_class, Instance, Registration, Type, Variant};
//!
//! #[derive(Clone, Default)]
//! struct Point { x: f64, y: f64 }
//! reflect_class!(Point);
//!
//! Registration::class::<Point>()
//!     .default_constructor()
//!     .property("x", |p: &Point| p.x, |p: &mut Point, x| p.x = x);
//!
//! let ty = Type::of::<Point>();
//! let mut point = ty.create(&[]);
//! let x = ty.property("x").unwrap();
//! x.set_value(&mut Instance::from_variant_mut(&mut point), &Variant::new(2.5));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![allow(clippy::new_without_default)]
#![allow(clippy::type_complexity)]

// ============================================================================
// Core Modules
// ============================================================================

/// Conversion rules and the conversion graph
pub mod convert;

/// Error types
pub mod error;

/// Borrowed receivers
pub mod instance;

/// Registry of types and members
pub mod registry;

/// Typed registration front end
pub mod registration;

/// Type identity and descriptors
pub mod types;

/// Dynamic value container
pub mod variant;

/// Dynamic library lifecycle
pub mod library;

/// Loader configuration
pub mod config;

mod support;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::LoaderConfig;
pub use convert::{ComparatorFn, ComparatorKind, ConverterFn};
pub use error::{ConfigError, LibraryError, ReflectError, ReflectResult};
pub use instance::Instance;
pub use library::{DylibLoader, Library, NativeHandle, NativeLoader, ResolvedLibrary};
pub use registration::{
    ClassRegistration, GlobalRegistration, IntoFunction, IntoMethod, Registration,
};
pub use registry::{
    AccessLevel, Constructor, ConstructorDefinition, ConstructorInvoker, Destructor,
    DestructorInvoker, Enumeration, EnumerationData, Filter, MetadataKey, Method,
    MethodDefinition, MethodInvoker, ParameterInfo, Property, PropertyAccessor,
    PropertyDefinition, RegistrationTransaction, Registry,
};
pub use types::{
    AssociativeOps, BaseClassInfo, Reflect, ReflectEnum, SequentialOps, Type, TypeDescriptor,
    TypeIndex, TypeTraits, WrapperInfo,
};
pub use variant::{AssociativeView, SequentialView, Variant, VariantValue};
