//! Borrowed receivers for property access and method calls
//!
//! An [`Instance`] borrows a value (shared or exclusive) together with the
//! edges leading out of its type: direct base classes, and the wrapped
//! value when the type is a smart pointer. Accessors registered on a base
//! class reach the base part of a derived value, and accessors registered
//! on `T` reach the `T` inside a `Box<T>`, `Rc<T>` or `Arc<T>`.

use std::any::{Any, TypeId};
use std::fmt;

use crate::types::{BaseClassInfo, DescriptorFn, Reflect, Type, TypeDescriptor, WrapperInfo};
use crate::variant::Variant;

enum Receiver<'a> {
    Empty,
    Shared(&'a dyn Any),
    Exclusive(&'a mut dyn Any),
}

/// One hop from a value to a value inside it
#[derive(Clone, Copy)]
enum Edge {
    Base(BaseClassInfo),
    Unwrap(WrapperInfo),
}

impl Edge {
    fn follow<'v>(&self, value: &'v dyn Any) -> Option<&'v dyn Any> {
        match self {
            Edge::Base(base) => (base.upcast)(value),
            Edge::Unwrap(wrapper) => (wrapper.unwrap)(value),
        }
    }

    fn follow_mut<'v>(&self, value: &'v mut dyn Any) -> Option<&'v mut dyn Any> {
        match self {
            Edge::Base(base) => (base.upcast_mut)(value),
            Edge::Unwrap(wrapper) => (wrapper.unwrap_mut)(value),
        }
    }

    fn target(&self) -> DescriptorFn {
        match self {
            Edge::Base(base) => base.descriptor,
            Edge::Unwrap(wrapper) => wrapper.descriptor,
        }
    }
}

fn edges_of(descriptor: &TypeDescriptor) -> Vec<Edge> {
    edges(descriptor.base_classes.iter().copied(), descriptor.wrapper)
}

fn edges(bases: impl IntoIterator<Item = BaseClassInfo>, wrapper: Option<WrapperInfo>) -> Vec<Edge> {
    bases
        .into_iter()
        .map(Edge::Base)
        .chain(wrapper.map(Edge::Unwrap))
        .collect()
}

fn edges_of_type(ty: Option<Type>) -> Vec<Edge> {
    match ty {
        Some(ty) => edges(ty.direct_bases(), ty.wrapper_info()),
        None => Vec::new(),
    }
}

/// Borrowed object a member is accessed on
pub struct Instance<'a> {
    receiver: Receiver<'a>,
    edges: Vec<Edge>,
    ty: Option<Type>,
}

impl<'a> Instance<'a> {
    /// No receiver (static members and global functions)
    pub fn empty() -> Instance<'static> {
        Instance {
            receiver: Receiver::Empty,
            edges: Vec::new(),
            ty: None,
        }
    }

    /// Borrow `value` immutably
    pub fn from_ref<T: Reflect>(value: &'a T) -> Self {
        Self {
            receiver: Receiver::Shared(value),
            edges: edges_of(&T::type_descriptor()),
            ty: None,
        }
    }

    /// Borrow `value` mutably
    pub fn from_mut<T: Reflect>(value: &'a mut T) -> Self {
        Self {
            receiver: Receiver::Exclusive(value),
            edges: edges_of(&T::type_descriptor()),
            ty: None,
        }
    }

    /// Borrow the value held by a variant immutably
    pub fn from_variant(variant: &'a Variant) -> Self {
        match variant.as_any() {
            Some(value) => Self {
                receiver: Receiver::Shared(value),
                edges: edges_of_type(variant.get_type()),
                ty: variant.get_type(),
            },
            None => Self {
                receiver: Receiver::Empty,
                edges: Vec::new(),
                ty: None,
            },
        }
    }

    /// Borrow the value held by a variant mutably
    pub fn from_variant_mut(variant: &'a mut Variant) -> Self {
        let ty = variant.get_type();
        let edges = edges_of_type(ty);
        match variant.as_any_mut() {
            Some(value) => Self {
                receiver: Receiver::Exclusive(value),
                edges,
                ty,
            },
            None => Self {
                receiver: Receiver::Empty,
                edges: Vec::new(),
                ty: None,
            },
        }
    }

    /// Whether there is no receiver
    pub fn is_empty(&self) -> bool {
        matches!(self.receiver, Receiver::Empty)
    }

    /// Whether the receiver can be mutated
    pub fn is_mutable(&self) -> bool {
        matches!(self.receiver, Receiver::Exclusive(_))
    }

    /// Registered type of the receiver, when borrowed from a variant
    pub fn get_type(&self) -> Option<Type> {
        self.ty
    }

    fn as_any(&self) -> Option<&dyn Any> {
        match &self.receiver {
            Receiver::Empty => None,
            Receiver::Shared(value) => Some(*value),
            Receiver::Exclusive(value) => Some(&**value),
        }
    }

    /// Borrow the receiver (one of its base parts, or the value it wraps) as `U`
    pub fn downcast_ref<U: Any>(&self) -> Option<&U> {
        let value = self.as_any()?;
        if let Some(direct) = value.downcast_ref::<U>() {
            return Some(direct);
        }

        let mut path = Vec::new();
        if !find_path(value, &self.edges, TypeId::of::<U>(), &mut path) {
            return None;
        }
        let mut current = value;
        for edge in &path {
            current = edge.follow(current)?;
        }
        current.downcast_ref::<U>()
    }

    /// Mutably borrow the receiver (one of its base parts, or the value it
    /// wraps) as `U`. A shared `Rc`/`Arc` yields `None`.
    pub fn downcast_mut<U: Any>(&mut self) -> Option<&mut U> {
        let mut path = Vec::new();
        {
            let value = self.as_any()?;
            if !value.is::<U>() && !find_path(value, &self.edges, TypeId::of::<U>(), &mut path) {
                return None;
            }
        }

        let mut current: &mut dyn Any = match &mut self.receiver {
            Receiver::Exclusive(value) => &mut **value,
            _ => return None,
        };
        for edge in &path {
            current = edge.follow_mut(current)?;
        }
        current.downcast_mut::<U>()
    }
}

/// Depth-first search for the chain of edges leading to `target`
fn find_path(value: &dyn Any, edges: &[Edge], target: TypeId, path: &mut Vec<Edge>) -> bool {
    for edge in edges {
        let Some(inner) = edge.follow(value) else {
            continue;
        };
        path.push(*edge);
        if (*inner).type_id() == target {
            return true;
        }
        let next = edges_of(&(edge.target())());
        if find_path(inner, &next, target, path) {
            return true;
        }
        path.pop();
    }
    false
}

impl fmt::Debug for Instance<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.receiver {
            Receiver::Empty => "empty",
            Receiver::Shared(_) => "shared",
            Receiver::Exclusive(_) => "exclusive",
        };
        f.debug_struct("Instance")
            .field("receiver", &kind)
            .field("edges", &self.edges.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Node {
        id: u32,
    }

    #[derive(Clone)]
    struct Shape {
        node: Node,
        sides: u32,
    }

    #[derive(Clone)]
    struct Square {
        shape: Shape,
        length: f64,
    }

    crate::reflect_class!(Node);
    crate::reflect_class!(Shape: Node => node);
    crate::reflect_class!(Square: Shape => shape);

    fn square() -> Square {
        Square {
            shape: Shape {
                node: Node { id: 9 },
                sides: 4,
            },
            length: 2.0,
        }
    }

    #[test]
    fn test_downcast_through_bases() {
        let value = square();
        let instance = Instance::from_ref(&value);

        assert_eq!(instance.downcast_ref::<Square>().map(|s| s.length), Some(2.0));
        assert_eq!(instance.downcast_ref::<Shape>().map(|s| s.sides), Some(4));
        assert_eq!(instance.downcast_ref::<Node>().map(|n| n.id), Some(9));
        assert!(instance.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_downcast_mut_through_bases() {
        let mut value = square();
        {
            let mut instance = Instance::from_mut(&mut value);
            instance.downcast_mut::<Node>().expect("node part").id = 11;
        }
        assert_eq!(value.shape.node.id, 11);

        let instance = Instance::from_ref(&value);
        let mut shared = instance;
        assert!(shared.downcast_mut::<Node>().is_none());
    }

    #[derive(Clone)]
    struct Label {
        text: String,
    }

    crate::reflect_class!(Label);

    #[test]
    fn test_downcast_through_wrappers() {
        let boxed = Box::new(square());
        let instance = Instance::from_ref(&boxed);
        assert_eq!(instance.downcast_ref::<Node>().map(|n| n.id), Some(9));

        let shared = std::sync::Arc::new(Label {
            text: "north".to_string(),
        });
        let instance = Instance::from_ref(&shared);
        assert_eq!(instance.downcast_ref::<Label>().map(|l| l.text.as_str()), Some("north"));
    }

    #[test]
    fn test_downcast_mut_through_wrappers() {
        let mut unique = std::sync::Arc::new(Label {
            text: "a".to_string(),
        });
        Instance::from_mut(&mut unique)
            .downcast_mut::<Label>()
            .expect("unique arc")
            .text
            .push('b');
        assert_eq!(unique.text, "ab");

        let other = unique.clone();
        assert!(Instance::from_mut(&mut unique).downcast_mut::<Label>().is_none());
        drop(other);
    }

    #[test]
    fn test_empty_instance() {
        let mut instance = Instance::empty();
        assert!(instance.is_empty());
        assert!(instance.downcast_ref::<Node>().is_none());
        assert!(instance.downcast_mut::<Node>().is_none());
    }
}
