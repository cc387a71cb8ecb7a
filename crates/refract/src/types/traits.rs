//! Static type traits recorded per type

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bit set of static traits of a reflected type
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TypeTraits(u16);

impl TypeTraits {
    /// No traits
    pub const NONE: TypeTraits = TypeTraits(0);
    /// Struct or class-like type that can own members and base classes
    pub const CLASS: TypeTraits = TypeTraits(1 << 0);
    /// Enumeration
    pub const ENUM: TypeTraits = TypeTraits(1 << 1);
    /// Fixed-size array (`[T; N]`)
    pub const ARRAY: TypeTraits = TypeTraits(1 << 2);
    /// Raw pointer or reference
    pub const POINTER: TypeTraits = TypeTraits(1 << 3);
    /// Integer, floating point, `bool` or `char`
    pub const ARITHMETIC: TypeTraits = TypeTraits(1 << 4);
    /// Function pointer
    pub const FUNCTION_POINTER: TypeTraits = TypeTraits(1 << 5);
    /// Pointer to a member (only for hand-made descriptors)
    pub const MEMBER_POINTER: TypeTraits = TypeTraits(1 << 6);
    /// Key/value container
    pub const ASSOCIATIVE_CONTAINER: TypeTraits = TypeTraits(1 << 7);
    /// Smart-pointer-like wrapper around another type
    pub const WRAPPER: TypeTraits = TypeTraits(1 << 8);
    /// Dynamically sized sequence (`Vec<T>`)
    pub const SEQUENTIAL_CONTAINER: TypeTraits = TypeTraits(1 << 9);
    /// Instantiation of a generic type
    pub const TEMPLATE_INSTANTIATION: TypeTraits = TypeTraits(1 << 10);

    /// Raw bits
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Check whether every trait in `other` is set
    pub const fn contains(self, other: TypeTraits) -> bool {
        self.0 & other.0 == other.0
    }

    /// Return a copy with `other` added
    pub const fn with(self, other: TypeTraits) -> TypeTraits {
        TypeTraits(self.0 | other.0)
    }
}

impl BitOr for TypeTraits {
    type Output = TypeTraits;

    fn bitor(self, rhs: TypeTraits) -> TypeTraits {
        TypeTraits(self.0 | rhs.0)
    }
}

impl BitOrAssign for TypeTraits {
    fn bitor_assign(&mut self, rhs: TypeTraits) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for TypeTraits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(TypeTraits, &str); 11] = [
            (TypeTraits::CLASS, "CLASS"),
            (TypeTraits::ENUM, "ENUM"),
            (TypeTraits::ARRAY, "ARRAY"),
            (TypeTraits::POINTER, "POINTER"),
            (TypeTraits::ARITHMETIC, "ARITHMETIC"),
            (TypeTraits::FUNCTION_POINTER, "FUNCTION_POINTER"),
            (TypeTraits::MEMBER_POINTER, "MEMBER_POINTER"),
            (TypeTraits::ASSOCIATIVE_CONTAINER, "ASSOCIATIVE_CONTAINER"),
            (TypeTraits::WRAPPER, "WRAPPER"),
            (TypeTraits::SEQUENTIAL_CONTAINER, "SEQUENTIAL_CONTAINER"),
            (TypeTraits::TEMPLATE_INSTANTIATION, "TEMPLATE_INSTANTIATION"),
        ];

        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "TypeTraits({})", set.join(" | "))
    }
}
