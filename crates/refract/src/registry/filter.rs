//! Member filters
//!
//! A filter combines item kind (instance/static), access (public/non-public)
//! and a declared-only flag. A filter missing either an access flag or a kind
//! flag matches nothing.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use super::items::AccessLevel;
use crate::types::TypeIndex;

/// Bitmask refining member enumeration
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Filter(u8);

impl Filter {
    /// Matches nothing
    pub const NONE: Filter = Filter(0);
    /// Non-static items
    pub const INSTANCE_ITEM: Filter = Filter(1);
    /// Static items
    pub const STATIC_ITEM: Filter = Filter(2);
    /// Public items
    pub const PUBLIC_ACCESS: Filter = Filter(4);
    /// Protected and private items
    pub const NON_PUBLIC_ACCESS: Filter = Filter(8);
    /// Only items declared on the queried type itself
    pub const DECLARED_ONLY: Filter = Filter(16);

    /// Raw bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check whether every flag in `other` is set
    pub const fn contains(self, other: Filter) -> bool {
        self.0 & other.0 == other.0
    }

    /// A filter needs at least one access flag and one item-kind flag
    pub const fn is_valid(self) -> bool {
        let access = self.contains(Filter::PUBLIC_ACCESS) || self.contains(Filter::NON_PUBLIC_ACCESS);
        let kind = self.contains(Filter::INSTANCE_ITEM) || self.contains(Filter::STATIC_ITEM);
        access && kind
    }

    /// Check a single item against this filter
    pub(crate) fn matches(
        self,
        is_static: bool,
        access: AccessLevel,
        declaring: Option<TypeIndex>,
        queried: TypeIndex,
    ) -> bool {
        if !self.is_valid() {
            return false;
        }

        let instance = self.contains(Filter::INSTANCE_ITEM);
        let statics = self.contains(Filter::STATIC_ITEM);
        if instance && !statics && is_static {
            return false;
        }
        if statics && !instance && !is_static {
            return false;
        }

        let public = self.contains(Filter::PUBLIC_ACCESS);
        let non_public = self.contains(Filter::NON_PUBLIC_ACCESS);
        if public && !non_public && access != AccessLevel::Public {
            return false;
        }
        if non_public && !public && access == AccessLevel::Public {
            return false;
        }

        if self.contains(Filter::DECLARED_ONLY) && declaring != Some(queried) {
            return false;
        }
        true
    }
}

impl Default for Filter {
    /// Public instance and static items
    fn default() -> Self {
        Filter::INSTANCE_ITEM | Filter::STATIC_ITEM | Filter::PUBLIC_ACCESS
    }
}

impl BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Filter) -> Filter {
        Filter(self.0 | rhs.0)
    }
}

impl BitOrAssign for Filter {
    fn bitor_assign(&mut self, rhs: Filter) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filter({:#07b})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: TypeIndex = TypeIndex(7);
    const BASE: TypeIndex = TypeIndex(3);

    #[test]
    fn test_ill_formed_filter_matches_nothing() {
        assert!(!Filter::DECLARED_ONLY.is_valid());
        assert!(!Filter::DECLARED_ONLY.matches(false, AccessLevel::Public, Some(OWNER), OWNER));
        assert!(!(Filter::PUBLIC_ACCESS).matches(false, AccessLevel::Public, Some(OWNER), OWNER));
        assert!(!(Filter::INSTANCE_ITEM).matches(false, AccessLevel::Public, Some(OWNER), OWNER));
    }

    #[test]
    fn test_kind_and_access_flags() {
        let instance_public = Filter::INSTANCE_ITEM | Filter::PUBLIC_ACCESS;
        assert!(instance_public.matches(false, AccessLevel::Public, Some(OWNER), OWNER));
        assert!(!instance_public.matches(true, AccessLevel::Public, Some(OWNER), OWNER));
        assert!(!instance_public.matches(false, AccessLevel::Private, Some(OWNER), OWNER));

        let hidden = Filter::INSTANCE_ITEM | Filter::STATIC_ITEM | Filter::NON_PUBLIC_ACCESS;
        assert!(hidden.matches(true, AccessLevel::Protected, Some(OWNER), OWNER));
        assert!(!hidden.matches(true, AccessLevel::Public, Some(OWNER), OWNER));
    }

    #[test]
    fn test_declared_only() {
        let filter = Filter::default() | Filter::DECLARED_ONLY;
        assert!(filter.matches(false, AccessLevel::Public, Some(OWNER), OWNER));
        assert!(!filter.matches(false, AccessLevel::Public, Some(BASE), OWNER));
    }
}
