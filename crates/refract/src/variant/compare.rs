//! Variant equality and ordering
//!
//! Same-typed values use the registered comparator for their type. Built-in
//! scalars (and enums, through their underlying value) compare numerically
//! across widths; strings compare lexicographically. Values of different
//! types are compared after converting the right operand to the left
//! operand's type.

use std::cmp::Ordering;

use super::Variant;
use crate::convert::{ComparatorKind, Scalar};

fn is_integral(scalar: &Scalar) -> bool {
    matches!(scalar, Scalar::Bool(_) | Scalar::Char(_) | Scalar::Int(_) | Scalar::UInt(_))
}

fn compare_scalars(lhs: &Scalar, rhs: &Scalar) -> Option<Ordering> {
    match (lhs, rhs) {
        (Scalar::Str(l), Scalar::Str(r)) => Some(l.cmp(r)),
        (Scalar::UInt(l), Scalar::UInt(r)) => Some(l.cmp(r)),
        // every other integral value fits i128
        (Scalar::UInt(_), r) if is_integral(r) => Some(Ordering::Greater),
        (l, Scalar::UInt(_)) if is_integral(l) => Some(Ordering::Less),
        (l, r) if is_integral(l) && is_integral(r) => Some(l.to_integer()?.cmp(&r.to_integer()?)),
        (l, r) => l.to_f64()?.partial_cmp(&r.to_f64()?),
    }
}

/// Compare two same-typed values with a registered comparator
fn with_comparator(lhs: &Variant, rhs: &Variant, kind: ComparatorKind) -> Option<bool> {
    let ty = lhs.get_type()?;
    let comparator = ty.registry().find_comparator(kind, ty)?;
    Some(comparator(lhs.as_any()?, rhs.as_any()?))
}

fn ordering_with_comparator(lhs: &Variant, rhs: &Variant) -> Option<Ordering> {
    if with_comparator(lhs, rhs, ComparatorKind::LessThan)? {
        return Some(Ordering::Less);
    }
    if with_comparator(rhs, lhs, ComparatorKind::LessThan)? {
        return Some(Ordering::Greater);
    }
    Some(Ordering::Equal)
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        let (Some(lhs_type), Some(rhs_type)) = (self.get_type(), other.get_type()) else {
            return !self.is_valid() && !other.is_valid();
        };

        if lhs_type == rhs_type {
            if let Some(equal) = with_comparator(self, other, ComparatorKind::Equal) {
                return equal;
            }
        }
        if let (Some(lhs), Some(rhs)) = (self.scalar(), other.scalar()) {
            return compare_scalars(&lhs, &rhs) == Some(Ordering::Equal);
        }
        if lhs_type != rhs_type {
            if let Some(converted) = other.convert_to(lhs_type) {
                return with_comparator(self, &converted, ComparatorKind::Equal).unwrap_or(false);
            }
        }
        false
    }
}

impl PartialOrd for Variant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let (Some(lhs_type), Some(rhs_type)) = (self.get_type(), other.get_type()) else {
            return (!self.is_valid() && !other.is_valid()).then_some(Ordering::Equal);
        };

        if lhs_type == rhs_type {
            if let Some(ordering) = ordering_with_comparator(self, other) {
                return Some(ordering);
            }
        }
        if let (Some(lhs), Some(rhs)) = (self.scalar(), other.scalar()) {
            return compare_scalars(&lhs, &rhs);
        }
        if lhs_type != rhs_type {
            let converted = other.convert_to(lhs_type)?;
            return ordering_with_comparator(self, &converted);
        }
        None
    }
}
