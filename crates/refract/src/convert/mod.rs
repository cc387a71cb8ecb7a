//! Conversion rules and the conversion graph

mod graph;
mod number;
mod string;

pub use graph::{ComparatorFn, ComparatorKind, ConverterFn};
pub use string::{format_significant, string_to_bool};

pub(crate) use graph::{ConversionGraph, ConversionKey};
pub(crate) use number::{is_scalar_type, Scalar};
