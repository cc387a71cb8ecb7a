//! Built-in conversions between `bool`, `char`, numbers and strings
//!
//! A source value is first read into a [`Scalar`]; the scalar is then
//! narrowed into the target type. Every narrowing is range checked: a value
//! that does not fit the destination fails instead of truncating.

use std::any::{Any, TypeId};

use super::string::{format_significant, parse_whole, string_to_bool, string_to_char};
use crate::variant::VariantValue;

/// A built-in value read out of a variant
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Scalar {
    Bool(bool),
    Char(char),
    Int(i128),
    /// Only `u128` values above `i128::MAX`
    UInt(u128),
    F32(f32),
    F64(f64),
    Str(String),
}

macro_rules! read_as {
    ($value:expr, $($ty:ty => $variant:expr),* $(,)?) => {
        $(
            if let Some(v) = $value.downcast_ref::<$ty>() {
                return Some($variant(*v));
            }
        )*
    };
}

impl Scalar {
    /// Read a built-in value; `None` for any other type
    pub fn read(value: &dyn Any) -> Option<Scalar> {
        read_as!(value,
            bool => Scalar::Bool,
            char => Scalar::Char,
            i8 => |v: i8| Scalar::Int(v as i128),
            i16 => |v: i16| Scalar::Int(v as i128),
            i32 => |v: i32| Scalar::Int(v as i128),
            i64 => |v: i64| Scalar::Int(v as i128),
            i128 => Scalar::Int,
            isize => |v: isize| Scalar::Int(v as i128),
            u8 => |v: u8| Scalar::Int(v as i128),
            u16 => |v: u16| Scalar::Int(v as i128),
            u32 => |v: u32| Scalar::Int(v as i128),
            u64 => |v: u64| Scalar::Int(v as i128),
            usize => |v: usize| Scalar::Int(v as i128),
            f32 => Scalar::F32,
            f64 => Scalar::F64,
        );
        if let Some(v) = value.downcast_ref::<u128>() {
            return Some(i128::try_from(*v).map_or(Scalar::UInt(*v), Scalar::Int));
        }
        if let Some(text) = value.downcast_ref::<String>() {
            return Some(Scalar::Str(text.clone()));
        }
        if let Some(text) = value.downcast_ref::<&'static str>() {
            return Some(Scalar::Str((*text).to_string()));
        }
        None
    }

    /// Truthiness
    pub fn to_bool(&self) -> bool {
        match self {
            Scalar::Bool(v) => *v,
            Scalar::Char(c) => *c != '\0',
            Scalar::Int(v) => *v != 0,
            Scalar::UInt(v) => *v != 0,
            Scalar::F32(v) => !(v.abs() <= f32::MIN_POSITIVE),
            Scalar::F64(v) => !(v.abs() <= f64::MIN_POSITIVE),
            Scalar::Str(text) => string_to_bool(text),
        }
    }

    /// Integral value, for sources that are integral
    pub fn to_integer(&self) -> Option<i128> {
        match self {
            Scalar::Bool(v) => Some(*v as i128),
            Scalar::Char(c) => Some(*c as u32 as i128),
            Scalar::Int(v) => Some(*v),
            Scalar::UInt(v) => i128::try_from(*v).ok(),
            Scalar::F32(_) | Scalar::F64(_) => None,
            Scalar::Str(text) => parse_whole::<i128>(text),
        }
    }

    /// Floating point value of a numeric source
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Scalar::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Scalar::Char(c) => Some(*c as u32 as f64),
            Scalar::Int(v) => Some(*v as f64),
            Scalar::UInt(v) => Some(*v as f64),
            Scalar::F32(v) => Some(*v as f64),
            Scalar::F64(v) => Some(*v),
            Scalar::Str(text) => parse_whole::<f64>(text),
        }
    }

    fn float(&self) -> Option<f64> {
        match self {
            Scalar::F32(v) => Some(*v as f64),
            Scalar::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Text rendering
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Bool(v) => v.to_string(),
            Scalar::Char(c) => c.to_string(),
            Scalar::Int(v) => v.to_string(),
            Scalar::UInt(v) => v.to_string(),
            Scalar::F32(v) => format_significant(*v as f64, 6),
            Scalar::F64(v) => format_significant(*v, 15),
            Scalar::Str(text) => text.clone(),
        }
    }

    /// Narrow into a signed integer type
    fn to_signed<T>(&self, max: T) -> Option<T>
    where
        T: TryFrom<i128> + Into<i128> + Copy,
    {
        if let Some(value) = self.float() {
            let max: i128 = max.into();
            let max = max as f64;
            if value.is_nan() || value > max || value < -max - 1.0 {
                return None;
            }
            return T::try_from(value.trunc() as i128).ok();
        }
        match self {
            Scalar::Str(text) => parse_whole::<i128>(text).and_then(|v| T::try_from(v).ok()),
            _ => self.to_integer().and_then(|v| T::try_from(v).ok()),
        }
    }

    /// Narrow into an unsigned integer type
    fn to_unsigned<T>(&self, max: T) -> Option<T>
    where
        T: TryFrom<i128> + TryInto<i128> + Copy,
    {
        if let Some(value) = self.float() {
            let max = max.try_into().map_or(i128::MAX as f64, |max: i128| max as f64);
            if value.is_nan() || value < 0.0 || value > max {
                return None;
            }
            return T::try_from(value.trunc() as i128).ok();
        }
        self.to_integer().and_then(|v| T::try_from(v).ok())
    }

    /// Narrow into `u128`, the one target wider than the integral scalar
    fn to_u128(&self) -> Option<u128> {
        match self {
            Scalar::UInt(v) => Some(*v),
            Scalar::Str(text) => parse_whole::<u128>(text),
            _ => self.to_unsigned::<u128>(u128::MAX),
        }
    }

    fn to_char(&self) -> Option<char> {
        match self {
            Scalar::Char(c) => Some(*c),
            Scalar::Str(text) => Some(string_to_char(text)),
            _ => {
                let code = self.to_unsigned::<u32>(u32::MAX)?;
                char::from_u32(code)
            }
        }
    }

    /// Convert into a value of the type identified by `target`
    pub fn convert_to(&self, target: TypeId) -> Option<Box<dyn VariantValue>> {
        macro_rules! signed {
            ($($ty:ty),*) => {
                $(
                    if target == TypeId::of::<$ty>() {
                        return self.to_signed::<$ty>(<$ty>::MAX).map(|v| Box::new(v) as Box<dyn VariantValue>);
                    }
                )*
            };
        }
        macro_rules! unsigned {
            ($($ty:ty),*) => {
                $(
                    if target == TypeId::of::<$ty>() {
                        return self.to_unsigned::<$ty>(<$ty>::MAX).map(|v| Box::new(v) as Box<dyn VariantValue>);
                    }
                )*
            };
        }

        signed!(i8, i16, i32, i64, i128);
        unsigned!(u8, u16, u32, u64);

        if target == TypeId::of::<u128>() {
            return self.to_u128().map(|v| Box::new(v) as Box<dyn VariantValue>);
        }
        if target == TypeId::of::<isize>() {
            return self
                .to_signed::<i64>(isize::MAX as i64)
                .and_then(|v| isize::try_from(v).ok())
                .map(|v| Box::new(v) as Box<dyn VariantValue>);
        }
        if target == TypeId::of::<usize>() {
            return self
                .to_unsigned::<u64>(usize::MAX as u64)
                .and_then(|v| usize::try_from(v).ok())
                .map(|v| Box::new(v) as Box<dyn VariantValue>);
        }
        if target == TypeId::of::<bool>() {
            return Some(Box::new(self.to_bool()));
        }
        if target == TypeId::of::<char>() {
            return self.to_char().map(|v| Box::new(v) as Box<dyn VariantValue>);
        }
        if target == TypeId::of::<f64>() {
            return self.to_f64().map(|v| Box::new(v) as Box<dyn VariantValue>);
        }
        if target == TypeId::of::<f32>() {
            let value = match self {
                Scalar::Str(text) => parse_whole::<f32>(text)?,
                other => other.to_f64()? as f32,
            };
            return Some(Box::new(value));
        }
        if target == TypeId::of::<String>() {
            return Some(Box::new(self.to_text()));
        }
        None
    }
}

/// Whether `target` is one of the built-in scalar types
pub(crate) fn is_scalar_type(target: TypeId) -> bool {
    [
        TypeId::of::<bool>(),
        TypeId::of::<char>(),
        TypeId::of::<i8>(),
        TypeId::of::<i16>(),
        TypeId::of::<i32>(),
        TypeId::of::<i64>(),
        TypeId::of::<i128>(),
        TypeId::of::<isize>(),
        TypeId::of::<u8>(),
        TypeId::of::<u16>(),
        TypeId::of::<u32>(),
        TypeId::of::<u64>(),
        TypeId::of::<u128>(),
        TypeId::of::<usize>(),
        TypeId::of::<f32>(),
        TypeId::of::<f64>(),
        TypeId::of::<String>(),
    ]
    .contains(&target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert<T: Copy + 'static>(scalar: Scalar) -> Option<T> {
        scalar
            .convert_to(TypeId::of::<T>())
            .and_then(|boxed| boxed.as_any().downcast_ref::<T>().copied())
    }

    #[test]
    fn test_integer_narrowing_is_range_checked() {
        assert_eq!(convert::<i16>(Scalar::Int(500_000)), None);
        assert_eq!(convert::<i16>(Scalar::Int(30_000)), Some(30_000));
        assert_eq!(convert::<u8>(Scalar::Int(-1)), None);
        assert_eq!(convert::<u64>(Scalar::Int(u64::MAX as i128)), Some(u64::MAX));
        assert_eq!(convert::<i8>(Scalar::Bool(true)), Some(1));
    }

    #[test]
    fn test_float_to_integer() {
        assert_eq!(convert::<i32>(Scalar::F64(42.9)), Some(42));
        assert_eq!(convert::<i32>(Scalar::F64(-42.9)), Some(-42));
        assert_eq!(convert::<u32>(Scalar::F64(-1.0)), None);
        assert_eq!(convert::<i8>(Scalar::F32(200.0)), None);
        assert_eq!(convert::<i32>(Scalar::F64(f64::NAN)), None);
    }

    #[test]
    fn test_float_truthiness_threshold() {
        assert!(!Scalar::F32(1.17149435e-38).to_bool());
        assert!(Scalar::F32(1.17149435e-37).to_bool());
        assert!(!Scalar::F64(0.0).to_bool());
        assert!(Scalar::F64(-0.5).to_bool());
    }

    #[test]
    fn test_string_sources() {
        assert_eq!(convert::<i32>(Scalar::Str("23".into())), Some(23));
        assert_eq!(convert::<i32>(Scalar::Str("23x".into())), None);
        assert_eq!(convert::<u8>(Scalar::Str("256".into())), None);
        assert_eq!(convert::<f32>(Scalar::Str("1.5".into())), Some(1.5));
        assert_eq!(convert::<char>(Scalar::Str("hello".into())), Some('h'));
        assert_eq!(convert::<bool>(Scalar::Str(" False ".into())), Some(false));
    }

    #[test]
    fn test_text_rendering() {
        assert_eq!(Scalar::Int(-17).to_text(), "-17");
        assert_eq!(Scalar::F32(2.5).to_text(), "2.5");
        assert_eq!(Scalar::F64(1.0 / 3.0).to_text(), "0.333333333333333");
        assert_eq!(Scalar::Bool(true).to_text(), "true");
    }

    #[test]
    fn test_u128_above_signed_range() {
        let huge = u128::MAX - 5;
        let scalar = Scalar::read(&huge).expect("u128 is a scalar");
        assert_eq!(scalar, Scalar::UInt(huge));
        assert_eq!(Scalar::read(&5_u128), Some(Scalar::Int(5)));

        assert_eq!(scalar.to_text(), huge.to_string());
        assert_eq!(scalar.to_f64(), Some(huge as f64));
        assert!(scalar.to_bool());
        assert_eq!(convert::<u128>(scalar.clone()), Some(huge));
        assert_eq!(convert::<u64>(scalar.clone()), None);
        assert_eq!(convert::<i128>(scalar), None);
        assert_eq!(convert::<u128>(Scalar::Str(huge.to_string())), Some(huge));
    }

    #[test]
    fn test_read_recognizes_builtins() {
        assert_eq!(Scalar::read(&7u16), Some(Scalar::Int(7)));
        assert_eq!(Scalar::read(&"abc"), Some(Scalar::Str("abc".into())));
        assert_eq!(Scalar::read(&vec![1u8]), None);
        assert!(is_scalar_type(TypeId::of::<usize>()));
        assert!(!is_scalar_type(TypeId::of::<Vec<u8>>()));
    }
}
