//! Scalar types an attribute column may hold.
//!
//! The set is closed: `Char`, `Int64`, `Double` and exact `Rational`. Typed
//! code goes through [`AttributeScalar`]; type-erased code matches on
//! [`AttributeType`] / [`AttributeValues`] exhaustively.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use super::scope::{FrameBuffer, ScopeFrame};
use super::storage::{Attribute, AttributeColumn};

/// Exact rational scalar.
pub type Rational = BigRational;

/// Scalar type tag.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum AttributeType {
    Char,
    Int64,
    Double,
    Rational,
}

impl AttributeType {
    /// Stable label for the scalar type.
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeType::Char => "char",
            AttributeType::Int64 => "int64",
            AttributeType::Double => "double",
            AttributeType::Rational => "rational",
        }
    }

    /// Parse a label produced by [`AttributeType::as_str`].
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "char" => Some(AttributeType::Char),
            "int64" => Some(AttributeType::Int64),
            "double" => Some(AttributeType::Double),
            "rational" => Some(AttributeType::Rational),
            _ => None,
        }
    }
}

/// Type-erased vector of attribute values (one simplex worth, or a whole column).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttributeValues {
    Char(Vec<i8>),
    Int64(Vec<i64>),
    Double(Vec<f64>),
    Rational(Vec<Rational>),
}

impl AttributeValues {
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            AttributeValues::Char(_) => AttributeType::Char,
            AttributeValues::Int64(_) => AttributeType::Int64,
            AttributeValues::Double(_) => AttributeType::Double,
            AttributeValues::Rational(_) => AttributeType::Rational,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AttributeValues::Char(v) => v.len(),
            AttributeValues::Int64(v) => v.len(),
            AttributeValues::Double(v) => v.len(),
            AttributeValues::Rational(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values converted to `f64`, lossy for `Rational`.
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            AttributeValues::Char(v) => v.iter().map(|&x| x as f64).collect(),
            AttributeValues::Int64(v) => v.iter().map(|&x| x as f64).collect(),
            AttributeValues::Double(v) => v.clone(),
            AttributeValues::Rational(v) => v.iter().map(|x| x.to_f64().unwrap_or(f64::NAN)).collect(),
        }
    }
}

/// Maps a concrete scalar onto its column, scope buffer and tagged form.
pub trait AttributeScalar: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    const TYPE: AttributeType;

    fn wrap_column(attribute: Attribute<Self>) -> AttributeColumn;
    fn column(column: &AttributeColumn) -> Option<&Attribute<Self>>;
    fn column_mut(column: &mut AttributeColumn) -> Option<&mut Attribute<Self>>;
    fn buffer(frame: &ScopeFrame) -> &FrameBuffer<Self>;
    fn buffer_mut(frame: &mut ScopeFrame) -> &mut FrameBuffer<Self>;
    fn wrap(values: Vec<Self>) -> AttributeValues;
    fn unwrap(values: &AttributeValues) -> Option<&[Self]>;
    /// Arithmetic midpoint (truncating for integers).
    fn mean(a: &Self, b: &Self) -> Self;
}

macro_rules! impl_attribute_scalar {
    ($ty:ty, $tag:ident, $buf:ident, |$a:ident, $b:ident| $mean:expr) => {
        impl AttributeScalar for $ty {
            const TYPE: AttributeType = AttributeType::$tag;

            fn wrap_column(attribute: Attribute<Self>) -> AttributeColumn {
                AttributeColumn::$tag(attribute)
            }

            #[inline]
            fn column(column: &AttributeColumn) -> Option<&Attribute<Self>> {
                match column {
                    AttributeColumn::$tag(a) => Some(a),
                    _ => None,
                }
            }

            #[inline]
            fn column_mut(column: &mut AttributeColumn) -> Option<&mut Attribute<Self>> {
                match column {
                    AttributeColumn::$tag(a) => Some(a),
                    _ => None,
                }
            }

            #[inline]
            fn buffer(frame: &ScopeFrame) -> &FrameBuffer<Self> {
                &frame.$buf
            }

            #[inline]
            fn buffer_mut(frame: &mut ScopeFrame) -> &mut FrameBuffer<Self> {
                &mut frame.$buf
            }

            fn wrap(values: Vec<Self>) -> AttributeValues {
                AttributeValues::$tag(values)
            }

            fn unwrap(values: &AttributeValues) -> Option<&[Self]> {
                match values {
                    AttributeValues::$tag(v) => Some(v),
                    _ => None,
                }
            }

            fn mean($a: &Self, $b: &Self) -> Self {
                $mean
            }
        }
    };
}

impl_attribute_scalar!(i8, Char, chars, |a, b| ((*a as i16 + *b as i16) / 2) as i8);
impl_attribute_scalar!(i64, Int64, int64s, |a, b| ((*a as i128 + *b as i128) / 2) as i64);
impl_attribute_scalar!(f64, Double, doubles, |a, b| (a + b) / 2.0);
impl_attribute_scalar!(Rational, Rational, rationals, |a, b| (a + b)
    / Rational::from_integer(BigInt::from(2)));

/// Rational from a finite `f64`, exact. Non-finite input maps to zero.
pub fn rational_from_f64(x: f64) -> Rational {
    Rational::from_float(x).unwrap_or_else(Rational::zero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        for ty in [
            AttributeType::Char,
            AttributeType::Int64,
            AttributeType::Double,
            AttributeType::Rational,
        ] {
            assert_eq!(AttributeType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(AttributeType::parse("f32"), None);
    }

    #[test]
    fn means_do_not_overflow() {
        assert_eq!(<i8 as AttributeScalar>::mean(&120, &126), 123);
        assert_eq!(<i64 as AttributeScalar>::mean(&i64::MAX, &i64::MAX), i64::MAX);
        let half = <Rational as AttributeScalar>::mean(
            &Rational::from_integer(1.into()),
            &Rational::from_integer(2.into()),
        );
        assert_eq!(half, Rational::new(3.into(), 2.into()));
    }

    #[test]
    fn values_convert_to_f64() {
        let v = AttributeValues::Rational(vec![Rational::new(1.into(), 4.into())]);
        assert_eq!(v.to_f64(), vec![0.25]);
        assert_eq!(v.attribute_type(), AttributeType::Rational);
        assert_eq!(AttributeValues::Char(vec![]).len(), 0);
    }
}
