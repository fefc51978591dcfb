//! Values carried by rows in relational pipelines.
//!
//! This module provides the [`Value`] enum, which represents all possible
//! value types a row column can hold, plus the [`cmp_values`] total order
//! used by sorting and windowed range lookups.
//!
//! # Example
//!
//! ```
//! use quern_core::Value;
//!
//! // Create values via From trait
//! let name: Value = "Alice".into();
//! let age: Value = 30i64.into();
//! let score: Value = 95.5f64.into();
//! let active: Value = true.into();
//!
//! // Access typed values
//! assert_eq!(name.as_str(), Some("Alice"));
//! assert_eq!(age.as_int(), Some(30));
//! assert_eq!(score.as_float(), Some(95.5));
//! assert_eq!(active.as_bool(), Some(true));
//! ```

use std::cmp::Ordering;
use std::hash::Hasher;

use serde::{Deserialize, Serialize};

/// A value stored in a row column.
///
/// # Supported Types
///
/// | Variant | Rust Type | Use Case |
/// |---------|-----------|----------|
/// | `Null` | - | Missing/optional values |
/// | `Bool` | `bool` | Boolean flags |
/// | `Int` | `i64` | Integers, counters, timestamps |
/// | `Float` | `f64` | Numeric measurements |
/// | `String` | `String` | Text data |
///
/// # Example
///
/// ```
/// use quern_core::Value;
///
/// let v1 = Value::from("hello");
/// let v2 = Value::from(42i64);
/// let v3 = Value::from(3.5f64);
///
/// assert!(v2.is_numeric());
/// assert_eq!(v3.as_number(), Some(3.5));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null/missing value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
}

impl Value {
    /// Returns `true` if the value is null.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the value as a boolean if it is one.
    #[inline]
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an integer if it is one.
    #[inline]
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a float if it is one.
    #[inline]
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the value as a string slice if it is one.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` if the value is an integer or a float.
    #[inline]
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Returns the value as an `f64` if it is numeric.
    ///
    /// Integers are widened to `f64`; every other variant returns `None`.
    #[inline]
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the name of the value's type, for error messages.
    #[inline]
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }

    /// Structural equality: like `==`, but `Null == Null`, `NaN == NaN`,
    /// and `-0.0 == 0.0`.
    ///
    /// This is the equality used to deduplicate rows in set operations and
    /// to key hash tables, so it must agree with [`Value::structural_hash`].
    /// Unlike [`cmp_values`], it never coerces across types: `Int(1)` and
    /// `Float(1.0)` are structurally distinct.
    #[must_use]
    pub fn structural_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => canonical_bits(*a) == canonical_bits(*b),
            (Self::String(a), Self::String(b)) => a == b,
            _ => false,
        }
    }

    /// Feeds a structural hash of the value into `state`.
    ///
    /// Values that are [`Value::structural_eq`] hash identically: floats are
    /// hashed by canonical bit pattern so that all NaNs collapse to one
    /// bucket and `-0.0` hashes like `0.0`.
    pub fn structural_hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Null => state.write_u8(0),
            Self::Bool(b) => {
                state.write_u8(1);
                state.write_u8(u8::from(*b));
            }
            Self::Int(i) => {
                state.write_u8(2);
                state.write_i64(*i);
            }
            Self::Float(f) => {
                state.write_u8(3);
                state.write_u64(canonical_bits(*f));
            }
            Self::String(s) => {
                state.write_u8(4);
                state.write_usize(s.len());
                state.write(s.as_bytes());
            }
        }
    }
}

/// Canonical bit pattern for hashing and structural equality of floats.
///
/// All NaNs map to the same bits and negative zero maps to positive zero.
fn canonical_bits(f: f64) -> u64 {
    if f.is_nan() {
        f64::NAN.to_bits()
    } else if f == 0.0 {
        0.0f64.to_bits()
    } else {
        f.to_bits()
    }
}

/// Compares two values, yielding a total order.
///
/// - `Null` sorts lowest; both nulls compare equal
/// - Booleans, integers, and strings use their natural order
/// - Integers and floats compare numerically across types; `NaN` compares
///   equal to everything to keep the order total
/// - Values of unrelated types compare equal, so mixed-type columns sort
///   stably rather than failing
#[must_use]
pub fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Value::Int(a), Value::Float(b)) => {
            (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
        }
        (Value::Float(a), Value::Int(b)) => {
            a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

impl From<bool> for Value {
    #[inline]
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    #[inline]
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hasher;

    use super::*;

    fn hash_of(v: &Value) -> u64 {
        let mut h = DefaultHasher::new();
        v.structural_hash(&mut h);
        h.finish()
    }

    #[test]
    fn value_type_checks() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(true).is_null());
        assert!(Value::Int(1).is_numeric());
        assert!(Value::Float(1.0).is_numeric());
        assert!(!Value::String("1".into()).is_numeric());
    }

    #[test]
    fn value_conversions() {
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(42i64).as_int(), Some(42));
        assert_eq!(Value::from(2.5f64).as_float(), Some(2.5));
        assert_eq!(Value::from("hello").as_str(), Some("hello"));
    }

    #[test]
    fn as_number_widens_ints() {
        assert_eq!(Value::Int(3).as_number(), Some(3.0));
        assert_eq!(Value::Float(3.5).as_number(), Some(3.5));
        assert_eq!(Value::from("3").as_number(), None);
        assert_eq!(Value::Null.as_number(), None);
    }

    #[test]
    fn cmp_same_types() {
        assert_eq!(cmp_values(&Value::Int(1), &Value::Int(2)), Ordering::Less);
        assert_eq!(cmp_values(&Value::Float(2.0), &Value::Float(1.0)), Ordering::Greater);
        assert_eq!(
            cmp_values(&Value::from("apple"), &Value::from("banana")),
            Ordering::Less
        );
        assert_eq!(cmp_values(&Value::Bool(false), &Value::Bool(true)), Ordering::Less);
    }

    #[test]
    fn cmp_across_numeric_types() {
        assert_eq!(cmp_values(&Value::Int(1), &Value::Float(1.5)), Ordering::Less);
        assert_eq!(cmp_values(&Value::Float(2.5), &Value::Int(2)), Ordering::Greater);
        assert_eq!(cmp_values(&Value::Int(2), &Value::Float(2.0)), Ordering::Equal);
    }

    #[test]
    fn cmp_nulls_sort_lowest() {
        assert_eq!(cmp_values(&Value::Null, &Value::Int(i64::MIN)), Ordering::Less);
        assert_eq!(cmp_values(&Value::Int(0), &Value::Null), Ordering::Greater);
        assert_eq!(cmp_values(&Value::Null, &Value::Null), Ordering::Equal);
    }

    #[test]
    fn cmp_nan_is_total() {
        let nan = Value::Float(f64::NAN);
        assert_eq!(cmp_values(&nan, &nan), Ordering::Equal);
        assert_eq!(cmp_values(&nan, &Value::Float(1.0)), Ordering::Equal);
    }

    #[test]
    fn cmp_unrelated_types_equal() {
        assert_eq!(cmp_values(&Value::Bool(true), &Value::from("true")), Ordering::Equal);
    }

    #[test]
    fn structural_eq_normalizes_floats() {
        assert!(Value::Float(f64::NAN).structural_eq(&Value::Float(f64::NAN)));
        assert!(Value::Float(-0.0).structural_eq(&Value::Float(0.0)));
        assert!(Value::Null.structural_eq(&Value::Null));
        // No cross-type coercion, unlike cmp_values
        assert!(!Value::Int(1).structural_eq(&Value::Float(1.0)));
    }

    #[test]
    fn structural_hash_agrees_with_eq() {
        assert_eq!(hash_of(&Value::Float(f64::NAN)), hash_of(&Value::Float(f64::NAN)));
        assert_eq!(hash_of(&Value::Float(-0.0)), hash_of(&Value::Float(0.0)));
        assert_ne!(hash_of(&Value::Int(1)), hash_of(&Value::Float(1.0)));
        assert_ne!(hash_of(&Value::Null), hash_of(&Value::Int(0)));
    }

    #[test]
    fn serde_round_trip() {
        let values = vec![
            Value::Null,
            Value::Bool(true),
            Value::Int(-7),
            Value::Float(2.25),
            Value::from("quern"),
        ];
        for v in values {
            let encoded = serde_json::to_string(&v).expect("serialize");
            let decoded: Value = serde_json::from_str(&encoded).expect("deserialize");
            assert_eq!(v, decoded);
        }
    }
}
