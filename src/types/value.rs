//! Dynamic MessagePack values.

use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::Bytes;

use crate::ext::ExtValue;

/// A value of any MessagePack type.
///
/// Maps keep their pairs in wire order. Keys are unique; the decoder rejects
/// a map that repeats one.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    /// Integers above `i64::MAX`, which only the `uint64` format can carry.
    UInteger(u64),
    Float(f32),
    Double(f64),
    String(String),
    Binary(Bytes),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Extension(ExtValue),
}

impl Value {
    /// Returns `true` for `Nil`.
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Returns the value as a string reference, if it is a `String` variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an i64, if it is an integer that fits.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::UInteger(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Returns the value as a bool, if it is a `Boolean` variant.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the items of an `Array`.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a map entry by key.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        match self {
            Self::Map(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Compares two values bit-for-bit, so `NaN` equals itself and `0.0`
    /// differs from `-0.0`.
    pub fn bit_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.bit_eq(y))
            }
            (Self::Map(a), Self::Map(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka.bit_eq(kb) && va.bit_eq(vb))
            }
            _ => self == other,
        }
    }

    /// Feeds the value to `state` so that `a.bit_eq(b)` implies equal hashes.
    ///
    /// Not a `Hash` impl: `PartialEq` treats `0.0` and `-0.0` as equal, which
    /// bit-level hashing cannot honor.
    pub fn hash_bits<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Nil => {}
            Self::Boolean(b) => b.hash(state),
            Self::Integer(i) => i.hash(state),
            Self::UInteger(u) => u.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::Double(v) => v.to_bits().hash(state),
            Self::String(s) => s.hash(state),
            Self::Binary(b) => b.hash(state),
            Self::Array(items) => {
                items.len().hash(state);
                for item in items {
                    item.hash_bits(state);
                }
            }
            Self::Map(pairs) => {
                pairs.len().hash(state);
                for (k, v) in pairs {
                    k.hash_bits(state);
                    v.hash_bits(state);
                }
            }
            Self::Extension(ext) => ext.hash(state),
        }
    }
}

// -- Convenience conversions --

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        match i64::try_from(u) {
            Ok(i) => Self::Integer(i),
            Err(_) => Self::UInteger(u),
        }
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Self::Float(f)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Double(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Self::Binary(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(v)
    }
}

impl From<Vec<(Value, Value)>> for Value {
    fn from(pairs: Vec<(Value, Value)>) -> Self {
        Self::Map(pairs)
    }
}

impl From<ExtValue> for Value {
    fn from(ext: ExtValue) -> Self {
        Self::Extension(ext)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Nil, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::UInteger(u) => write!(f, "{u}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Binary(b) => write!(f, "<{} bytes>", b.len()),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Self::Extension(ext) => write!(f, "ext({}, <{} bytes>)", ext.type_id, ext.data.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_nested() {
        let v = Value::Map(vec![(
            Value::from("xs"),
            Value::Array(vec![Value::Integer(1), Value::Nil, Value::Boolean(true)]),
        )]);
        assert_eq!(v.to_string(), "{\"xs\": [1, nil, true]}");
    }

    #[test]
    fn large_unsigned_keeps_its_own_variant() {
        assert_eq!(Value::from(5u64), Value::Integer(5));
        assert_eq!(Value::from(u64::MAX), Value::UInteger(u64::MAX));
        assert_eq!(Value::from(u64::MAX).as_int(), None);
    }

    #[test]
    fn bit_eq_distinguishes_float_payloads() {
        assert!(Value::Float(f32::NAN).bit_eq(&Value::Float(f32::NAN)));
        assert!(!Value::Double(0.0).bit_eq(&Value::Double(-0.0)));
        assert_ne!(Value::Float(f32::NAN), Value::Float(f32::NAN));
    }

    #[test]
    fn hash_bits_follows_bit_eq() {
        use std::hash::{BuildHasher, RandomState};

        let state = RandomState::new();
        let hash = |v: &Value| {
            let mut h = state.build_hasher();
            v.hash_bits(&mut h);
            h.finish()
        };

        let nan = Value::Array(vec![Value::Double(f64::NAN), Value::from("k")]);
        assert_eq!(hash(&nan), hash(&nan.clone()));
        assert_ne!(hash(&Value::Double(0.0)), hash(&Value::Double(-0.0)));
        assert_ne!(hash(&Value::Integer(1)), hash(&Value::Float(1.0)));
    }

    #[test]
    fn map_lookup() {
        let v = Value::Map(vec![(Value::Integer(1), Value::Boolean(true))]);
        assert_eq!(v.get(&Value::Integer(1)), Some(&Value::Boolean(true)));
        assert_eq!(v.get(&Value::Integer(2)), None);
    }
}
