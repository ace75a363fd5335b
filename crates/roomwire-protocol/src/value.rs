//! The tagged value model used for room, player, and RPC payloads.
//!
//! Room properties are an open bag: the application decides which keys
//! exist and what kind of value each holds. We model that with a single
//! sum type, [`Value`], with one variant per supported kind. Every
//! variant maps to exactly one type tag in the binary codec
//! (see [`crate::serial`]), so a payload is always self-describing.

use std::cmp::Ordering;
use std::fmt;

use crate::PropertyMap;

/// A single dynamically-typed property value.
///
/// Integers keep their width: an `I32(5)` and an `I64(5)` encode
/// differently and are *not* `==`. Comparisons that should ignore width
/// (search predicates, for example) go through [`Value::loose_eq`] and
/// [`Value::loose_cmp`] instead.
///
/// `PartialEq` only (no `Eq`) because `f32`/`f64` are not totally ordered.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    /// Raw bytes, opaque to the codec.
    Bytes(Vec<u8>),
    /// A heterogeneous list: each element carries its own tag.
    List(Vec<Value>),
    /// A nested, ordered map.
    Map(PropertyMap),
    /// Homogeneous arrays: one tag for the whole array.
    Bools(Vec<bool>),
    I32s(Vec<i32>),
    I64s(Vec<i64>),
    F32s(Vec<f32>),
    F64s(Vec<f64>),
    Strs(Vec<String>),
    /// An application type registered under a type code. The bytes are
    /// the type's own encoding; the codec only frames them.
    Object { code: u8, data: Vec<u8> },
}

impl Value {
    /// Short, stable name of the variant. Used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::I8(_) => "i8",
            Self::U8(_) => "u8",
            Self::I16(_) => "i16",
            Self::U16(_) => "u16",
            Self::I32(_) => "i32",
            Self::U32(_) => "u32",
            Self::I64(_) => "i64",
            Self::U64(_) => "u64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Str(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Bools(_) => "bool[]",
            Self::I32s(_) => "i32[]",
            Self::I64s(_) => "i64[]",
            Self::F32s(_) => "f32[]",
            Self::F64s(_) => "f64[]",
            Self::Strs(_) => "string[]",
            Self::Object { .. } => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Any integer variant, widened. `i128` holds every `i64` and `u64`.
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            Self::I8(n) => Some(n.into()),
            Self::U8(n) => Some(n.into()),
            Self::I16(n) => Some(n.into()),
            Self::U16(n) => Some(n.into()),
            Self::I32(n) => Some(n.into()),
            Self::U32(n) => Some(n.into()),
            Self::I64(n) => Some(n.into()),
            Self::U64(n) => Some(n.into()),
            _ => None,
        }
    }

    /// Any numeric variant as `f64`. Large 64-bit integers lose precision.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F32(f) => Some(f.into()),
            Self::F64(f) => Some(f),
            _ => self.as_integer().map(|n| n as f64),
        }
    }

    fn is_float(&self) -> bool {
        matches!(self, Self::F32(_) | Self::F64(_))
    }

    /// The elements of any list or array variant, as owned values.
    ///
    /// Returns `None` for scalars and maps. Used by "contains" predicates,
    /// which treat `I32s([2, 4])` and `List([I32(2), I32(4)])` alike.
    pub fn elements(&self) -> Option<Vec<Value>> {
        let items = match self {
            Self::List(items) => items.clone(),
            Self::Bools(v) => v.iter().copied().map(Self::Bool).collect(),
            Self::I32s(v) => v.iter().copied().map(Self::I32).collect(),
            Self::I64s(v) => v.iter().copied().map(Self::I64).collect(),
            Self::F32s(v) => v.iter().copied().map(Self::F32).collect(),
            Self::F64s(v) => v.iter().copied().map(Self::F64).collect(),
            Self::Strs(v) => v.iter().cloned().map(Self::Str).collect(),
            _ => return None,
        };
        Some(items)
    }

    /// Equality that ignores numeric width: `I32(2)` loosely equals
    /// `I64(2)` and `F64(2.0)`. Non-numeric values fall back to `==`.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match self.loose_cmp(other) {
            Some(ordering) => ordering == Ordering::Equal,
            None => self == other,
        }
    }

    /// Ordering between two numbers or two strings.
    ///
    /// Integers compare exactly (as `i128`); as soon as either side is a
    /// float both are compared as `f64`. Returns `None` for kinds that
    /// have no natural order (maps, lists, mixed string/number, NaN).
    pub fn loose_cmp(&self, other: &Value) -> Option<Ordering> {
        if let (Self::Str(a), Self::Str(b)) = (self, other) {
            return Some(a.cmp(b));
        }
        if !self.is_float() && !other.is_float() {
            if let (Some(a), Some(b)) = (self.as_integer(), other.as_integer()) {
                return Some(a.cmp(&b));
            }
        }
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Str,
    Vec<Value> => List,
    PropertyMap => Map,
    Vec<bool> => Bools,
    Vec<i32> => I32s,
    Vec<i64> => I64s,
    Vec<f32> => F32s,
    Vec<f64> => F64s,
    Vec<String> => Strs,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

fn write_seq<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str("]")
}

/// Operator-facing rendering. Strings are printed bare, collections in
/// brackets, maps as `{key:value,...}` in key order.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::I8(n) => write!(f, "{n}"),
            Self::U8(n) => write!(f, "{n}"),
            Self::I16(n) => write!(f, "{n}"),
            Self::U16(n) => write!(f, "{n}"),
            Self::I32(n) => write!(f, "{n}"),
            Self::U32(n) => write!(f, "{n}"),
            Self::I64(n) => write!(f, "{n}"),
            Self::U64(n) => write!(f, "{n}"),
            Self::F32(n) => write!(f, "{n}"),
            Self::F64(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
            Self::Bytes(b) => write_seq(f, b),
            Self::List(items) => write_seq(f, items),
            Self::Map(map) => write!(f, "{{{map}}}"),
            Self::Bools(v) => write_seq(f, v),
            Self::I32s(v) => write_seq(f, v),
            Self::I64s(v) => write_seq(f, v),
            Self::F32s(v) => write_seq(f, v),
            Self::F64s(v) => write_seq(f, v),
            Self::Strs(v) => write_seq(f, v),
            Self::Object { code, data } => {
                write!(f, "object#{code}({} bytes)", data.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_eq_ignores_integer_width() {
        assert!(Value::I32(2).loose_eq(&Value::I64(2)));
        assert!(Value::U8(7).loose_eq(&Value::I16(7)));
        assert!(Value::I32(2).loose_eq(&Value::F64(2.0)));
        assert!(!Value::I32(2).loose_eq(&Value::I32(3)));
    }

    #[test]
    fn test_loose_eq_falls_back_to_structural_for_non_numbers() {
        assert!(Value::from("a").loose_eq(&Value::from("a")));
        assert!(!Value::from("a").loose_eq(&Value::I32(1)));
        assert!(Value::Bool(false).loose_eq(&Value::Bool(false)));
    }

    #[test]
    fn test_loose_cmp_orders_numbers_and_strings() {
        assert_eq!(
            Value::I32(20).loose_cmp(&Value::I64(80)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::F32(1.5).loose_cmp(&Value::I32(1)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::from("b").loose_cmp(&Value::from("a")),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::from("1").loose_cmp(&Value::I32(1)), None);
    }

    #[test]
    fn test_loose_cmp_u64_beyond_i64_range() {
        let big = Value::U64(u64::MAX);
        assert_eq!(big.loose_cmp(&Value::I64(i64::MAX)), Some(Ordering::Greater));
    }

    #[test]
    fn test_elements_normalizes_arrays_and_lists() {
        let arr = Value::I32s(vec![2, 4]);
        let list = Value::List(vec![Value::I32(2), Value::I32(4)]);
        assert_eq!(arr.elements(), list.elements());
        assert_eq!(Value::I32(1).elements(), None);
    }

    #[test]
    fn test_display_renders_nested_values() {
        let v = Value::List(vec![
            Value::I32(1),
            Value::from("a"),
            Value::F32(3.5),
        ]);
        assert_eq!(v.to_string(), "[1,a,3.5]");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(
            Value::Object { code: 3, data: vec![1, 2] }.to_string(),
            "object#3(2 bytes)"
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Value::I32s(vec![]).kind(), "i32[]");
        assert_eq!(Value::Map(PropertyMap::new()).kind(), "map");
    }
}
