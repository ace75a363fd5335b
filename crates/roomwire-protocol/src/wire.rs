//! Conversions between Rust types and [`Value`]s.
//!
//! RPC payloads and custom property values are Rust types on the
//! application side and tagged [`Value`]s on the wire. [`WireValue`] is
//! the bridge: implement it for a message type and the RPC registry can
//! encode and decode it.
//!
//! ```rust
//! use roomwire_protocol::{PropertyMap, ProtocolError, Value, WireValue};
//!
//! #[derive(Debug, PartialEq)]
//! struct Chat {
//!     text: String,
//! }
//!
//! impl WireValue for Chat {
//!     const KIND: &'static str = "chat";
//!
//!     fn to_value(&self) -> Value {
//!         Value::Map(PropertyMap::new().with("text", self.text.as_str()))
//!     }
//!
//!     fn from_value(value: Value) -> Result<Self, ProtocolError> {
//!         let map = PropertyMap::from_value(value)?;
//!         let text = map
//!             .get("text")
//!             .cloned()
//!             .map(String::from_value)
//!             .transpose()?
//!             .unwrap_or_default();
//!         Ok(Chat { text })
//!     }
//! }
//!
//! let chat = Chat { text: "hi".into() };
//! assert_eq!(Chat::from_value(chat.to_value()).unwrap(), chat);
//! ```

use crate::{PropertyMap, ProtocolError, Value};

/// A Rust type with a [`Value`] representation.
pub trait WireValue: Sized + 'static {
    /// Name used in type-mismatch errors.
    const KIND: &'static str;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, ProtocolError>;
}

fn mismatch<T>(expected: &'static str, found: &Value) -> Result<T, ProtocolError> {
    Err(ProtocolError::TypeMismatch {
        expected,
        found: found.kind(),
    })
}

impl WireValue for Value {
    const KIND: &'static str = "value";

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        Ok(value)
    }
}

impl WireValue for bool {
    const KIND: &'static str = "bool";

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        value.as_bool().map_or_else(|| mismatch(Self::KIND, &value), Ok)
    }
}

/// Integers accept any integer variant whose value fits, so a peer that
/// sends `I64(3)` still satisfies a handler registered for `i32`.
macro_rules! impl_integer {
    ($($ty:ty => $variant:ident, $kind:literal);* $(;)?) => {
        $(
            impl WireValue for $ty {
                const KIND: &'static str = $kind;

                fn to_value(&self) -> Value {
                    Value::$variant(*self)
                }

                fn from_value(value: Value) -> Result<Self, ProtocolError> {
                    match value.as_integer().map(<$ty>::try_from) {
                        Some(Ok(n)) => Ok(n),
                        _ => mismatch(Self::KIND, &value),
                    }
                }
            }
        )*
    };
}

impl_integer! {
    i8 => I8, "i8";
    u8 => U8, "u8";
    i16 => I16, "i16";
    u16 => U16, "u16";
    i32 => I32, "i32";
    u32 => U32, "u32";
    i64 => I64, "i64";
    u64 => U64, "u64";
}

impl WireValue for f32 {
    const KIND: &'static str = "f32";

    fn to_value(&self) -> Value {
        Value::F32(*self)
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::F32(f) => Ok(f),
            other => mismatch(Self::KIND, &other),
        }
    }
}

impl WireValue for f64 {
    const KIND: &'static str = "f64";

    fn to_value(&self) -> Value {
        Value::F64(*self)
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::F32(f) => Ok(f.into()),
            Value::F64(f) => Ok(f),
            other => mismatch(Self::KIND, &other),
        }
    }
}

impl WireValue for String {
    const KIND: &'static str = "string";

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Str(s) => Ok(s),
            other => mismatch(Self::KIND, &other),
        }
    }
}

impl WireValue for PropertyMap {
    const KIND: &'static str = "map";

    fn to_value(&self) -> Value {
        Value::Map(self.clone())
    }

    /// `Null` reads as an empty map, matching [`PropertyMap::from_bytes`].
    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Map(map) => Ok(map),
            Value::Null => Ok(PropertyMap::new()),
            other => mismatch(Self::KIND, &other),
        }
    }
}

/// Lists encode as a heterogeneous [`Value::List`]; decoding also accepts
/// the homogeneous array variants.
impl<T: WireValue> WireValue for Vec<T> {
    const KIND: &'static str = "list";

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(WireValue::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value.elements() {
            Some(items) => items.into_iter().map(T::from_value).collect(),
            None => mismatch(Self::KIND, &value),
        }
    }
}

impl<T: WireValue> WireValue for Option<T> {
    const KIND: &'static str = T::KIND;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, WireValue::to_value)
    }

    fn from_value(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_from_value_accepts_other_widths_that_fit() {
        assert_eq!(i32::from_value(Value::I64(3)).unwrap(), 3);
        assert_eq!(u16::from_value(Value::U8(200)).unwrap(), 200);
    }

    #[test]
    fn test_u8_keeps_its_width_and_rejects_overflow() {
        assert_eq!(200_u8.to_value(), Value::U8(200));
        assert_eq!(u8::from_value(Value::I32(255)).unwrap(), 255);
        assert!(matches!(
            u8::from_value(Value::I32(256)).unwrap_err(),
            ProtocolError::TypeMismatch { expected: "u8", found: "i32" }
        ));
        let bytes: Vec<u8> = Vec::from_value(vec![1_u8, 2, 3].to_value()).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_integer_from_value_out_of_range_is_mismatch() {
        let err = i8::from_value(Value::I32(1000)).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TypeMismatch { expected: "i8", found: "i32" }
        ));
    }

    #[test]
    fn test_string_from_integer_is_mismatch() {
        let err = String::from_value(Value::I32(1)).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TypeMismatch { expected: "string", found: "i32" }
        ));
    }

    #[test]
    fn test_vec_from_homogeneous_array() {
        let v = Vec::<i32>::from_value(Value::I32s(vec![1, 2, 3])).unwrap();
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn test_vec_to_value_is_list() {
        let v = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            v.to_value(),
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn test_option_maps_none_to_null() {
        assert_eq!(None::<i32>.to_value(), Value::Null);
        assert_eq!(Option::<i32>::from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<i32>::from_value(Value::I32(5)).unwrap(), Some(5));
    }

    #[test]
    fn test_f64_accepts_f32() {
        assert_eq!(f64::from_value(Value::F32(0.5)).unwrap(), 0.5);
    }
}
