//! Tagged binary codec for [`Value`]s and [`PropertyMap`]s.
//!
//! Every value starts with a one-byte type tag. Fixed-size kinds follow
//! the tag with their big-endian bytes; variable-size kinds follow it
//! with a `u32` big-endian length (bytes for strings/blobs, element
//! count for collections).
//!
//! ```text
//! I32(13)         → 07 00 00 00 0d
//! Str("ab")       → 0d 00 00 00 02 61 62
//! Map{bbb: 13}    → 10 00 00 00 01 | 00 00 00 03 62 62 62 | 07 00 00 00 0d
//!                   tag  count       key (len + utf8)        value
//! ```
//!
//! Decoding is strict: an unknown tag, a length that runs past the end of
//! the buffer, or leftover bytes after the top-level value are all format
//! errors. Nothing is ever partially applied.

use std::collections::HashSet;

use crate::{PropertyMap, ProtocolError, Value};

/// Maximum nesting of lists/maps. Deeper payloads are rejected rather
/// than risking stack exhaustion on hostile input.
pub const MAX_DEPTH: usize = 32;

// ---------------------------------------------------------------------------
// Type tags
// ---------------------------------------------------------------------------

mod tag {
    pub const NULL: u8 = 0x00;
    pub const FALSE: u8 = 0x01;
    pub const TRUE: u8 = 0x02;
    pub const I8: u8 = 0x03;
    pub const U8: u8 = 0x04;
    pub const I16: u8 = 0x05;
    pub const U16: u8 = 0x06;
    pub const I32: u8 = 0x07;
    pub const U32: u8 = 0x08;
    pub const I64: u8 = 0x09;
    pub const U64: u8 = 0x0a;
    pub const F32: u8 = 0x0b;
    pub const F64: u8 = 0x0c;
    pub const STR: u8 = 0x0d;
    pub const BYTES: u8 = 0x0e;
    pub const LIST: u8 = 0x0f;
    pub const MAP: u8 = 0x10;
    pub const OBJECT: u8 = 0x11;
    pub const BOOLS: u8 = 0x20;
    pub const I32S: u8 = 0x21;
    pub const I64S: u8 = 0x22;
    pub const F32S: u8 = 0x23;
    pub const F64S: u8 = 0x24;
    pub const STRS: u8 = 0x25;
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Appends tagged values to a byte buffer.
///
/// Encoding can't fail: every [`Value`] has a representation. The only
/// limit is `u32::MAX` elements per collection, which no room payload
/// comes near.
#[derive(Debug, Default)]
pub struct ValueWriter {
    buf: Vec<u8>,
}

impl ValueWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write(&mut self, value: &Value) {
        match value {
            Value::Null => self.buf.push(tag::NULL),
            Value::Bool(false) => self.buf.push(tag::FALSE),
            Value::Bool(true) => self.buf.push(tag::TRUE),
            Value::I8(n) => self.tagged(tag::I8, &n.to_be_bytes()),
            Value::U8(n) => self.tagged(tag::U8, &n.to_be_bytes()),
            Value::I16(n) => self.tagged(tag::I16, &n.to_be_bytes()),
            Value::U16(n) => self.tagged(tag::U16, &n.to_be_bytes()),
            Value::I32(n) => self.tagged(tag::I32, &n.to_be_bytes()),
            Value::U32(n) => self.tagged(tag::U32, &n.to_be_bytes()),
            Value::I64(n) => self.tagged(tag::I64, &n.to_be_bytes()),
            Value::U64(n) => self.tagged(tag::U64, &n.to_be_bytes()),
            Value::F32(n) => self.tagged(tag::F32, &n.to_be_bytes()),
            Value::F64(n) => self.tagged(tag::F64, &n.to_be_bytes()),
            Value::Str(s) => {
                self.buf.push(tag::STR);
                self.raw_str(s);
            }
            Value::Bytes(b) => {
                self.buf.push(tag::BYTES);
                self.len(b.len());
                self.buf.extend_from_slice(b);
            }
            Value::List(items) => {
                self.buf.push(tag::LIST);
                self.len(items.len());
                for item in items {
                    self.write(item);
                }
            }
            Value::Map(map) => self.write_map(map),
            Value::Bools(v) => {
                self.buf.push(tag::BOOLS);
                self.len(v.len());
                self.buf.extend(v.iter().map(|&b| u8::from(b)));
            }
            Value::I32s(v) => {
                self.buf.push(tag::I32S);
                self.len(v.len());
                v.iter().for_each(|n| self.buf.extend_from_slice(&n.to_be_bytes()));
            }
            Value::I64s(v) => {
                self.buf.push(tag::I64S);
                self.len(v.len());
                v.iter().for_each(|n| self.buf.extend_from_slice(&n.to_be_bytes()));
            }
            Value::F32s(v) => {
                self.buf.push(tag::F32S);
                self.len(v.len());
                v.iter().for_each(|n| self.buf.extend_from_slice(&n.to_be_bytes()));
            }
            Value::F64s(v) => {
                self.buf.push(tag::F64S);
                self.len(v.len());
                v.iter().for_each(|n| self.buf.extend_from_slice(&n.to_be_bytes()));
            }
            Value::Strs(v) => {
                self.buf.push(tag::STRS);
                self.len(v.len());
                for s in v {
                    self.raw_str(s);
                }
            }
            Value::Object { code, data } => {
                self.buf.push(tag::OBJECT);
                self.buf.push(*code);
                self.len(data.len());
                self.buf.extend_from_slice(data);
            }
        }
    }

    /// Writes a map in its stored (first-seen) key order.
    pub fn write_map(&mut self, map: &PropertyMap) {
        self.buf.push(tag::MAP);
        self.len(map.len());
        for (key, value) in map.iter() {
            self.raw_str(key);
            self.write(value);
        }
    }

    fn tagged(&mut self, tag: u8, bytes: &[u8]) {
        self.buf.push(tag);
        self.buf.extend_from_slice(bytes);
    }

    fn len(&mut self, len: usize) {
        let len = u32::try_from(len).unwrap_or(u32::MAX);
        self.buf.extend_from_slice(&len.to_be_bytes());
    }

    fn raw_str(&mut self, s: &str) {
        self.len(s.len());
        self.buf.extend_from_slice(s.as_bytes());
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Reads tagged values out of a borrowed byte slice.
///
/// The reader never copies the input up front; it walks `data` with a
/// cursor and only allocates for the decoded values themselves.
#[derive(Debug)]
pub struct ValueReader<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> ValueReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, depth: 0 }
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Fails with [`ProtocolError::TrailingBytes`] if anything is left.
    pub fn finish(&self) -> Result<(), ProtocolError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(ProtocolError::TrailingBytes(n)),
        }
    }

    /// Reads the next tagged value.
    pub fn read(&mut self) -> Result<Value, ProtocolError> {
        let offset = self.pos;
        let tag = self.u8()?;
        let value = match tag {
            tag::NULL => Value::Null,
            tag::FALSE => Value::Bool(false),
            tag::TRUE => Value::Bool(true),
            tag::I8 => Value::I8(i8::from_be_bytes(self.array()?)),
            tag::U8 => Value::U8(self.u8()?),
            tag::I16 => Value::I16(i16::from_be_bytes(self.array()?)),
            tag::U16 => Value::U16(u16::from_be_bytes(self.array()?)),
            tag::I32 => Value::I32(i32::from_be_bytes(self.array()?)),
            tag::U32 => Value::U32(u32::from_be_bytes(self.array()?)),
            tag::I64 => Value::I64(i64::from_be_bytes(self.array()?)),
            tag::U64 => Value::U64(u64::from_be_bytes(self.array()?)),
            tag::F32 => Value::F32(f32::from_be_bytes(self.array()?)),
            tag::F64 => Value::F64(f64::from_be_bytes(self.array()?)),
            tag::STR => Value::Str(self.raw_str()?),
            tag::BYTES => {
                let len = self.len(1)?;
                Value::Bytes(self.take(len)?.to_vec())
            }
            tag::LIST => {
                let count = self.len(1)?;
                self.descend()?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.read()?);
                }
                self.depth -= 1;
                Value::List(items)
            }
            tag::MAP => Value::Map(self.map_body()?),
            tag::OBJECT => {
                let code = self.u8()?;
                let len = self.len(1)?;
                Value::Object {
                    code,
                    data: self.take(len)?.to_vec(),
                }
            }
            tag::BOOLS => {
                let count = self.len(1)?;
                Value::Bools(self.take(count)?.iter().map(|&b| b != 0).collect())
            }
            tag::I32S => {
                let count = self.len(4)?;
                Value::I32s(self.fixed_array(count, i32::from_be_bytes)?)
            }
            tag::I64S => {
                let count = self.len(8)?;
                Value::I64s(self.fixed_array(count, i64::from_be_bytes)?)
            }
            tag::F32S => {
                let count = self.len(4)?;
                Value::F32s(self.fixed_array(count, f32::from_be_bytes)?)
            }
            tag::F64S => {
                let count = self.len(8)?;
                Value::F64s(self.fixed_array(count, f64::from_be_bytes)?)
            }
            tag::STRS => {
                // Each string needs at least its 4-byte length prefix.
                let count = self.len(4)?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.raw_str()?);
                }
                Value::Strs(items)
            }
            tag => return Err(ProtocolError::UnknownTag { tag, offset }),
        };
        Ok(value)
    }

    /// Reads a map value. A `Null` reads as an empty map; any other kind
    /// is a [`ProtocolError::TypeMismatch`].
    pub fn read_map(&mut self) -> Result<PropertyMap, ProtocolError> {
        match self.peek()? {
            tag::NULL => {
                self.pos += 1;
                Ok(PropertyMap::new())
            }
            tag::MAP => {
                self.pos += 1;
                self.map_body()
            }
            _ => Err(ProtocolError::TypeMismatch {
                expected: "map",
                found: self.read()?.kind(),
            }),
        }
    }

    fn map_body(&mut self) -> Result<PropertyMap, ProtocolError> {
        // Smallest entry: empty key (4 bytes) + Null value (1 byte).
        let count = self.len(5)?;
        self.descend()?;
        let mut map = PropertyMap::new();
        let mut seen = HashSet::with_capacity(count);
        for _ in 0..count {
            let key = self.raw_str()?;
            let value = self.read()?;
            if !seen.insert(key.clone()) {
                return Err(ProtocolError::DuplicateKey(key));
            }
            map.push_unchecked(key, value);
        }
        self.depth -= 1;
        Ok(map)
    }

    fn descend(&mut self) -> Result<(), ProtocolError> {
        if self.depth >= MAX_DEPTH {
            return Err(ProtocolError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        Ok(())
    }

    fn peek(&self) -> Result<u8, ProtocolError> {
        self.data.get(self.pos).copied().ok_or(ProtocolError::Truncated {
            needed: 1,
            offset: self.pos,
        })
    }

    fn u8(&mut self) -> Result<u8, ProtocolError> {
        let b = self.peek()?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(ProtocolError::Truncated {
                needed: n - remaining,
                offset: self.pos,
            });
        }
        let data: &'a [u8] = self.data;
        let slice = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads a `u32` length and checks that `len * min_size` bytes could
    /// still follow. This rejects absurd lengths before allocating.
    fn len(&mut self, min_size: usize) -> Result<usize, ProtocolError> {
        let len = u32::from_be_bytes(self.array()?) as usize;
        let needed = len.saturating_mul(min_size);
        let remaining = self.remaining();
        if needed > remaining {
            return Err(ProtocolError::Truncated {
                needed: needed - remaining,
                offset: self.pos,
            });
        }
        Ok(len)
    }

    fn raw_str(&mut self) -> Result<String, ProtocolError> {
        let len = self.len(1)?;
        let offset = self.pos;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ProtocolError::InvalidUtf8 { offset })
    }

    fn fixed_array<const N: usize, T>(
        &mut self,
        count: usize,
        convert: fn([u8; N]) -> T,
    ) -> Result<Vec<T>, ProtocolError> {
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(convert(self.array()?));
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Encodes a single value.
pub fn encode_value(value: &Value) -> Vec<u8> {
    let mut writer = ValueWriter::new();
    writer.write(value);
    writer.into_bytes()
}

/// Decodes exactly one value; trailing bytes are an error.
pub fn decode_value(data: &[u8]) -> Result<Value, ProtocolError> {
    let mut reader = ValueReader::new(data);
    let value = reader.read()?;
    reader.finish()?;
    Ok(value)
}

/// Encodes a property map.
pub fn encode_map(map: &PropertyMap) -> Vec<u8> {
    let mut writer = ValueWriter::new();
    writer.write_map(map);
    writer.into_bytes()
}

/// Decodes exactly one property map (or `Null`, as an empty map).
pub fn decode_map(data: &[u8]) -> Result<PropertyMap, ProtocolError> {
    let mut reader = ValueReader::new(data);
    let map = reader.read_map()?;
    reader.finish()?;
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One map holding every supported kind, nested collections included.
    fn kitchen_sink() -> PropertyMap {
        let inner = PropertyMap::new().with("deep", Value::List(vec![
            Value::Null,
            Value::Map(PropertyMap::new().with("x", 1u8)),
        ]));
        PropertyMap::new()
            .with("aaa", "public")
            .with("bbb", 13)
            .with("ccc", Value::List(vec![
                Value::I32(1),
                Value::I32(3),
                Value::from("a"),
                Value::F32(3.5),
            ]))
            .with("ddd", vec![2, 4, 5, 8])
            .with("eee", vec![-10.0, 1.1, 0.5])
            .with("flags", vec![true, false, true])
            .with("big", vec![i64::MIN, 0, i64::MAX])
            .with("f32s", vec![0.25f32, -1.0])
            .with("names", vec!["ann".to_string(), String::new()])
            .with("neg", -5i8)
            .with("u16", 65_000u16)
            .with("i16", -300i16)
            .with("u32", 4_000_000_000u32)
            .with("u64", u64::MAX)
            .with("f64", std::f64::consts::PI)
            .with("on", true)
            .with("off", false)
            .with("none", Value::Null)
            .with("blob", &[0u8, 255, 7][..])
            .with("obj", Value::Object { code: 0, data: vec![9, 9] })
            .with("nested", inner)
            .with("unicode", "ルーム")
    }

    #[test]
    fn test_map_round_trip_preserves_keys_order_and_values() {
        let map = kitchen_sink();

        let decoded = decode_map(&encode_map(&map)).unwrap();

        assert_eq!(decoded, map);
        assert_eq!(
            decoded.keys().collect::<Vec<_>>(),
            map.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_encoding_is_deterministic() {
        assert_eq!(encode_map(&kitchen_sink()), encode_map(&kitchen_sink()));
    }

    #[test]
    fn test_encode_i32_layout() {
        assert_eq!(encode_value(&Value::I32(13)), vec![0x07, 0, 0, 0, 13]);
    }

    #[test]
    fn test_encode_map_layout() {
        let map = PropertyMap::new().with("bbb", 13);
        assert_eq!(
            encode_map(&map),
            vec![
                0x10, 0, 0, 0, 1, // map, 1 entry
                0, 0, 0, 3, b'b', b'b', b'b', // key
                0x07, 0, 0, 0, 13, // i32
            ]
        );
    }

    #[test]
    fn test_decode_unknown_tag_is_format_error() {
        let err = decode_value(&[0x7f]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnknownTag { tag: 0x7f, offset: 0 }
        ));
    }

    #[test]
    fn test_decode_unknown_tag_inside_list_reports_offset() {
        // list of 1 element whose tag is bogus
        let err = decode_value(&[0x0f, 0, 0, 0, 1, 0xee]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnknownTag { tag: 0xee, offset: 5 }
        ));
    }

    #[test]
    fn test_decode_truncated_payload_is_format_error() {
        let bytes = encode_map(&kitchen_sink());
        for cut in [1, 5, bytes.len() / 2, bytes.len() - 1] {
            let result = decode_map(&bytes[..cut]);
            assert!(
                matches!(result, Err(ProtocolError::Truncated { .. })),
                "cut at {cut} should be truncated, got {result:?}"
            );
        }
    }

    #[test]
    fn test_decode_empty_input_is_truncated() {
        assert!(matches!(
            decode_value(&[]),
            Err(ProtocolError::Truncated { needed: 1, offset: 0 })
        ));
    }

    #[test]
    fn test_decode_huge_length_rejected_without_allocating() {
        let err = decode_value(&[0x0e, 0xff, 0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated { .. }));
    }

    #[test]
    fn test_decode_trailing_bytes_rejected() {
        let mut bytes = encode_value(&Value::I32(1));
        bytes.push(0);
        assert!(matches!(
            decode_value(&bytes),
            Err(ProtocolError::TrailingBytes(1))
        ));
    }

    #[test]
    fn test_decode_duplicate_key_rejected() {
        let bytes = vec![
            0x10, 0, 0, 0, 2, //
            0, 0, 0, 1, b'k', 0x00, //
            0, 0, 0, 1, b'k', 0x00,
        ];
        assert!(matches!(
            decode_map(&bytes),
            Err(ProtocolError::DuplicateKey(k)) if k == "k"
        ));
    }

    #[test]
    fn test_decode_large_map_keeps_every_key_in_order() {
        let map: PropertyMap = (0..20_000).map(|i| (format!("k{i}"), Value::Null)).collect();

        let decoded = decode_map(&encode_map(&map)).unwrap();

        assert_eq!(decoded.len(), 20_000);
        assert_eq!(decoded.keys().next(), Some("k0"));
        assert_eq!(decoded.keys().last(), Some("k19999"));
    }

    #[test]
    fn test_decode_large_map_with_late_duplicate_rejected() {
        let mut writer = ValueWriter::new();
        let mut map: PropertyMap = (0..5_000).map(|i| (format!("k{i}"), Value::I32(i))).collect();
        map.push_unchecked("k42".to_string(), Value::Null);
        writer.write_map(&map);

        let err = decode_map(&writer.into_bytes()).unwrap_err();

        assert!(matches!(err, ProtocolError::DuplicateKey(k) if k == "k42"));
    }

    #[test]
    fn test_decode_invalid_utf8_rejected() {
        let bytes = vec![0x0d, 0, 0, 0, 2, 0xff, 0xfe];
        assert!(matches!(
            decode_value(&bytes),
            Err(ProtocolError::InvalidUtf8 { offset: 5 })
        ));
    }

    #[test]
    fn test_decode_rejects_excessive_nesting() {
        let mut value = Value::Null;
        for _ in 0..=MAX_DEPTH {
            value = Value::List(vec![value]);
        }
        let bytes = encode_value(&value);
        assert!(matches!(
            decode_value(&bytes),
            Err(ProtocolError::TooDeep(_))
        ));
    }

    #[test]
    fn test_decode_map_accepts_null_as_empty() {
        assert_eq!(decode_map(&[0x00]).unwrap(), PropertyMap::new());
    }

    #[test]
    fn test_decode_map_rejects_scalar() {
        let bytes = encode_value(&Value::I32(3));
        assert!(matches!(
            decode_map(&bytes),
            Err(ProtocolError::TypeMismatch { expected: "map", found: "i32" })
        ));
    }
}
