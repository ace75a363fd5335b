//! Ordered property maps.
//!
//! A [`PropertyMap`] keeps keys in first-seen order. Order matters more
//! than it seems: it makes the binary encoding deterministic and makes
//! anything printed to an operator reproducible run after run. A
//! `HashMap` would shuffle both.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{ProtocolError, Value, serial};

/// An ordered string-keyed map of [`Value`]s with unique keys.
///
/// Backed by a `Vec` of pairs: property maps hold a handful of keys, so
/// a linear scan beats hashing and keeps insertion order for free.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    entries: Vec<(String, Value)>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy in tests and room options:
    /// `PropertyMap::new().with("bbb", 13)`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces a key.
    ///
    /// A replaced key keeps its original position. Returns the previous
    /// value, if any.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Removes a key, shifting later keys down to keep their order.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Applies a partial update received from the room authority.
    ///
    /// Each key in `delta` is inserted or replaced in place; a `Null`
    /// value deletes the key instead. Keys not mentioned are untouched.
    pub fn apply_delta(&mut self, delta: &PropertyMap) {
        for (key, value) in delta.iter() {
            if value.is_null() {
                self.remove(key);
            } else {
                self.insert(key, value.clone());
            }
        }
    }

    /// Encodes the map with the tagged binary codec.
    pub fn to_bytes(&self) -> Vec<u8> {
        serial::encode_map(self)
    }

    /// Decodes a map written by [`PropertyMap::to_bytes`].
    ///
    /// A payload holding a single `Null` decodes to an empty map, so
    /// "no properties" can be sent either way.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        serial::decode_map(data)
    }

    /// Pushes a pair without the duplicate check. The decoder has already
    /// verified uniqueness.
    pub(crate) fn push_unchecked(&mut self, key: String, value: Value) {
        self.entries.push((key, value));
    }
}

/// Serializes as the tagged binary encoding, the same bytes a frame
/// carries, so config files and frames agree on one representation.
impl Serialize for PropertyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for PropertyMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for PropertyMap {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// `key:value,` for every entry, in order. This is the format printed
/// when an operator inspects a room or a property-change result.
impl fmt::Display for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.iter() {
            write!(f, "{key}:{value},")?;
        }
        Ok(())
    }
}
