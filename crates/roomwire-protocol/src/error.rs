//! Error types for the protocol layer.
//!
//! Each crate in Roomwire defines its own error enum. A `ProtocolError`
//! always means "these bytes (or this value) don't have the shape we
//! expected": it never says anything about the network or the room.

/// Errors that can occur in the protocol layer.
///
/// Format errors (`UnknownTag`, `Truncated`, ...) are fatal to the single
/// payload being decoded and to nothing else. The session reports them
/// once and drops the frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Envelope serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Envelope deserialization failed: malformed JSON, missing
    /// fields, or an unknown message type.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A value payload used a type tag this codec doesn't know.
    #[error("unknown type tag {tag:#04x} at offset {offset}")]
    UnknownTag { tag: u8, offset: usize },

    /// A value payload ended before the value it announced.
    #[error("truncated payload: needed {needed} more bytes at offset {offset}")]
    Truncated { needed: usize, offset: usize },

    /// A string inside a value payload was not valid UTF-8.
    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// A map payload contained the same key twice.
    #[error("duplicate property key {0:?}")]
    DuplicateKey(String),

    /// Bytes were left over after the top-level value was decoded.
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    /// Nested lists/maps went deeper than the codec allows.
    #[error("value nesting deeper than {0} levels")]
    TooDeep(usize),

    /// A decoded value had a different kind than the caller asked for,
    /// e.g. an RPC registered for `String` received an integer.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The message is well-formed but violates protocol rules.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
