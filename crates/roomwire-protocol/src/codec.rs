//! Envelope codecs.
//!
//! The session doesn't care how an [`Envelope`](crate::Envelope) becomes
//! bytes, only that something implementing [`Codec`] does it. Dynamic
//! values inside the envelope are already binary (see
//! [`crate::serial`]), so the envelope codec only has to handle a small,
//! fixed set of structs and enums.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes serde types to bytes and back.
///
/// `Send + Sync + 'static` so one codec can be shared with the transport
/// task that feeds the session queue.
pub trait Codec: Send + Sync + 'static {
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value can't be
    /// represented in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// # Errors
    /// Returns [`ProtocolError::Decode`] on malformed or incomplete input,
    /// or when the bytes describe a different type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// Human-readable frames make a session easy to trace with a WebSocket
/// inspector. Behind the `json` feature (on by default).
///
/// ```rust
/// use roomwire_protocol::{ClientMessage, Codec, Envelope, JsonCodec};
///
/// let codec = JsonCodec;
/// let envelope = Envelope::client(1, 5000, ClientMessage::Ping { timestamp: 5000 });
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientMessage, Envelope, RoomEvent};

    #[test]
    fn test_json_codec_round_trips_envelope() {
        let codec = JsonCodec;
        let envelope = Envelope::room(
            2,
            10,
            RoomEvent::Closed {
                message: "bye".into(),
            },
        );

        let bytes = codec.encode(&envelope).unwrap();
        let decoded: Envelope = codec.decode(&bytes).unwrap();

        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let result: Result<Envelope, _> = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_json_codec_decode_wrong_direction_still_parses() {
        // Direction is part of the payload; the codec doesn't police it.
        let bytes = JsonCodec
            .encode(&Envelope::client(1, 1, ClientMessage::Pause))
            .unwrap();
        let decoded: Envelope = JsonCodec.decode(&bytes).unwrap();
        assert!(matches!(
            decoded.payload,
            crate::Payload::Client(ClientMessage::Pause)
        ));
    }
}
