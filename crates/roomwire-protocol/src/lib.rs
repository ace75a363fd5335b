//! Wire protocol for Roomwire.
//!
//! This crate defines what a room session and the room authority say to
//! each other:
//!
//! - **Values** ([`Value`], [`PropertyMap`]): the tagged, dynamically
//!   typed data that room/player properties and RPC payloads are made of.
//! - **Binary codec** ([`serial`]): a deterministic, self-describing
//!   byte encoding for those values.
//! - **Frames** ([`Envelope`], [`ClientMessage`], [`RoomEvent`]): the
//!   fixed message structures, serde-encoded by a [`Codec`].
//! - **Conversions** ([`WireValue`]): Rust types ⇄ [`Value`].
//!
//! ```text
//! Transport (bytes) → Codec (Envelope) → Session (room mirror, callbacks)
//!                                          └─ serial (property blobs)
//! ```

mod codec;
mod error;
mod frame;
mod props;
pub mod serial;
mod types;
mod value;
mod wire;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use frame::{
    ClientMessage, Envelope, Payload, PlayerInfo, RoomDiff, RoomEvent, RoomInfo,
    RoomSpec,
};
pub use props::PropertyMap;
pub use types::{JoinFailure, PlayerId, RoomId, RoomSelector, Target};
pub use value::Value;
pub use wire::WireValue;
