//! Error types for the room layer.

use roomwire_protocol::{PlayerId, ProtocolError, RoomId};

/// Errors that can occur while mirroring or looking up rooms.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// No room carries this public number.
    #[error("room number {0} not found")]
    NumberNotFound(u32),

    /// The room already holds `max_players` players.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The player isn't in the local roster.
    #[error("player {0} not in room")]
    UnknownPlayer(PlayerId),

    /// Registering a room whose id or number is already taken.
    #[error("room {0} already registered")]
    AlreadyRegistered(String),

    /// Every room number in the configured range is in use.
    #[error("no free room number")]
    NumbersExhausted,

    /// A property blob or query failed to decode.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
