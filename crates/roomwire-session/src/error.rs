//! Error types for the session layer.

use roomwire_protocol::ProtocolError;
use roomwire_room::RoomError;
use roomwire_transport::TransportError;

use crate::SessionState;

/// Errors that can occur while running a room session.
///
/// Everything here is reported synchronously to the caller of a session
/// method. Failures the room authority decides on (a rejected join, a
/// refused property change) arrive later through callbacks instead.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// An RPC code is already bound to a different message type.
    #[error("rpc code {code} already registered for {existing}")]
    DuplicateCode { code: u8, existing: &'static str },

    /// No message type is registered under this RPC code.
    #[error("rpc code {0} is not registered")]
    UnknownCode(u8),

    /// The code is registered, but for another type than the one sent.
    #[error("rpc code {code} carries {registered}, not {sent}")]
    WrongType {
        code: u8,
        registered: &'static str,
        sent: &'static str,
    },

    /// The operation isn't valid in the session's current state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// The session has ended; it accepts no further operations.
    #[error("session is closed")]
    Closed,

    /// Watchers can't change the room or its players.
    #[error("watchers cannot {0}")]
    Watcher(&'static str),

    /// Only the room master may do this.
    #[error("only the master can {0}")]
    NotMaster(&'static str),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Room(#[from] RoomError),
}
