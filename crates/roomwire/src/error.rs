//! Unified error type for the Roomwire client.

use roomwire_protocol::ProtocolError;
use roomwire_room::RoomError;
use roomwire_session::SessionError;
use roomwire_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `roomwire` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
#[derive(Debug, thiserror::Error)]
pub enum RoomwireError {
    /// Connecting or sending failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame or property blob had the wrong shape.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session refused a call (wrong state, not master, RPC code).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room lookup or search failed.
    #[error(transparent)]
    Room(#[from] RoomError),
}
