//! # Roomwire
//!
//! Client-side room sessions for real-time multiplayer games.
//!
//! A remote room authority owns every room. Roomwire signs in to it,
//! creates, joins or watches a room, mirrors the room's properties and
//! roster locally, and routes typed RPCs between players. Network events
//! are queued and only acted on when the application calls
//! [`Session::pump`](roomwire_session::Session::pump), so all callbacks run
//! on the caller's thread, in arrival order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roomwire::prelude::*;
//!
//! # async fn run() -> Result<(), RoomwireError> {
//! roomwire::init_tracing("info");
//!
//! let config = ClientConfig::new("wss://rooms.example.com", "my-app", "alice", "secret");
//! let client = Client::new(config, WebSocketConnector, RoomDirectory::new());
//!
//! let query = Query::new().between("bbb", 20, 80);
//! let mut session = client.join_random(100, &query, &PropertyMap::new())?;
//! session.register_rpc::<String>(1, |from, text| println!("{from}: {text}"))?;
//! session.pump();
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod option;

pub use client::{Client, ClientConfig};
pub use error::RoomwireError;
pub use option::RoomOption;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, or by
/// `default_directive` when `RUST_LOG` is unset or invalid.
///
/// Returns `false` if a global subscriber was already set; calling it
/// again is harmless.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .is_ok()
}

pub mod prelude {
    pub use crate::{Client, ClientConfig, RoomOption, RoomwireError, init_tracing};
    pub use roomwire_protocol::{
        JoinFailure, PlayerId, PropertyMap, RoomId, RoomSelector, Target, Value, WireValue,
    };
    pub use roomwire_room::{
        PlayerDescriptor, Query, RoomChange, RoomDescriptor, RoomDirectory, RoomSummary, Roster,
        SearchRequest, Searcher,
    };
    pub use roomwire_session::{
        Credential, PingStats, Session, SessionConfig, SessionError, SessionState,
    };
    pub use roomwire_transport::{ChannelConnector, Connector, WebSocketConnector};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing("debug");
        assert!(!init_tracing("debug"));
    }
}
