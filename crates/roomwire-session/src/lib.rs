//! Room sessions for Roomwire.
//!
//! This crate is the client side of a room:
//!
//! 1. **Credentials**: signing the connect request ([`Credential`])
//! 2. **RPC dispatch**: typed messages by numeric code ([`RpcRegistry`])
//! 3. **Session lifecycle**: create/join/watch, property sync, master
//!    switch, pause/restart ([`Session`], [`SessionState`])
//! 4. **Callback pump**: inbound events run callbacks only inside
//!    [`Session::pump`], in arrival order
//!
//! # How it fits in the stack
//!
//! ```text
//! Facade (above)      ← builds credentials, opens sessions, searches rooms
//!     ↕
//! Session (this crate) ← state machine, RPC registry, callback pump
//!     ↕
//! Room + Transport + Protocol (below) ← room mirror, byte pipes, frames
//! ```

mod auth;
mod callbacks;
mod config;
mod error;
mod pump;
mod rpc;
mod session;

pub use auth::{APP_ID_HEADER, AUTHORIZATION_HEADER, Credential, USER_ID_HEADER};
pub use callbacks::PingStats;
pub use config::SessionConfig;
pub use error::SessionError;
pub use rpc::RpcRegistry;
pub use session::{Session, SessionState};
