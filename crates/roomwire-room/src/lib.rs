//! Room-side state for Roomwire.
//!
//! A session mirrors the room it is in: settings and properties in a
//! [`RoomDescriptor`], members in a [`Roster`]. The mirror only changes
//! when the room authority says so, through [`RoomChange`] diffs and
//! membership events.
//!
//! Finding rooms goes through the [`Searcher`] boundary with a
//! [`SearchRequest`], usually filtered by a [`Query`]. [`RoomDirectory`]
//! is an in-memory implementation of that boundary.
//!
//! # Key types
//!
//! - [`RoomDescriptor`]: local copy of the room's settings and properties
//! - [`Roster`] / [`PlayerDescriptor`]: players in join order, one master
//! - [`RoomChange`]: a partial update with tri-state flags
//! - [`Query`]: conjunctive search predicates over public properties
//! - [`RoomDirectory`]: registry of room summaries that answers searches

#![allow(async_fn_in_trait)]

mod change;
mod descriptor;
mod directory;
mod error;
mod query;
mod roster;
mod search;

pub use change::RoomChange;
pub use descriptor::RoomDescriptor;
pub use directory::{DirectoryConfig, RoomDirectory};
pub use error::RoomError;
pub use query::{Op, Query, Term};
pub use roster::{PlayerDescriptor, Roster};
pub use search::{RoomSummary, SearchRequest, Searcher};
