//! Identity and addressing types shared by every frame.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's identifier: the user id the credential was issued for.
///
/// Newtype over `String` so a `PlayerId` can't be passed where a
/// `RoomId` is expected. `#[serde(transparent)]` keeps it a bare string
/// on the wire (`"alice"`, not `{"0":"alice"}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A room's identifier, assigned by the room authority at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ---------------------------------------------------------------------------
// Target: who an RPC goes to
// ---------------------------------------------------------------------------

/// The recipients of an outbound RPC.
///
/// Resolution happens at the room authority; the client only names the
/// selector. `Players(vec![])` is legal and reaches nobody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// One specific player.
    Player(PlayerId),
    /// An explicit list of players.
    Players(Vec<PlayerId>),
    /// Whoever is master when the authority processes the frame.
    Master,
    /// Every member of the room, sender included.
    All,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player(id) => write!(f, "player {id}"),
            Self::Players(ids) => write!(f, "{} players", ids.len()),
            Self::Master => f.write_str("master"),
            Self::All => f.write_str("all"),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomSelector: which room to join or watch
// ---------------------------------------------------------------------------

/// How a join or watch request picks its room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomSelector {
    /// A room id returned by create or search.
    Id(RoomId),
    /// The short public number of a room created with numbering enabled.
    Number(u32),
    /// Any joinable room in the search group; the authority picks one
    /// that satisfies the request's query.
    Random { search_group: u32 },
}

impl fmt::Display for RoomSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "room {id}"),
            Self::Number(n) => write!(f, "room #{n}"),
            Self::Random { search_group } => {
                write!(f, "random room in group {search_group}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// JoinFailure: why the authority refused a create/join/watch
// ---------------------------------------------------------------------------

/// Reason a create, join or watch request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinFailure {
    RoomFull,
    NotFound,
    DeadlineExceeded,
    AuthRejected,
    Other(String),
}

impl fmt::Display for JoinFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoomFull => f.write_str("room full"),
            Self::NotFound => f.write_str("room not found"),
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
            Self::AuthRejected => f.write_str("authentication rejected"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}
