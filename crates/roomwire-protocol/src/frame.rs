//! Frames exchanged between a client session and the room authority.
//!
//! Every frame is an [`Envelope`]. The envelope itself is serde-encoded
//! (JSON by default, see [`crate::JsonCodec`]); the dynamic parts inside
//! it (property maps, RPC payloads, queries) are opaque `Vec<u8>` blobs
//! in the tagged binary format of [`crate::serial`]. Keeping them opaque
//! means the envelope codec never has to understand property values, and
//! a malformed property blob fails only when someone decodes it.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ seq: 7        timestamp: 1718000000123   │
//! │ payload: Client(ChangeMyProperty {       │
//! │     props: [10 00 00 00 01 ...]          │  ← tagged binary map
//! │ })                                       │
//! └──────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::{JoinFailure, PlayerId, RoomId, RoomSelector, Target};

// ---------------------------------------------------------------------------
// Room snapshots
// ---------------------------------------------------------------------------

/// Options for a room being created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSpec {
    pub visible: bool,
    pub joinable: bool,
    pub watchable: bool,
    /// Ask the authority to assign a short public room number.
    pub with_number: bool,
    pub search_group: u32,
    pub max_players: u32,
    /// Seconds the authority waits for liveness before evicting a client.
    pub client_deadline: u32,
    pub public_props: Vec<u8>,
    pub private_props: Vec<u8>,
}

/// Full room snapshot, sent once when a session enters a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: RoomId,
    pub number: Option<u32>,
    pub visible: bool,
    pub joinable: bool,
    pub watchable: bool,
    pub search_group: u32,
    pub max_players: u32,
    pub client_deadline: u32,
    pub public_props: Vec<u8>,
    pub private_props: Vec<u8>,
    /// Unix seconds.
    pub created: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub props: Vec<u8>,
}

/// A partial room update. Absent fields mean "unchanged".
///
/// The flags are tri-state on purpose: `None` leaves the local flag
/// alone, `Some(false)` clears it. Missing JSON keys decode as `None`,
/// and `None` fields are left out when encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDiff {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joinable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watchable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_group: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_players: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_deadline: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_props: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_props: Option<Vec<u8>>,
}

// ---------------------------------------------------------------------------
// Client → authority
// ---------------------------------------------------------------------------

/// Requests a session sends to the room authority.
///
/// Internally tagged (`{"type": "Rpc", "code": 1, ...}`), like every
/// message enum in the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    Create {
        room: RoomSpec,
        player_props: Vec<u8>,
    },
    Join {
        room: RoomSelector,
        /// Encoded query the room must satisfy, if any.
        query: Option<Vec<u8>>,
        player_props: Vec<u8>,
    },
    Watch {
        room: RoomSelector,
        query: Option<Vec<u8>>,
    },
    Leave {
        message: String,
    },
    Rpc {
        code: u8,
        target: Target,
        data: Vec<u8>,
    },
    ChangeRoomProperty {
        diff: RoomDiff,
    },
    ChangeMyProperty {
        props: Vec<u8>,
    },
    SwitchMaster {
        target: PlayerId,
    },
    Kick {
        target: PlayerId,
        message: String,
    },
    Pause,
    Restart,
    Ping {
        /// Sender clock, Unix milliseconds. Echoed back in `Pong`.
        timestamp: u64,
    },
}

impl ClientMessage {
    /// Variant name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Join { .. } => "join",
            Self::Watch { .. } => "watch",
            Self::Leave { .. } => "leave",
            Self::Rpc { .. } => "rpc",
            Self::ChangeRoomProperty { .. } => "change_room_property",
            Self::ChangeMyProperty { .. } => "change_my_property",
            Self::SwitchMaster { .. } => "switch_master",
            Self::Kick { .. } => "kick",
            Self::Pause => "pause",
            Self::Restart => "restart",
            Self::Ping { .. } => "ping",
        }
    }
}

// ---------------------------------------------------------------------------
// Authority → client
// ---------------------------------------------------------------------------

/// Events the room authority pushes to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RoomEvent {
    /// The create/join/watch request succeeded.
    Entered {
        room: RoomInfo,
        /// Members in join order. A watcher is not listed.
        players: Vec<PlayerInfo>,
        master: PlayerId,
        me: PlayerId,
        watcher: bool,
    },
    /// The create/join/watch request failed. Terminal for the session.
    JoinRejected {
        reason: JoinFailure,
    },
    PlayerJoined {
        player: PlayerInfo,
    },
    /// A player reconnected. Carries their current properties.
    PlayerRejoined {
        player: PlayerInfo,
    },
    PlayerLeft {
        player: PlayerId,
        message: String,
    },
    MasterSwitched {
        master: PlayerId,
    },
    /// An accepted room change. Only the fields that changed are set.
    RoomPropertyChanged {
        diff: RoomDiff,
    },
    /// A player's property delta.
    PlayerPropertyChanged {
        player: PlayerId,
        props: Vec<u8>,
    },
    Rpc {
        sender: PlayerId,
        code: u8,
        data: Vec<u8>,
    },
    Pong {
        /// The `timestamp` of the ping being answered.
        timestamp: u64,
        watchers: u32,
        /// Last time (Unix ms) the authority heard from each player.
        last_message: Vec<(PlayerId, u64)>,
    },
    /// A request identified by its envelope `seq` was refused.
    RequestFailed {
        seq: u64,
        reason: String,
    },
    /// A non-fatal problem the authority wants reported.
    Error {
        message: String,
    },
    /// Orderly end of membership (leave, kick, room closed).
    Closed {
        message: String,
    },
    /// Forced end of membership (deadline expired, authority fault).
    Evicted {
        reason: String,
    },
}

impl RoomEvent {
    /// Variant name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Entered { .. } => "entered",
            Self::JoinRejected { .. } => "join_rejected",
            Self::PlayerJoined { .. } => "player_joined",
            Self::PlayerRejoined { .. } => "player_rejoined",
            Self::PlayerLeft { .. } => "player_left",
            Self::MasterSwitched { .. } => "master_switched",
            Self::RoomPropertyChanged { .. } => "room_property_changed",
            Self::PlayerPropertyChanged { .. } => "player_property_changed",
            Self::Rpc { .. } => "rpc",
            Self::Pong { .. } => "pong",
            Self::RequestFailed { .. } => "request_failed",
            Self::Error { .. } => "error",
            Self::Closed { .. } => "closed",
            Self::Evicted { .. } => "evicted",
        }
    }
}

// ---------------------------------------------------------------------------
// Payload & Envelope
// ---------------------------------------------------------------------------

/// Which direction a frame travels.
///
/// Adjacently tagged: `{"type": "Client", "data": {"type": "Pause"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    Client(ClientMessage),
    Room(RoomEvent),
}

/// The top-level frame on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-sender sequence number, starting at 1. Authority responses
    /// about a request (`RequestFailed`) quote the request's `seq`.
    pub seq: u64,
    /// Sender clock, Unix milliseconds.
    pub timestamp: u64,
    pub payload: Payload,
}

impl Envelope {
    pub fn client(seq: u64, timestamp: u64, message: ClientMessage) -> Self {
        Self {
            seq,
            timestamp,
            payload: Payload::Client(message),
        }
    }

    pub fn room(seq: u64, timestamp: u64, event: RoomEvent) -> Self {
        Self {
            seq,
            timestamp,
            payload: Payload::Room(event),
        }
    }
}
