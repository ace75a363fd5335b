//! The local copy of a room's settings and properties.

use roomwire_protocol::{PropertyMap, ProtocolError, RoomId, RoomInfo};

use crate::RoomChange;

/// A session's view of the room it is in.
///
/// The authoritative copy lives with the room authority. This one is
/// built from the snapshot received on entry and then kept current by
/// applying accepted diffs in arrival order; it is never changed
/// optimistically by a local request.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomDescriptor {
    pub id: RoomId,
    /// Short public number, if the room was created with one.
    pub number: Option<u32>,
    pub visible: bool,
    pub joinable: bool,
    pub watchable: bool,
    pub search_group: u32,
    pub max_players: u32,
    /// Seconds of silence before the authority evicts a client.
    pub client_deadline: u32,
    pub public_props: PropertyMap,
    /// Only visible to joined members; empty for watchers.
    pub private_props: PropertyMap,
    /// Unix seconds.
    pub created: u64,
}

impl RoomDescriptor {
    pub fn from_info(info: &RoomInfo) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: info.id.clone(),
            number: info.number,
            visible: info.visible,
            joinable: info.joinable,
            watchable: info.watchable,
            search_group: info.search_group,
            max_players: info.max_players,
            client_deadline: info.client_deadline,
            public_props: PropertyMap::from_bytes(&info.public_props)?,
            private_props: PropertyMap::from_bytes(&info.private_props)?,
            created: info.created,
        })
    }

    pub fn to_info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id.clone(),
            number: self.number,
            visible: self.visible,
            joinable: self.joinable,
            watchable: self.watchable,
            search_group: self.search_group,
            max_players: self.max_players,
            client_deadline: self.client_deadline,
            public_props: self.public_props.to_bytes(),
            private_props: self.private_props.to_bytes(),
            created: self.created,
        }
    }

    /// Applies an accepted diff. Fields the diff leaves unset keep their
    /// current value; property deltas are merged key by key.
    pub fn apply_change(&mut self, change: &RoomChange) {
        if let Some(v) = change.visible {
            self.visible = v;
        }
        if let Some(v) = change.joinable {
            self.joinable = v;
        }
        if let Some(v) = change.watchable {
            self.watchable = v;
        }
        if let Some(v) = change.search_group {
            self.search_group = v;
        }
        if let Some(v) = change.max_players {
            self.max_players = v;
        }
        if let Some(v) = change.client_deadline {
            self.client_deadline = v;
        }
        if let Some(delta) = &change.public_props {
            self.public_props.apply_delta(delta);
        }
        if let Some(delta) = &change.private_props {
            self.private_props.apply_delta(delta);
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_room() -> RoomDescriptor {
    RoomDescriptor {
        id: RoomId::from("r1"),
        number: Some(42),
        visible: true,
        joinable: true,
        watchable: true,
        search_group: 100,
        max_players: 10,
        client_deadline: 30,
        public_props: PropertyMap::new().with("aaa", "public").with("bbb", 13),
        private_props: PropertyMap::new().with("aaa", "private"),
        created: 1_700_000_000,
    }
}
