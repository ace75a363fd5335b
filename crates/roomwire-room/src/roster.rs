//! Players in a room, in join order, with one master.

use roomwire_protocol::{PlayerId, PlayerInfo, PropertyMap, ProtocolError};

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerDescriptor {
    pub id: PlayerId,
    pub props: PropertyMap,
}

impl PlayerDescriptor {
    pub fn new(id: PlayerId, props: PropertyMap) -> Self {
        Self { id, props }
    }

    pub fn from_info(info: &PlayerInfo) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: info.id.clone(),
            props: PropertyMap::from_bytes(&info.props)?,
        })
    }

    pub fn to_info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id.clone(),
            props: self.props.to_bytes(),
        }
    }
}

/// The room's players.
///
/// Iteration order is join order. A player who rejoins keeps their
/// original slot. The master is a single optional id, so there is never
/// more than one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    players: Vec<PlayerDescriptor>,
    master: Option<PlayerId>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a roster from an entry snapshot. Later duplicates of an id
    /// replace the earlier entry in place.
    pub fn from_players(
        players: impl IntoIterator<Item = PlayerDescriptor>,
        master: Option<PlayerId>,
    ) -> Self {
        let mut roster = Self { players: Vec::new(), master };
        for player in players {
            roster.upsert(player);
        }
        roster
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: &PlayerId) -> Option<&PlayerDescriptor> {
        self.players.iter().find(|p| p.id == *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerDescriptor> {
        self.players.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &PlayerId> {
        self.players.iter().map(|p| &p.id)
    }

    pub fn master_id(&self) -> Option<&PlayerId> {
        self.master.as_ref()
    }

    pub fn master(&self) -> Option<&PlayerDescriptor> {
        self.master.as_ref().and_then(|id| self.get(id))
    }

    pub fn is_master(&self, id: &PlayerId) -> bool {
        self.master.as_ref() == Some(id)
    }

    /// Adds a player, or replaces the properties of one already present.
    /// Returns `true` if the player was new.
    pub fn upsert(&mut self, player: PlayerDescriptor) -> bool {
        match self.players.iter_mut().find(|p| p.id == player.id) {
            Some(existing) => {
                existing.props = player.props;
                false
            }
            None => {
                self.players.push(player);
                true
            }
        }
    }

    /// Removes a player, keeping the rest in order. The master pointer is
    /// left alone: the authority announces the new master separately.
    pub fn remove(&mut self, id: &PlayerId) -> Option<PlayerDescriptor> {
        let index = self.players.iter().position(|p| p.id == *id)?;
        Some(self.players.remove(index))
    }

    /// Replaces the master pointer, returning the previous master.
    pub fn set_master(&mut self, id: PlayerId) -> Option<PlayerId> {
        self.master.replace(id)
    }

    /// Merges a property delta into one player. Returns `false` if the
    /// player isn't present.
    pub fn apply_props(&mut self, id: &PlayerId, delta: &PropertyMap) -> bool {
        match self.players.iter_mut().find(|p| p.id == *id) {
            Some(player) => {
                player.props.apply_delta(delta);
                true
            }
            None => false,
        }
    }
}
