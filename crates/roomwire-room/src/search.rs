//! The search boundary: what a client asks for and what it gets back.

use roomwire_protocol::{PropertyMap, RoomId};

use crate::{Query, RoomDescriptor, RoomError};

/// A room search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchRequest {
    /// Visible rooms in one search group that satisfy `query`.
    Query {
        search_group: u32,
        query: Query,
        /// Maximum results; 0 means no limit.
        limit: usize,
        /// Also return rooms that are at `max_players`.
        include_full: bool,
        /// Also return rooms that are not joinable.
        include_closed: bool,
    },
    /// Explicit room ids, in the order given. Unknown ids are skipped.
    Ids(Vec<RoomId>),
    /// Explicit room numbers, in the order given. Unknown numbers are
    /// skipped.
    Numbers(Vec<u32>),
}

impl SearchRequest {
    /// Every joinable, non-full, visible room in the group.
    pub fn group(search_group: u32) -> Self {
        Self::Query {
            search_group,
            query: Query::new(),
            limit: 0,
            include_full: false,
            include_closed: false,
        }
    }

    /// Sets the query. No effect on id or number lookups.
    #[must_use]
    pub fn query(mut self, q: Query) -> Self {
        if let Self::Query { query, .. } = &mut self {
            *query = q;
        }
        self
    }

    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        if let Self::Query { limit, .. } = &mut self {
            *limit = n;
        }
        self
    }

    #[must_use]
    pub fn include_full(mut self, yes: bool) -> Self {
        if let Self::Query { include_full, .. } = &mut self {
            *include_full = yes;
        }
        self
    }

    #[must_use]
    pub fn include_closed(mut self, yes: bool) -> Self {
        if let Self::Query { include_closed, .. } = &mut self {
            *include_closed = yes;
        }
        self
    }
}

/// What a search returns for each room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSummary {
    pub id: RoomId,
    pub number: Option<u32>,
    pub search_group: u32,
    pub visible: bool,
    pub joinable: bool,
    pub watchable: bool,
    pub player_count: u32,
    pub max_players: u32,
    pub public_props: PropertyMap,
    /// Unix seconds.
    pub created: u64,
}

impl RoomSummary {
    pub fn from_descriptor(room: &RoomDescriptor, player_count: u32) -> Self {
        Self {
            id: room.id.clone(),
            number: room.number,
            search_group: room.search_group,
            visible: room.visible,
            joinable: room.joinable,
            watchable: room.watchable,
            player_count,
            max_players: room.max_players,
            public_props: room.public_props.clone(),
            created: room.created,
        }
    }

    pub fn is_full(&self) -> bool {
        self.player_count >= self.max_players
    }
}

/// Something that can answer room searches: a lobby service over HTTP,
/// or the in-memory [`RoomDirectory`](crate::RoomDirectory).
pub trait Searcher {
    async fn search(&self, request: SearchRequest) -> Result<Vec<RoomSummary>, RoomError>;
}
