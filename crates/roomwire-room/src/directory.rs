//! In-memory room directory.

use std::collections::HashMap;

use rand::Rng;
use roomwire_protocol::RoomId;
use serde::{Deserialize, Serialize};

use crate::{RoomChange, RoomError, RoomSummary, SearchRequest, Searcher};

/// Directory settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Room numbers are drawn from `1..=max_room_number`.
    pub max_room_number: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            max_room_number: 999_999,
        }
    }
}

/// Tracks room summaries and answers [`SearchRequest`]s.
///
/// Whoever runs the room authority registers rooms here and keeps their
/// player counts and public properties current; clients search it
/// through [`Searcher`]. Results are ordered by creation time (then id)
/// so the same directory always answers the same way.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    config: DirectoryConfig,
    rooms: HashMap<RoomId, RoomSummary>,
    /// Number → room, for lookups by number.
    numbers: HashMap<u32, RoomId>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DirectoryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Adds a room. Its id, and its number if it has one, must be unused.
    pub fn register(&mut self, summary: RoomSummary) -> Result<(), RoomError> {
        if self.rooms.contains_key(&summary.id) {
            return Err(RoomError::AlreadyRegistered(summary.id.to_string()));
        }
        if let Some(number) = summary.number {
            if self.numbers.contains_key(&number) {
                return Err(RoomError::AlreadyRegistered(format!("#{number}")));
            }
            self.numbers.insert(number, summary.id.clone());
        }
        tracing::info!(room_id = %summary.id, number = ?summary.number, "room registered");
        self.rooms.insert(summary.id.clone(), summary);
        Ok(())
    }

    /// Removes a room and frees its number.
    pub fn remove(&mut self, id: &RoomId) -> Option<RoomSummary> {
        let summary = self.rooms.remove(id)?;
        if let Some(number) = summary.number {
            self.numbers.remove(&number);
        }
        tracing::info!(room_id = %id, "room removed");
        Some(summary)
    }

    pub fn get(&self, id: &RoomId) -> Option<&RoomSummary> {
        self.rooms.get(id)
    }

    pub fn by_number(&self, number: u32) -> Option<&RoomSummary> {
        self.numbers.get(&number).and_then(|id| self.rooms.get(id))
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn set_player_count(&mut self, id: &RoomId, count: u32) -> Result<(), RoomError> {
        let room = self
            .rooms
            .get_mut(id)
            .ok_or_else(|| RoomError::NotFound(id.clone()))?;
        room.player_count = count;
        Ok(())
    }

    /// Applies an accepted room change to the summary. Private properties
    /// and the client deadline aren't part of a summary and are ignored.
    pub fn apply_change(&mut self, id: &RoomId, change: &RoomChange) -> Result<(), RoomError> {
        let room = self
            .rooms
            .get_mut(id)
            .ok_or_else(|| RoomError::NotFound(id.clone()))?;
        if let Some(v) = change.visible {
            room.visible = v;
        }
        if let Some(v) = change.joinable {
            room.joinable = v;
        }
        if let Some(v) = change.watchable {
            room.watchable = v;
        }
        if let Some(v) = change.search_group {
            room.search_group = v;
        }
        if let Some(v) = change.max_players {
            room.max_players = v;
        }
        if let Some(delta) = &change.public_props {
            room.public_props.apply_delta(delta);
        }
        Ok(())
    }

    /// Picks an unused room number.
    ///
    /// Tries random numbers first and falls back to a scan, so a nearly
    /// full range still succeeds.
    pub fn allocate_number(&self) -> Result<u32, RoomError> {
        let max = self.config.max_room_number.max(1);
        let mut rng = rand::rng();
        for _ in 0..16 {
            let n = rng.random_range(1..=max);
            if !self.numbers.contains_key(&n) {
                return Ok(n);
            }
        }
        (1..=max)
            .find(|n| !self.numbers.contains_key(n))
            .ok_or(RoomError::NumbersExhausted)
    }

    /// Answers a search synchronously.
    pub fn find(&self, request: &SearchRequest) -> Vec<RoomSummary> {
        match request {
            SearchRequest::Query {
                search_group,
                query,
                limit,
                include_full,
                include_closed,
            } => {
                let mut found: Vec<&RoomSummary> = self
                    .rooms
                    .values()
                    .filter(|room| {
                        room.search_group == *search_group
                            && room.visible
                            && (*include_closed || room.joinable)
                            && (*include_full || !room.is_full())
                            && query.matches(&room.public_props)
                    })
                    .collect();
                found.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
                if *limit > 0 {
                    found.truncate(*limit);
                }
                found.into_iter().cloned().collect()
            }
            SearchRequest::Ids(ids) => ids.iter().filter_map(|id| self.get(id)).cloned().collect(),
            SearchRequest::Numbers(numbers) => numbers
                .iter()
                .filter_map(|&n| self.by_number(n))
                .cloned()
                .collect(),
        }
    }
}

impl Searcher for RoomDirectory {
    async fn search(&self, request: SearchRequest) -> Result<Vec<RoomSummary>, RoomError> {
        let rooms = self.find(&request);
        tracing::debug!(results = rooms.len(), "directory search");
        Ok(rooms)
    }
}
