//! Settings for a room the client creates.

use roomwire_protocol::{PropertyMap, RoomSpec};
use serde::{Deserialize, Serialize};

/// How a new room should be set up.
///
/// ```rust
/// use roomwire::prelude::*;
///
/// let option = RoomOption::default()
///     .max_players(10)
///     .public_props(PropertyMap::new().with("bbb", 13));
/// assert!(option.visible);
/// assert_eq!(option.client_deadline, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomOption {
    /// Listed in searches.
    pub visible: bool,
    pub joinable: bool,
    pub watchable: bool,
    /// Ask for a short public room number.
    pub with_number: bool,
    pub search_group: u32,
    pub max_players: u32,
    /// Seconds without traffic before the authority evicts a client.
    pub client_deadline: u32,
    pub public_props: PropertyMap,
    pub private_props: PropertyMap,
}

impl Default for RoomOption {
    fn default() -> Self {
        Self {
            visible: true,
            joinable: true,
            watchable: true,
            with_number: false,
            search_group: 0,
            max_players: 4,
            client_deadline: 30,
            public_props: PropertyMap::new(),
            private_props: PropertyMap::new(),
        }
    }
}

impl RoomOption {
    #[must_use]
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    #[must_use]
    pub fn joinable(mut self, joinable: bool) -> Self {
        self.joinable = joinable;
        self
    }

    #[must_use]
    pub fn watchable(mut self, watchable: bool) -> Self {
        self.watchable = watchable;
        self
    }

    #[must_use]
    pub fn with_number(mut self, with_number: bool) -> Self {
        self.with_number = with_number;
        self
    }

    #[must_use]
    pub fn search_group(mut self, group: u32) -> Self {
        self.search_group = group;
        self
    }

    #[must_use]
    pub fn max_players(mut self, max: u32) -> Self {
        self.max_players = max;
        self
    }

    #[must_use]
    pub fn client_deadline(mut self, seconds: u32) -> Self {
        self.client_deadline = seconds;
        self
    }

    #[must_use]
    pub fn public_props(mut self, props: PropertyMap) -> Self {
        self.public_props = props;
        self
    }

    #[must_use]
    pub fn private_props(mut self, props: PropertyMap) -> Self {
        self.private_props = props;
        self
    }

    /// The create request body.
    pub fn to_spec(&self) -> RoomSpec {
        RoomSpec {
            visible: self.visible,
            joinable: self.joinable,
            watchable: self.watchable,
            with_number: self.with_number,
            search_group: self.search_group,
            max_players: self.max_players,
            client_deadline: self.client_deadline,
            public_props: self.public_props.to_bytes(),
            private_props: self.private_props.to_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomwire_protocol::Value;

    #[test]
    fn test_default_is_open_room_with_standard_deadline() {
        let option = RoomOption::default();
        assert!(option.visible && option.joinable && option.watchable);
        assert!(!option.with_number);
        assert_eq!(option.client_deadline, 30);
    }

    #[test]
    fn test_to_spec_encodes_properties() {
        let spec = RoomOption::default()
            .with_number(true)
            .search_group(100)
            .max_players(10)
            .public_props(PropertyMap::new().with("bbb", 13))
            .to_spec();

        assert!(spec.with_number);
        assert_eq!(spec.search_group, 100);
        assert_eq!(spec.max_players, 10);
        let public = PropertyMap::from_bytes(&spec.public_props).unwrap();
        assert_eq!(public.get("bbb"), Some(&Value::I32(13)));
        assert!(PropertyMap::from_bytes(&spec.private_props).unwrap().is_empty());
    }

    #[test]
    fn test_serde_json_round_trip_keeps_props() {
        let option = RoomOption::default()
            .max_players(6)
            .public_props(PropertyMap::new().with("bbb", 13));

        let json = serde_json::to_string(&option).unwrap();
        let back: RoomOption = serde_json::from_str(&json).unwrap();

        assert_eq!(back, option);
    }

    #[test]
    fn test_deserialize_partial_fills_defaults() {
        let option: RoomOption = serde_json::from_str(r#"{"max_players": 2}"#).unwrap();

        assert_eq!(option.max_players, 2);
        assert_eq!(option.client_deadline, 30);
        assert!(option.public_props.is_empty());
    }
}
