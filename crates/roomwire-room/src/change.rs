//! Room diffs with decoded property maps.

use std::fmt;

use roomwire_protocol::{PropertyMap, ProtocolError, RoomDiff};

/// A partial room update: the fields a change request asks for, or the
/// fields an accepted change actually touched.
///
/// Every field is optional and `None` means "unchanged". The flags are
/// therefore tri-state: unset, `Some(true)`, `Some(false)`. Property maps
/// are deltas (see [`PropertyMap::apply_delta`]).
///
/// ```rust
/// use roomwire_room::RoomChange;
///
/// let change = RoomChange::new().joinable(false).max_players(4);
/// assert_eq!(change.visible, None);
/// assert_eq!(change.to_string(), "joinable=false max_players=4");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomChange {
    pub visible: Option<bool>,
    pub joinable: Option<bool>,
    pub watchable: Option<bool>,
    pub search_group: Option<u32>,
    pub max_players: Option<u32>,
    pub client_deadline: Option<u32>,
    pub public_props: Option<PropertyMap>,
    pub private_props: Option<PropertyMap>,
}

impl RoomChange {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    #[must_use]
    pub fn joinable(mut self, joinable: bool) -> Self {
        self.joinable = Some(joinable);
        self
    }

    #[must_use]
    pub fn watchable(mut self, watchable: bool) -> Self {
        self.watchable = Some(watchable);
        self
    }

    #[must_use]
    pub fn search_group(mut self, group: u32) -> Self {
        self.search_group = Some(group);
        self
    }

    #[must_use]
    pub fn max_players(mut self, max: u32) -> Self {
        self.max_players = Some(max);
        self
    }

    /// Client deadline in seconds.
    #[must_use]
    pub fn client_deadline(mut self, seconds: u32) -> Self {
        self.client_deadline = Some(seconds);
        self
    }

    #[must_use]
    pub fn public_props(mut self, delta: PropertyMap) -> Self {
        self.public_props = Some(delta);
        self
    }

    #[must_use]
    pub fn private_props(mut self, delta: PropertyMap) -> Self {
        self.private_props = Some(delta);
        self
    }

    /// True if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn to_diff(&self) -> RoomDiff {
        RoomDiff {
            visible: self.visible,
            joinable: self.joinable,
            watchable: self.watchable,
            search_group: self.search_group,
            max_players: self.max_players,
            client_deadline: self.client_deadline,
            public_props: self.public_props.as_ref().map(PropertyMap::to_bytes),
            private_props: self.private_props.as_ref().map(PropertyMap::to_bytes),
        }
    }

    /// Decodes a wire diff. Fails if either property blob is malformed;
    /// nothing is partially decoded.
    pub fn from_diff(diff: &RoomDiff) -> Result<Self, ProtocolError> {
        let decode = |blob: &Option<Vec<u8>>| {
            blob.as_deref().map(PropertyMap::from_bytes).transpose()
        };
        Ok(Self {
            visible: diff.visible,
            joinable: diff.joinable,
            watchable: diff.watchable,
            search_group: diff.search_group,
            max_players: diff.max_players,
            client_deadline: diff.client_deadline,
            public_props: decode(&diff.public_props)?,
            private_props: decode(&diff.private_props)?,
        })
    }
}

/// Only the fields that are set, as `name=value` separated by spaces.
/// Property deltas print as `{key:value,...}`.
impl fmt::Display for RoomChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        let mut field = |f: &mut fmt::Formatter<'_>, name: &str, value: &dyn fmt::Display| {
            let result = write!(f, "{sep}{name}={value}");
            sep = " ";
            result
        };
        if let Some(v) = self.visible {
            field(f, "visible", &v)?;
        }
        if let Some(v) = self.joinable {
            field(f, "joinable", &v)?;
        }
        if let Some(v) = self.watchable {
            field(f, "watchable", &v)?;
        }
        if let Some(v) = self.search_group {
            field(f, "search_group", &v)?;
        }
        if let Some(v) = self.max_players {
            field(f, "max_players", &v)?;
        }
        if let Some(v) = self.client_deadline {
            field(f, "client_deadline", &v)?;
        }
        if let Some(map) = &self.public_props {
            field(f, "public_props", &format_args!("{{{map}}}"))?;
        }
        if let Some(map) = &self.private_props {
            field(f, "private_props", &format_args!("{{{map}}}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_change_is_empty() {
        assert!(RoomChange::new().is_empty());
        assert!(!RoomChange::new().watchable(true).is_empty());
    }

    #[test]
    fn test_diff_round_trip_keeps_unset_fields_unset() {
        let change = RoomChange::new()
            .joinable(false)
            .public_props(PropertyMap::new().with("bbb", 20));

        let decoded = RoomChange::from_diff(&change.to_diff()).unwrap();

        assert_eq!(decoded, change);
        assert_eq!(decoded.visible, None);
        assert_eq!(decoded.private_props, None);
    }

    #[test]
    fn test_from_diff_with_bad_blob_fails() {
        let diff = RoomDiff {
            visible: Some(true),
            public_props: Some(vec![0xff]),
            ..RoomDiff::default()
        };
        assert!(RoomChange::from_diff(&diff).is_err());
    }

    #[test]
    fn test_display_lists_only_present_fields() {
        let change = RoomChange::new()
            .visible(true)
            .client_deadline(30)
            .private_props(PropertyMap::new().with("ppp", "x"));
        assert_eq!(
            change.to_string(),
            "visible=true client_deadline=30 private_props={ppp:x,}"
        );
    }
}
