//! Integration tests for the room mirror: wire snapshots and diffs in,
//! local descriptor, roster, and directory state out.

use roomwire_protocol::{
    PlayerId, PlayerInfo, PropertyMap, RoomDiff, RoomId, RoomInfo, Value,
};
use roomwire_room::{
    PlayerDescriptor, Query, RoomChange, RoomDescriptor, RoomDirectory,
    RoomSummary, Roster, SearchRequest, Searcher,
};

// =========================================================================
// Helpers
// =========================================================================

fn room_info(id: &str, bbb: i32) -> RoomInfo {
    RoomInfo {
        id: RoomId::from(id),
        number: None,
        visible: true,
        joinable: true,
        watchable: true,
        search_group: 100,
        max_players: 10,
        client_deadline: 30,
        public_props: PropertyMap::new().with("aaa", "public").with("bbb", bbb).to_bytes(),
        private_props: PropertyMap::new().with("aaa", "private").to_bytes(),
        created: 1_700_000_000,
    }
}

fn player_info(id: &str) -> PlayerInfo {
    PlayerInfo {
        id: PlayerId::from(id),
        props: PropertyMap::new().with("name", id).to_bytes(),
    }
}

// =========================================================================
// Descriptor from the wire
// =========================================================================

#[test]
fn test_snapshot_decodes_into_descriptor() {
    let room = RoomDescriptor::from_info(&room_info("r1", 13)).unwrap();

    assert_eq!(room.public_props.get("bbb"), Some(&Value::I32(13)));
    assert_eq!(room.private_props.get("aaa"), Some(&Value::from("private")));
    assert_eq!(room.max_players, 10);
}

#[test]
fn test_wire_diff_with_only_joinable_leaves_other_flags() {
    let mut room = RoomDescriptor::from_info(&room_info("r1", 13)).unwrap();
    let diff: RoomDiff = joinable_off_diff();

    room.apply_change(&RoomChange::from_diff(&diff).unwrap());

    assert!(!room.joinable);
    assert!(room.visible);
    assert!(room.watchable);
    assert_eq!(room.public_props.get("bbb"), Some(&Value::I32(13)));
}

/// A diff as the authority would build it for `joinable = false`.
fn joinable_off_diff() -> RoomDiff {
    RoomDiff {
        joinable: Some(false),
        ..RoomDiff::default()
    }
}

#[test]
fn test_property_delta_null_deletes_key() {
    let mut room = RoomDescriptor::from_info(&room_info("r1", 13)).unwrap();
    let change = RoomChange::new().public_props(
        PropertyMap::new().with("aaa", Value::Null).with("zzz", 1.5f32),
    );

    room.apply_change(&RoomChange::from_diff(&change.to_diff()).unwrap());

    assert_eq!(room.public_props.keys().collect::<Vec<_>>(), vec!["bbb", "zzz"]);
}

// =========================================================================
// Roster from the wire
// =========================================================================

#[test]
fn test_roster_from_snapshot_keeps_join_order_and_master() {
    let players = ["a", "b", "c"]
        .map(player_info)
        .iter()
        .map(PlayerDescriptor::from_info)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    let roster = Roster::from_players(players, Some(PlayerId::from("a")));

    assert_eq!(
        roster.ids().map(PlayerId::as_str).collect::<Vec<_>>(),
        vec!["a", "b", "c"]
    );
    assert_eq!(roster.master().unwrap().props.get("name"), Some(&Value::from("a")));
}

// =========================================================================
// Directory search through the Searcher boundary
// =========================================================================

#[tokio::test]
async fn test_search_between_over_three_rooms_finds_middle() {
    let mut dir = RoomDirectory::new();
    for (id, bbb) in [("r10", 10), ("r50", 50), ("r90", 90)] {
        let room = RoomDescriptor::from_info(&room_info(id, bbb)).unwrap();
        dir.register(RoomSummary::from_descriptor(&room, 1)).unwrap();
    }

    let found = dir
        .search(SearchRequest::group(100).query(Query::new().between("bbb", 20, 80)))
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, RoomId::from("r50"));
    assert_eq!(found[0].public_props.get("bbb"), Some(&Value::I32(50)));
}

#[tokio::test]
async fn test_search_query_survives_encoding() {
    let mut dir = RoomDirectory::new();
    let room = RoomDescriptor::from_info(&room_info("r1", 25)).unwrap();
    dir.register(RoomSummary::from_descriptor(&room, 1)).unwrap();

    // The query a client sends travels as bytes.
    let wire = Query::new().greater_equal("bbb", 20).equal("aaa", "public").to_bytes();
    let query = Query::from_bytes(&wire).unwrap();

    let found = dir.search(SearchRequest::group(100).query(query)).await.unwrap();

    assert_eq!(found.len(), 1);
}
