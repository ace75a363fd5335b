//! Handler lists, one per event kind.
//!
//! Any number of handlers may be registered for a kind. The pump calls
//! them in registration order, one event at a time, so no two handlers of
//! a session ever run at once.

use std::fmt;
use std::time::Duration;

use roomwire_protocol::{JoinFailure, PlayerId, PropertyMap};
use roomwire_room::{PlayerDescriptor, RoomChange, RoomDescriptor, Roster};

/// Round-trip measurement delivered to `on_pong` handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingStats {
    pub rtt: Duration,
    /// Watchers currently attached to the room.
    pub watchers: u32,
    /// Last time (Unix ms) the authority heard from each player.
    pub last_message: Vec<(PlayerId, u64)>,
}

pub(crate) type JoinedHandler = Box<dyn FnMut(&PlayerId, &RoomDescriptor, &Roster) + Send>;
pub(crate) type JoinFailedHandler = Box<dyn FnMut(&JoinFailure) + Send>;
pub(crate) type PlayerHandler = Box<dyn FnMut(&PlayerDescriptor) + Send>;
pub(crate) type PlayerLeftHandler = Box<dyn FnMut(&PlayerDescriptor, &str) + Send>;
pub(crate) type MasterHandler = Box<dyn FnMut(Option<&PlayerId>, &PlayerId) + Send>;
pub(crate) type RoomChangeHandler = Box<dyn FnMut(&RoomChange) + Send>;
pub(crate) type PlayerPropsHandler = Box<dyn FnMut(&PlayerDescriptor, &PropertyMap) + Send>;
pub(crate) type PongHandler = Box<dyn FnMut(&PingStats) + Send>;
pub(crate) type MessageHandler = Box<dyn FnMut(&str) + Send>;

#[derive(Default)]
pub(crate) struct Callbacks {
    pub(crate) joined: Vec<JoinedHandler>,
    pub(crate) join_failed: Vec<JoinFailedHandler>,
    pub(crate) player_joined: Vec<PlayerHandler>,
    pub(crate) player_rejoined: Vec<PlayerHandler>,
    pub(crate) player_left: Vec<PlayerLeftHandler>,
    pub(crate) master_switched: Vec<MasterHandler>,
    pub(crate) room_changed: Vec<RoomChangeHandler>,
    pub(crate) player_changed: Vec<PlayerPropsHandler>,
    pub(crate) pong: Vec<PongHandler>,
    pub(crate) error: Vec<MessageHandler>,
    pub(crate) closed: Vec<MessageHandler>,
    pub(crate) error_closed: Vec<MessageHandler>,
}

impl Callbacks {
    pub(crate) fn error(&mut self, message: &str) {
        for handler in &mut self.error {
            handler(message);
        }
    }

    pub(crate) fn closed(&mut self, message: &str) {
        for handler in &mut self.closed {
            handler(message);
        }
    }

    pub(crate) fn error_closed(&mut self, reason: &str) {
        for handler in &mut self.error_closed {
            handler(reason);
        }
    }

    pub(crate) fn join_failed(&mut self, reason: &JoinFailure) {
        for handler in &mut self.join_failed {
            handler(reason);
        }
    }

    pub(crate) fn master_switched(&mut self, old: Option<&PlayerId>, new: &PlayerId) {
        for handler in &mut self.master_switched {
            handler(old, new);
        }
    }

    pub(crate) fn room_changed(&mut self, change: &RoomChange) {
        for handler in &mut self.room_changed {
            handler(change);
        }
    }

    pub(crate) fn pong(&mut self, stats: &PingStats) {
        for handler in &mut self.pong {
            handler(stats);
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("joined", &self.joined.len())
            .field("join_failed", &self.join_failed.len())
            .field("player_joined", &self.player_joined.len())
            .field("player_rejoined", &self.player_rejoined.len())
            .field("player_left", &self.player_left.len())
            .field("master_switched", &self.master_switched.len())
            .field("room_changed", &self.room_changed.len())
            .field("player_changed", &self.player_changed.len())
            .field("pong", &self.pong.len())
            .field("error", &self.error.len())
            .field("closed", &self.closed.len())
            .field("error_closed", &self.error_closed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_error_handlers_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut callbacks = Callbacks::default();
        for n in 1..=3 {
            let order = Arc::clone(&order);
            callbacks
                .error
                .push(Box::new(move |msg: &str| order.lock().unwrap().push(format!("{n}:{msg}"))));
        }

        callbacks.error("oops");

        assert_eq!(*order.lock().unwrap(), vec!["1:oops", "2:oops", "3:oops"]);
    }

    #[test]
    fn test_master_switched_passes_old_and_new() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let mut callbacks = Callbacks::default();
        callbacks.master_switched.push(Box::new(move |old: Option<&PlayerId>, new: &PlayerId| {
            *sink.lock().unwrap() = Some((old.cloned(), new.clone()));
        }));

        callbacks.master_switched(Some(&PlayerId::from("a")), &PlayerId::from("b"));

        assert_eq!(
            *seen.lock().unwrap(),
            Some((Some(PlayerId::from("a")), PlayerId::from("b")))
        );
    }

    #[test]
    fn test_debug_shows_handler_counts() {
        let mut callbacks = Callbacks::default();
        callbacks.closed.push(Box::new(|_: &str| {}));
        let text = format!("{callbacks:?}");
        assert!(text.contains("closed: 1"));
        assert!(text.contains("pong: 0"));
    }
}
