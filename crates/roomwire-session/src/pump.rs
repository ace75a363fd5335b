//! The callback pump: applies queued events and runs callbacks.
//!
//! The transport pushes into the session's inbound queue from wherever
//! its I/O runs. Nothing reads that queue except [`Session::pump`], which
//! handles events one by one in arrival order. A malformed frame is
//! logged and skipped; it never touches the room mirror.

use std::time::{Duration, Instant};

use roomwire_protocol::{
    Codec, Envelope, JoinFailure, Payload, PlayerId, PlayerInfo, PropertyMap, RoomDiff, RoomEvent,
    RoomInfo,
};
use roomwire_room::{PlayerDescriptor, RoomChange, RoomDescriptor, Roster};
use roomwire_transport::{Transport, TransportEvent};

use crate::session::now_ms;
use crate::{PingStats, Session, SessionState};

impl<T: Transport, C: Codec> Session<T, C> {
    /// Handles queued events and returns how many were taken off the
    /// queue. Never blocks; returns 0 when nothing is queued.
    ///
    /// Also sends the periodic ping when one is due. Once the session is
    /// closed, pumping does nothing.
    pub fn pump(&mut self) -> usize {
        if self.state.is_terminal() {
            return 0;
        }
        self.ping_if_due();

        let limit = self.config.max_events_per_pump;
        let mut handled = 0;
        while !self.state.is_terminal() && (limit == 0 || handled < limit) {
            match self.inbound.try_next() {
                Ok(Some(event)) => {
                    handled += 1;
                    self.on_transport_event(event);
                }
                Ok(None) => break,
                Err(e) => {
                    self.fault(&e.to_string());
                    break;
                }
            }
        }
        handled
    }

    fn ping_if_due(&mut self) {
        if !self.config.pings_enabled() || !self.state.in_room() {
            return;
        }
        let interval = self.config.ping_interval;
        if self.last_ping.is_some_and(|at| at.elapsed() < interval) {
            return;
        }
        if let Err(e) = self.ping() {
            tracing::debug!(error = %e, "ping not sent");
        }
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Received(frame) => self.on_frame(&frame),
            TransportEvent::Closed(reason) => self.fault(&format!("connection closed: {reason}")),
            TransportEvent::Failed(reason) => self.fault(&format!("connection failed: {reason}")),
        }
    }

    fn on_frame(&mut self, frame: &[u8]) {
        let envelope: Envelope = match self.codec.decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, len = frame.len(), "malformed frame dropped");
                return;
            }
        };
        match envelope.payload {
            Payload::Room(event) => {
                tracing::trace!(seq = envelope.seq, kind = event.kind(), "event received");
                self.on_room_event(event);
            }
            Payload::Client(message) => {
                tracing::debug!(kind = message.kind(), "client frame from authority ignored");
            }
        }
    }

    fn on_room_event(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Entered {
                room,
                players,
                master,
                me,
                watcher,
            } => self.on_entered(&room, &players, master, me, watcher),
            RoomEvent::JoinRejected { reason } => self.on_join_rejected(&reason),
            RoomEvent::Closed { message } if self.state == SessionState::Joining => {
                self.on_join_rejected(&JoinFailure::Other(message));
            }
            RoomEvent::Closed { message } => {
                tracing::info!(%message, "room membership closed");
                self.terminate(SessionState::Closed);
                self.callbacks.closed(&message);
            }
            RoomEvent::Evicted { reason } => self.fault(&reason),
            RoomEvent::Error { message } => {
                tracing::warn!(%message, "authority reported an error");
                self.callbacks.error(&message);
            }
            RoomEvent::RequestFailed { seq, reason } => self.on_request_failed(seq, &reason),
            other if !self.state.in_room() => {
                tracing::debug!(kind = other.kind(), state = %self.state, "event outside a room dropped");
            }
            RoomEvent::PlayerJoined { player } => self.handle_player_joined(&player, false),
            RoomEvent::PlayerRejoined { player } => self.handle_player_joined(&player, true),
            RoomEvent::PlayerLeft { player, message } => self.handle_player_left(&player, &message),
            RoomEvent::MasterSwitched { master } => {
                let old = self.roster.set_master(master.clone());
                tracing::info!(old = ?old, new = %master, "master switched");
                self.callbacks.master_switched(old.as_ref(), &master);
            }
            RoomEvent::RoomPropertyChanged { diff } => self.on_room_changed(&diff),
            RoomEvent::PlayerPropertyChanged { player, props } => {
                self.on_player_changed(&player, &props);
            }
            RoomEvent::Rpc { sender, code, data } => {
                match self.rpc.on_receive(&sender, code, &data) {
                    Ok(handlers) => tracing::trace!(code, handlers, "rpc dispatched"),
                    Err(e) => tracing::warn!(player_id = %sender, code, error = %e, "rpc dropped"),
                }
            }
            RoomEvent::Pong {
                timestamp,
                watchers,
                last_message,
            } => {
                let stats = PingStats {
                    rtt: Duration::from_millis(now_ms().saturating_sub(timestamp)),
                    watchers,
                    last_message,
                };
                tracing::trace!(rtt = ?stats.rtt, watchers, "pong");
                self.callbacks.pong(&stats);
            }
        }
    }

    fn on_entered(
        &mut self,
        room: &RoomInfo,
        players: &[PlayerInfo],
        master: PlayerId,
        me: PlayerId,
        watcher: bool,
    ) {
        if self.state != SessionState::Joining {
            tracing::debug!(state = %self.state, "unexpected room snapshot dropped");
            return;
        }
        let snapshot = RoomDescriptor::from_info(room).and_then(|room| {
            let players = players
                .iter()
                .map(PlayerDescriptor::from_info)
                .collect::<Result<Vec<_>, _>>()?;
            Ok((room, players))
        });
        let (room, players) = match snapshot {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.fault(&format!("malformed room snapshot: {e}"));
                return;
            }
        };

        self.roster = Roster::from_players(players, Some(master));
        self.watcher = watcher;
        self.state = SessionState::Joined;
        self.last_ping = Some(Instant::now());
        tracing::info!(
            room_id = %room.id,
            player_id = %me,
            watcher,
            players = self.roster.len(),
            "joined room"
        );
        let room = &*self.room.insert(room);
        let me = &*self.me.insert(me);
        for handler in &mut self.callbacks.joined {
            handler(me, room, &self.roster);
        }
    }

    fn on_join_rejected(&mut self, reason: &JoinFailure) {
        if self.state != SessionState::Joining {
            tracing::debug!(state = %self.state, "unexpected join rejection dropped");
            return;
        }
        tracing::info!(%reason, "room request rejected");
        self.terminate(SessionState::ErrorClosed);
        self.callbacks.join_failed(reason);
    }

    /// Ends the session with an error. While joining, this is a failed
    /// join and goes to the join-failure callbacks; after that, to the
    /// error-closed callbacks.
    pub(crate) fn fault(&mut self, reason: &str) {
        if self.state.is_terminal() {
            return;
        }
        let joining = self.state == SessionState::Joining;
        tracing::warn!(state = %self.state, reason, "session failed");
        self.terminate(SessionState::ErrorClosed);
        if joining {
            self.callbacks.join_failed(&JoinFailure::Other(reason.to_string()));
        } else {
            self.callbacks.error_closed(reason);
        }
    }

    fn on_request_failed(&mut self, seq: u64, reason: &str) {
        tracing::warn!(seq, reason, "request refused");
        match self.pending.iter().position(|(s, _)| *s == seq) {
            Some(index) => {
                if let Some((_, pending)) = self.pending.remove(index) {
                    pending.fail(reason);
                }
            }
            None => self.callbacks.error(reason),
        }
    }

    fn handle_player_joined(&mut self, info: &PlayerInfo, rejoin: bool) {
        let player = match PlayerDescriptor::from_info(info) {
            Ok(player) => player,
            Err(e) => {
                tracing::warn!(player_id = %info.id, error = %e, "malformed player dropped");
                return;
            }
        };
        let added = self.roster.upsert(player);
        tracing::info!(player_id = %info.id, rejoin, added, "player entered");
        let Some(player) = self.roster.get(&info.id) else {
            return;
        };
        let handlers = if rejoin {
            &mut self.callbacks.player_rejoined
        } else {
            &mut self.callbacks.player_joined
        };
        for handler in handlers {
            handler(player);
        }
    }

    fn handle_player_left(&mut self, id: &PlayerId, message: &str) {
        let Some(player) = self.roster.get(id) else {
            tracing::debug!(player_id = %id, "unknown player left");
            return;
        };
        for handler in &mut self.callbacks.player_left {
            handler(player, message);
        }
        self.roster.remove(id);
        tracing::info!(player_id = %id, message, "player left");
    }

    fn on_room_changed(&mut self, diff: &RoomDiff) {
        let change = match RoomChange::from_diff(diff) {
            Ok(change) => change,
            Err(e) => {
                tracing::warn!(error = %e, "malformed room change dropped");
                return;
            }
        };
        if let Some(room) = &mut self.room {
            room.apply_change(&change);
        }
        tracing::debug!(%change, "room properties changed");
        self.callbacks.room_changed(&change);
    }

    fn on_player_changed(&mut self, id: &PlayerId, props: &[u8]) {
        let delta = match PropertyMap::from_bytes(props) {
            Ok(delta) => delta,
            Err(e) => {
                tracing::warn!(player_id = %id, error = %e, "malformed player change dropped");
                return;
            }
        };
        if !self.roster.apply_props(id, &delta) {
            tracing::debug!(player_id = %id, "change for unknown player dropped");
            return;
        }
        tracing::debug!(player_id = %id, props = %delta, "player properties changed");
        let Some(player) = self.roster.get(id) else {
            return;
        };
        for handler in &mut self.callbacks.player_changed {
            handler(player, &delta);
        }
    }
}
