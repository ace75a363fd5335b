//! The room session: one client's membership in one room.
//!
//! ```text
//! Connecting ──create/join/watch──→ Joining ──Entered──→ Joined ⇄ Paused
//!     │                               │                   │        │
//!     └───────────────────────────────┴──── fault ────────┴────────┴──→ ErrorClosed
//!                                                         └─ Closed event ─→ Closed
//! ```
//!
//! Outbound calls (RPCs, change requests, pause, master switch) go
//! straight to the transport and never block. Inbound traffic is only
//! looked at when the caller runs [`Session::pump`]; see `pump.rs`.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use roomwire_protocol::{
    ClientMessage, Codec, Envelope, JsonCodec, JoinFailure, PlayerId, PropertyMap, RoomSelector,
    RoomSpec, Target, WireValue,
};
use roomwire_room::{PlayerDescriptor, Query, RoomChange, RoomDescriptor, RoomError, Roster};
use roomwire_transport::{ConnectRequest, Connector, InboundReceiver, Transport, inbound_channel};

use crate::callbacks::Callbacks;
use crate::{PingStats, RpcRegistry, SessionConfig, SessionError};

/// Failure callbacks kept for requests that are still unanswered.
const PENDING_LIMIT: usize = 256;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport opened; no room request sent yet.
    Connecting,
    /// A create, join or watch request is in flight.
    Joining,
    /// In the room.
    Joined,
    /// In the room, with property and RPC sends held back.
    Paused,
    /// Membership ended normally (leave, kick, room closed).
    Closed,
    /// Join rejected, connection lost, or evicted.
    ErrorClosed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::ErrorClosed)
    }

    pub fn in_room(self) -> bool {
        matches!(self, Self::Joined | Self::Paused)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "connecting",
            Self::Joining => "joining",
            Self::Joined => "joined",
            Self::Paused => "paused",
            Self::Closed => "closed",
            Self::ErrorClosed => "error-closed",
        })
    }
}

// ---------------------------------------------------------------------------
// Request bookkeeping
// ---------------------------------------------------------------------------

type ChangeFailure = Box<dyn FnOnce(&str, &RoomChange) + Send>;
type PropsFailure = Box<dyn FnOnce(&str, &PropertyMap) + Send>;
type TargetFailure = Box<dyn FnOnce(&str, &PlayerId) + Send>;

/// What to call if the authority refuses a request.
pub(crate) enum PendingFailure {
    RoomProperty(RoomChange, ChangeFailure),
    MyProperty(PropertyMap, PropsFailure),
    SwitchMaster(PlayerId, TargetFailure),
    Kick(PlayerId, TargetFailure),
}

impl PendingFailure {
    pub(crate) fn fail(self, reason: &str) {
        match self {
            Self::RoomProperty(change, on_error) => on_error(reason, &change),
            Self::MyProperty(props, on_error) => on_error(reason, &props),
            Self::SwitchMaster(target, on_error) | Self::Kick(target, on_error) => {
                on_error(reason, &target)
            }
        }
    }
}

/// A send held back while paused.
struct Held {
    message: ClientMessage,
    on_error: Option<PendingFailure>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A client's session with one room.
///
/// Nothing inbound happens until [`pump`](Self::pump) is called: the
/// transport only queues, and the pump applies state changes and runs
/// callbacks in arrival order. Calling `pump` from two places at once is
/// the caller's problem; `&mut self` already rules it out in safe code.
///
/// ```rust
/// use roomwire_protocol::{PropertyMap, RoomSelector};
/// use roomwire_session::{Session, SessionConfig, SessionState};
/// use roomwire_transport::{ChannelConnector, ConnectRequest};
///
/// let (connector, _acceptor) = ChannelConnector::pair();
/// let mut session = Session::connect(
///     &connector,
///     ConnectRequest::new("mem://lobby"),
///     SessionConfig::default(),
/// )
/// .unwrap();
/// assert_eq!(session.state(), SessionState::Connecting);
///
/// session
///     .join(RoomSelector::Number(42), None, &PropertyMap::new())
///     .unwrap();
/// assert_eq!(session.state(), SessionState::Joining);
/// ```
pub struct Session<T: Transport, C: Codec = JsonCodec> {
    pub(crate) state: SessionState,
    pub(crate) transport: T,
    pub(crate) inbound: InboundReceiver,
    pub(crate) codec: C,
    pub(crate) config: SessionConfig,
    next_seq: u64,
    pub(crate) me: Option<PlayerId>,
    pub(crate) watcher: bool,
    pub(crate) room: Option<RoomDescriptor>,
    pub(crate) roster: Roster,
    pub(crate) rpc: RpcRegistry,
    pub(crate) callbacks: Callbacks,
    pub(crate) pending: VecDeque<(u64, PendingFailure)>,
    held: Vec<Held>,
    pub(crate) last_ping: Option<Instant>,
}

impl<T: Transport> Session<T> {
    /// Opens a session that encodes frames as JSON.
    pub fn connect<K>(
        connector: &K,
        request: ConnectRequest,
        config: SessionConfig,
    ) -> Result<Self, SessionError>
    where
        K: Connector<Transport = T>,
    {
        Self::connect_with_codec(connector, request, config, JsonCodec)
    }
}

impl<T: Transport, C: Codec> Session<T, C> {
    /// Opens the transport. The session starts in
    /// [`SessionState::Connecting`]; follow up with `create`, `join` or
    /// `watch`.
    pub fn connect_with_codec<K>(
        connector: &K,
        request: ConnectRequest,
        config: SessionConfig,
        codec: C,
    ) -> Result<Self, SessionError>
    where
        K: Connector<Transport = T>,
    {
        let (inbound_tx, inbound) = inbound_channel();
        tracing::info!(url = %request.url, "session connecting");
        let transport = connector.connect(request, inbound_tx)?;
        Ok(Self {
            state: SessionState::Connecting,
            transport,
            inbound,
            codec,
            config,
            next_seq: 0,
            me: None,
            watcher: false,
            room: None,
            roster: Roster::new(),
            rpc: RpcRegistry::new(),
            callbacks: Callbacks::default(),
            pending: VecDeque::new(),
            held: Vec::new(),
            last_ping: None,
        })
    }

    // -- Accessors --------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// This client's player id, once in a room.
    pub fn me(&self) -> Option<&PlayerId> {
        self.me.as_ref()
    }

    pub fn is_watcher(&self) -> bool {
        self.watcher
    }

    /// The local room mirror, once in a room.
    pub fn room(&self) -> Option<&RoomDescriptor> {
        self.room.as_ref()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn player_count(&self) -> usize {
        self.roster.len()
    }

    pub fn master(&self) -> Option<&PlayerId> {
        self.roster.master_id()
    }

    pub fn is_master(&self) -> bool {
        self.me.as_ref().is_some_and(|me| self.roster.is_master(me))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn rpc_registry(&self) -> &RpcRegistry {
        &self.rpc
    }

    // -- Callback registration --------------------------------------------

    /// Entered the room: own id, room snapshot, players in join order.
    pub fn on_joined(
        &mut self,
        handler: impl FnMut(&PlayerId, &RoomDescriptor, &Roster) + Send + 'static,
    ) {
        self.callbacks.joined.push(Box::new(handler));
    }

    /// The create, join or watch request failed. The session is over.
    pub fn on_join_failed(&mut self, handler: impl FnMut(&JoinFailure) + Send + 'static) {
        self.callbacks.join_failed.push(Box::new(handler));
    }

    pub fn on_player_joined(&mut self, handler: impl FnMut(&PlayerDescriptor) + Send + 'static) {
        self.callbacks.player_joined.push(Box::new(handler));
    }

    pub fn on_player_rejoined(&mut self, handler: impl FnMut(&PlayerDescriptor) + Send + 'static) {
        self.callbacks.player_rejoined.push(Box::new(handler));
    }

    /// Runs before the player is removed, with their last known state and
    /// the leave message.
    pub fn on_player_left(
        &mut self,
        handler: impl FnMut(&PlayerDescriptor, &str) + Send + 'static,
    ) {
        self.callbacks.player_left.push(Box::new(handler));
    }

    /// `(old master, new master)`.
    pub fn on_master_switched(
        &mut self,
        handler: impl FnMut(Option<&PlayerId>, &PlayerId) + Send + 'static,
    ) {
        self.callbacks.master_switched.push(Box::new(handler));
    }

    /// An accepted room change, with only the fields that changed set.
    pub fn on_room_property_changed(&mut self, handler: impl FnMut(&RoomChange) + Send + 'static) {
        self.callbacks.room_changed.push(Box::new(handler));
    }

    /// A player's updated state and the delta that was applied.
    pub fn on_player_property_changed(
        &mut self,
        handler: impl FnMut(&PlayerDescriptor, &PropertyMap) + Send + 'static,
    ) {
        self.callbacks.player_changed.push(Box::new(handler));
    }

    pub fn on_pong(&mut self, handler: impl FnMut(&PingStats) + Send + 'static) {
        self.callbacks.pong.push(Box::new(handler));
    }

    /// Non-fatal errors from the authority, and refusals of requests
    /// that had no failure callback.
    pub fn on_error(&mut self, handler: impl FnMut(&str) + Send + 'static) {
        self.callbacks.error.push(Box::new(handler));
    }

    pub fn on_closed(&mut self, handler: impl FnMut(&str) + Send + 'static) {
        self.callbacks.closed.push(Box::new(handler));
    }

    /// Connection lost or evicted after joining.
    pub fn on_error_closed(&mut self, handler: impl FnMut(&str) + Send + 'static) {
        self.callbacks.error_closed.push(Box::new(handler));
    }

    /// See [`RpcRegistry::register`].
    pub fn register_rpc<M: WireValue>(
        &mut self,
        code: u8,
        handler: impl FnMut(&PlayerId, M) + Send + 'static,
    ) -> Result<(), SessionError> {
        self.rpc.register(code, handler)
    }

    /// See [`RpcRegistry::register_batched`].
    pub fn register_batched_rpc<M, F>(
        &mut self,
        single: u8,
        batch: u8,
        handler: F,
    ) -> Result<(), SessionError>
    where
        M: WireValue,
        F: FnMut(&PlayerId, M) + Clone + Send + 'static,
    {
        self.rpc.register_batched(single, batch, handler)
    }

    // -- Entering a room ---------------------------------------------------

    /// Asks the authority to create a room and enter it as master.
    pub fn create(&mut self, room: RoomSpec, player_props: &PropertyMap) -> Result<(), SessionError> {
        self.begin(
            "create",
            ClientMessage::Create {
                room,
                player_props: player_props.to_bytes(),
            },
        )
    }

    /// Asks to join a room. With a query, the room must also match it.
    pub fn join(
        &mut self,
        room: RoomSelector,
        query: Option<&Query>,
        player_props: &PropertyMap,
    ) -> Result<(), SessionError> {
        self.begin(
            "join",
            ClientMessage::Join {
                room,
                query: query.map(Query::to_bytes),
                player_props: player_props.to_bytes(),
            },
        )
    }

    /// Asks to watch a room without becoming a player.
    pub fn watch(&mut self, room: RoomSelector, query: Option<&Query>) -> Result<(), SessionError> {
        self.begin(
            "watch",
            ClientMessage::Watch {
                room,
                query: query.map(Query::to_bytes),
            },
        )
    }

    fn begin(&mut self, operation: &'static str, message: ClientMessage) -> Result<(), SessionError> {
        if self.state != SessionState::Connecting {
            return Err(self.invalid(operation));
        }
        self.send(message)?;
        self.state = SessionState::Joining;
        tracing::info!(operation, "room request sent");
        Ok(())
    }

    // -- In-room requests --------------------------------------------------

    /// Sends an RPC registered under `code`. Held while paused.
    pub fn rpc<M: WireValue>(&mut self, code: u8, target: Target, message: &M) -> Result<(), SessionError> {
        self.require_room("send rpc")?;
        let data = self.rpc.encode(code, message)?;
        self.submit(ClientMessage::Rpc { code, target, data }, None)
    }

    /// Requests a room change. Master only. The local mirror is left
    /// alone: an accepted change comes back through
    /// `on_room_property_changed`, a refused one through `on_error`.
    pub fn change_room_property(
        &mut self,
        change: RoomChange,
        on_error: impl FnOnce(&str, &RoomChange) + Send + 'static,
    ) -> Result<(), SessionError> {
        self.require_master("change room properties")?;
        if change.is_empty() {
            tracing::debug!("empty room change not sent");
            return Ok(());
        }
        let message = ClientMessage::ChangeRoomProperty {
            diff: change.to_diff(),
        };
        self.submit(
            message,
            Some(PendingFailure::RoomProperty(change, Box::new(on_error))),
        )
    }

    /// Requests a change to this client's own player properties.
    pub fn change_my_property(
        &mut self,
        props: PropertyMap,
        on_error: impl FnOnce(&str, &PropertyMap) + Send + 'static,
    ) -> Result<(), SessionError> {
        self.require_member("change player properties")?;
        if props.is_empty() {
            tracing::debug!("empty player change not sent");
            return Ok(());
        }
        let message = ClientMessage::ChangeMyProperty {
            props: props.to_bytes(),
        };
        self.submit(
            message,
            Some(PendingFailure::MyProperty(props, Box::new(on_error))),
        )
    }

    /// Nominates `target` as master. Success shows up only as a
    /// master-switched event; failure calls `on_error(reason, target)`.
    pub fn switch_master(
        &mut self,
        target: PlayerId,
        on_error: impl FnOnce(&str, &PlayerId) + Send + 'static,
    ) -> Result<(), SessionError> {
        self.require_master("switch master")?;
        self.require_player(&target)?;
        let message = ClientMessage::SwitchMaster {
            target: target.clone(),
        };
        self.dispatch(
            message,
            Some(PendingFailure::SwitchMaster(target, Box::new(on_error))),
        )
    }

    /// Asks the authority to remove `target` from the room. Master only.
    pub fn kick(
        &mut self,
        target: PlayerId,
        message: &str,
        on_error: impl FnOnce(&str, &PlayerId) + Send + 'static,
    ) -> Result<(), SessionError> {
        self.require_master("kick players")?;
        self.require_player(&target)?;
        let request = ClientMessage::Kick {
            target: target.clone(),
            message: message.to_string(),
        };
        self.dispatch(request, Some(PendingFailure::Kick(target, Box::new(on_error))))
    }

    /// Asks to leave. The session stays in the room until the authority's
    /// `Closed` event is pumped.
    pub fn leave(&mut self, message: &str) -> Result<(), SessionError> {
        self.require_room("leave")?;
        self.send(ClientMessage::Leave {
            message: message.to_string(),
        })?;
        Ok(())
    }

    /// Stops sending property changes and RPCs without leaving; they are
    /// held until [`restart`](Self::restart). Pausing twice is a no-op.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Paused => Ok(()),
            SessionState::Joined => {
                self.send(ClientMessage::Pause)?;
                self.state = SessionState::Paused;
                tracing::info!("session paused");
                Ok(())
            }
            _ => Err(self.invalid("pause")),
        }
    }

    /// Resumes after [`pause`](Self::pause) and sends what was held, in
    /// order. Restarting a running session is a no-op.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Joined => Ok(()),
            SessionState::Paused => {
                self.send(ClientMessage::Restart)?;
                self.state = SessionState::Joined;
                let held = std::mem::take(&mut self.held);
                tracing::info!(held = held.len(), "session restarted");
                for Held { message, on_error } in held {
                    self.dispatch(message, on_error)?;
                }
                Ok(())
            }
            _ => Err(self.invalid("restart")),
        }
    }

    /// Sends a ping now. The answer arrives as `on_pong`.
    pub fn ping(&mut self) -> Result<(), SessionError> {
        self.require_room("ping")?;
        self.send(ClientMessage::Ping { timestamp: now_ms() })?;
        self.last_ping = Some(Instant::now());
        Ok(())
    }

    /// Ends the session locally without waiting for the authority.
    /// Held sends are dropped and no callback runs.
    pub fn close(&mut self) {
        if !self.state.is_terminal() {
            tracing::info!(state = %self.state, "session closed locally");
            self.terminate(SessionState::Closed);
        }
    }

    // -- Internals ---------------------------------------------------------

    pub(crate) fn terminate(&mut self, state: SessionState) {
        self.state = state;
        self.transport.close();
        if !self.held.is_empty() {
            tracing::debug!(dropped = self.held.len(), "held sends dropped");
        }
        self.held.clear();
        self.pending.clear();
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        if self.state.is_terminal() {
            SessionError::Closed
        } else {
            SessionError::InvalidState {
                operation,
                state: self.state,
            }
        }
    }

    fn require_room(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.state.in_room() {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn require_member(&self, operation: &'static str) -> Result<&PlayerId, SessionError> {
        self.require_room(operation)?;
        if self.watcher {
            return Err(SessionError::Watcher(operation));
        }
        self.me.as_ref().ok_or_else(|| self.invalid(operation))
    }

    fn require_master(&self, operation: &'static str) -> Result<(), SessionError> {
        let me = self.require_member(operation)?;
        if !self.roster.is_master(me) {
            return Err(SessionError::NotMaster(operation));
        }
        Ok(())
    }

    fn require_player(&self, id: &PlayerId) -> Result<(), SessionError> {
        if self.roster.contains(id) {
            Ok(())
        } else {
            Err(RoomError::UnknownPlayer(id.clone()).into())
        }
    }

    /// Holds property and RPC traffic while paused.
    fn submit(
        &mut self,
        message: ClientMessage,
        on_error: Option<PendingFailure>,
    ) -> Result<(), SessionError> {
        if self.state == SessionState::Paused {
            tracing::debug!(kind = message.kind(), "send held while paused");
            self.held.push(Held { message, on_error });
            return Ok(());
        }
        self.dispatch(message, on_error)
    }

    fn dispatch(
        &mut self,
        message: ClientMessage,
        on_error: Option<PendingFailure>,
    ) -> Result<(), SessionError> {
        let seq = self.send(message)?;
        if let Some(pending) = on_error {
            if self.pending.len() == PENDING_LIMIT {
                self.pending.pop_front();
            }
            self.pending.push_back((seq, pending));
        }
        Ok(())
    }

    fn send(&mut self, message: ClientMessage) -> Result<u64, SessionError> {
        self.next_seq += 1;
        let seq = self.next_seq;
        let kind = message.kind();
        let frame = self.codec.encode(&Envelope::client(seq, now_ms(), message))?;
        self.transport.send(frame)?;
        tracing::trace!(seq, kind, "frame sent");
        Ok(seq)
    }
}

impl<T: Transport, C: Codec> fmt::Debug for Session<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("me", &self.me)
            .field("watcher", &self.watcher)
            .field("room", &self.room.as_ref().map(|r| &r.id))
            .field("players", &self.roster.len())
            .field("rpc", &self.rpc)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

/// Unix milliseconds.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
