//! Transport seam for Roomwire.
//!
//! A session never touches sockets. It talks to two small traits:
//!
//! - [`Connector`] starts a connection and returns a [`Transport`] handle
//!   for outbound frames. Starting is non-blocking: the handshake runs
//!   wherever the connector runs its I/O.
//! - The connection reports everything it hears as [`TransportEvent`]s
//!   pushed into an [`InboundSender`]. The session owns the matching
//!   [`InboundReceiver`] and drains it from its pump.
//!
//! ```text
//!  session ──send()──▶ Transport ──▶ network
//!     ▲                                  │
//!     └── pump ◀── InboundReceiver ◀── InboundSender (I/O task)
//! ```
//!
//! The transport only enqueues and the pump only dequeues, so all
//! session state changes on the caller's thread.
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketConnector`] via `tokio-tungstenite`

mod channel;
mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use channel::{ChannelConnector, ChannelPeer, ChannelTransport, PeerAcceptor};
pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnector, WebSocketTransport};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Where to connect and what to present during the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectRequest {
    pub url: String,
    /// Extra handshake headers, e.g. the session credential.
    pub headers: Vec<(String, String)>,
}

impl ConnectRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First header with this name, compared case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The outbound half of a connection.
///
/// `send` queues a frame and returns at once; it must never wait on the
/// network. Failure to deliver later shows up as an inbound
/// [`TransportEvent::Failed`].
pub trait Transport: Send + Sync + 'static {
    /// # Errors
    /// [`TransportError::ConnectionClosed`] once the connection is gone.
    fn send(&self, frame: Vec<u8>) -> Result<(), TransportError>;

    /// Asks the connection to shut down. Idempotent.
    fn close(&self);
}

/// Opens connections.
pub trait Connector {
    type Transport: Transport;

    /// Starts connecting. Inbound traffic and the eventual close are
    /// reported through `inbound`.
    fn connect(
        &self,
        request: ConnectRequest,
        inbound: InboundSender,
    ) -> Result<Self::Transport, TransportError>;
}

// ---------------------------------------------------------------------------
// Inbound queue
// ---------------------------------------------------------------------------

/// What a connection reports to its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One complete frame.
    Received(Vec<u8>),
    /// Orderly shutdown, with the peer's reason if it gave one.
    Closed(String),
    /// The connection broke.
    Failed(String),
}

/// Producer side of a session's inbound queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct InboundSender {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl InboundSender {
    /// Enqueues an event. Returns `false` if the session is gone, in
    /// which case the event is dropped.
    pub fn push(&self, event: TransportEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Consumer side of a session's inbound queue. Owned by the session.
#[derive(Debug)]
pub struct InboundReceiver {
    rx: mpsc::UnboundedReceiver<TransportEvent>,
}

impl InboundReceiver {
    /// Takes the next event without waiting.
    ///
    /// `Ok(None)` means the queue is empty right now.
    ///
    /// # Errors
    /// [`TransportError::Disconnected`] when the queue is empty and every
    /// sender has been dropped, so nothing more can ever arrive.
    pub fn try_next(&mut self) -> Result<Option<TransportEvent>, TransportError> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Disconnected),
        }
    }

    /// Waits for the next event. `None` once disconnected.
    pub async fn next(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }
}

/// Creates a session inbound queue.
pub fn inbound_channel() -> (InboundSender, InboundReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InboundSender { tx }, InboundReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_queue_preserves_order() {
        let (tx, mut rx) = inbound_channel();
        tx.push(TransportEvent::Received(vec![1]));
        tx.push(TransportEvent::Received(vec![2]));
        tx.push(TransportEvent::Closed("done".into()));

        assert_eq!(rx.try_next().unwrap(), Some(TransportEvent::Received(vec![1])));
        assert_eq!(rx.try_next().unwrap(), Some(TransportEvent::Received(vec![2])));
        assert_eq!(
            rx.try_next().unwrap(),
            Some(TransportEvent::Closed("done".into()))
        );
        assert_eq!(rx.try_next().unwrap(), None);
    }

    #[test]
    fn test_try_next_reports_disconnect_after_draining() {
        let (tx, mut rx) = inbound_channel();
        tx.push(TransportEvent::Received(vec![9]));
        drop(tx);

        assert!(rx.try_next().unwrap().is_some());
        assert!(matches!(rx.try_next(), Err(TransportError::Disconnected)));
    }

    #[test]
    fn test_push_after_receiver_dropped_returns_false() {
        let (tx, rx) = inbound_channel();
        drop(rx);
        assert!(!tx.push(TransportEvent::Closed(String::new())));
    }

    #[test]
    fn test_connect_request_header_lookup_ignores_case() {
        let request = ConnectRequest::new("ws://localhost/room")
            .header("Authorization", "Bearer abc")
            .header("X-User-Id", "alice");

        assert_eq!(request.header_value("authorization"), Some("Bearer abc"));
        assert_eq!(request.header_value("x-user-id"), Some("alice"));
        assert_eq!(request.header_value("x-app-id"), None);
    }
}
