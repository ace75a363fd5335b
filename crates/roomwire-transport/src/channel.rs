//! In-memory transport.
//!
//! [`ChannelConnector`] hands every connection to a [`PeerAcceptor`]
//! instead of a socket. The accepting side gets a [`ChannelPeer`] that
//! reads what the session sent and pushes events back into the session
//! queue. Tests use it to play the room authority; so can any embedding
//! that runs the authority in-process.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::{
    ConnectRequest, Connector, InboundSender, Transport, TransportError,
    TransportEvent,
};

/// Connects sessions to peers handed out by the paired [`PeerAcceptor`].
#[derive(Debug, Clone)]
pub struct ChannelConnector {
    peers: mpsc::UnboundedSender<ChannelPeer>,
}

impl ChannelConnector {
    pub fn pair() -> (Self, PeerAcceptor) {
        let (peers, incoming) = mpsc::unbounded_channel();
        (Self { peers }, PeerAcceptor { incoming })
    }
}

impl Connector for ChannelConnector {
    type Transport = ChannelTransport;

    fn connect(
        &self,
        request: ConnectRequest,
        inbound: InboundSender,
    ) -> Result<ChannelTransport, TransportError> {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let peer = ChannelPeer {
            request,
            frames: frames_rx,
            inbound,
            closed: Arc::clone(&closed),
        };
        self.peers
            .send(peer)
            .map_err(|_| TransportError::ConnectionClosed("no acceptor".into()))?;
        tracing::debug!("channel connection opened");
        Ok(ChannelTransport {
            frames: frames_tx,
            closed,
        })
    }
}

/// Receives connections made through the paired [`ChannelConnector`].
#[derive(Debug)]
pub struct PeerAcceptor {
    incoming: mpsc::UnboundedReceiver<ChannelPeer>,
}

impl PeerAcceptor {
    /// Next pending connection, without waiting.
    pub fn try_accept(&mut self) -> Option<ChannelPeer> {
        self.incoming.try_recv().ok()
    }

    /// Waits for the next connection. `None` once every connector is gone.
    pub async fn accept(&mut self) -> Option<ChannelPeer> {
        self.incoming.recv().await
    }
}

/// The session's outbound handle for an in-memory connection.
#[derive(Debug)]
pub struct ChannelTransport {
    frames: mpsc::UnboundedSender<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

impl Transport for ChannelTransport {
    fn send(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::ConnectionClosed("closed".into()));
        }
        self.frames
            .send(frame)
            .map_err(|_| TransportError::ConnectionClosed("peer dropped".into()))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// The far end of an in-memory connection.
#[derive(Debug)]
pub struct ChannelPeer {
    request: ConnectRequest,
    frames: mpsc::UnboundedReceiver<Vec<u8>>,
    inbound: InboundSender,
    closed: Arc<AtomicBool>,
}

impl ChannelPeer {
    /// The request the session connected with (URL and headers).
    pub fn request(&self) -> &ConnectRequest {
        &self.request
    }

    /// Next frame the session sent, without waiting.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.frames.try_recv().ok()
    }

    /// Every frame the session has sent so far.
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Waits for the next frame. `None` once the session dropped its
    /// transport.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.frames.recv().await
    }

    /// Delivers a frame to the session queue.
    pub fn deliver(&self, frame: Vec<u8>) -> bool {
        self.inbound.push(TransportEvent::Received(frame))
    }

    /// Closes the connection from this side.
    pub fn close(&self, reason: impl Into<String>) {
        self.closed.store(true, Ordering::Release);
        self.inbound.push(TransportEvent::Closed(reason.into()));
    }

    /// Breaks the connection from this side.
    pub fn fail(&self, reason: impl Into<String>) {
        self.closed.store(true, Ordering::Release);
        self.inbound.push(TransportEvent::Failed(reason.into()));
    }

    /// Whether either side has closed the connection.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound_channel;

    #[test]
    fn test_connect_hands_peer_to_acceptor() {
        let (connector, mut acceptor) = ChannelConnector::pair();
        let (tx, _rx) = inbound_channel();

        let _transport = connector
            .connect(ConnectRequest::new("mem://a").header("x-user-id", "u1"), tx)
            .unwrap();

        let peer = acceptor.try_accept().expect("peer should be pending");
        assert_eq!(peer.request().url, "mem://a");
        assert_eq!(peer.request().header_value("X-User-Id"), Some("u1"));
    }

    #[test]
    fn test_frames_flow_both_ways() {
        let (connector, mut acceptor) = ChannelConnector::pair();
        let (tx, mut rx) = inbound_channel();
        let transport = connector.connect(ConnectRequest::new("mem://a"), tx).unwrap();
        let mut peer = acceptor.try_accept().unwrap();

        transport.send(vec![1, 2]).unwrap();
        transport.send(vec![3]).unwrap();
        assert_eq!(peer.drain(), vec![vec![1, 2], vec![3]]);

        peer.deliver(vec![7]);
        assert_eq!(rx.try_next().unwrap(), Some(TransportEvent::Received(vec![7])));
    }

    #[test]
    fn test_send_after_close_fails() {
        let (connector, mut acceptor) = ChannelConnector::pair();
        let (tx, _rx) = inbound_channel();
        let transport = connector.connect(ConnectRequest::new("mem://a"), tx).unwrap();
        let peer = acceptor.try_accept().unwrap();

        transport.close();

        assert!(peer.is_closed());
        assert!(matches!(
            transport.send(vec![1]),
            Err(TransportError::ConnectionClosed(_))
        ));
    }

    #[test]
    fn test_peer_close_reaches_session_queue() {
        let (connector, mut acceptor) = ChannelConnector::pair();
        let (tx, mut rx) = inbound_channel();
        let _transport = connector.connect(ConnectRequest::new("mem://a"), tx).unwrap();
        let peer = acceptor.try_accept().unwrap();

        peer.fail("reset");

        assert_eq!(
            rx.try_next().unwrap(),
            Some(TransportEvent::Failed("reset".into()))
        );
    }

    #[test]
    fn test_connect_without_acceptor_fails() {
        let (connector, acceptor) = ChannelConnector::pair();
        drop(acceptor);
        let (tx, _rx) = inbound_channel();

        let result = connector.connect(ConnectRequest::new("mem://a"), tx);

        assert!(matches!(result, Err(TransportError::ConnectionClosed(_))));
    }
}
