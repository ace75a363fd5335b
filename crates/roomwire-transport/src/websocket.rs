//! WebSocket transport using `tokio-tungstenite`.
//!
//! `connect` spawns one Tokio task per connection. The task owns the
//! socket: it forwards outbound frames from the [`WebSocketTransport`]
//! handle as binary messages and pushes everything it reads into the
//! session's inbound queue.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};

use crate::{
    ConnectRequest, Connector, InboundSender, Transport, TransportError,
    TransportEvent,
};

enum Command {
    Send(Vec<u8>),
    Close,
}

/// Opens WebSocket connections. Must be called inside a Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    fn build_request(request: &ConnectRequest) -> Result<Request, TransportError> {
        let mut ws_request = request
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
            ws_request.headers_mut().insert(name, value);
        }
        Ok(ws_request)
    }
}

impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    fn connect(
        &self,
        request: ConnectRequest,
        inbound: InboundSender,
    ) -> Result<WebSocketTransport, TransportError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| TransportError::NoRuntime)?;
        let ws_request = Self::build_request(&request)?;
        let (commands, rx) = mpsc::unbounded_channel();

        tracing::debug!(url = %request.url, "opening WebSocket connection");
        runtime.spawn(run_connection(ws_request, rx, inbound));

        Ok(WebSocketTransport { commands })
    }
}

/// Outbound handle for a WebSocket connection. Dropping it closes the
/// connection.
#[derive(Debug)]
pub struct WebSocketTransport {
    commands: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Send(frame) => write!(f, "Send({} bytes)", frame.len()),
            Self::Close => f.write_str("Close"),
        }
    }
}

impl Transport for WebSocketTransport {
    fn send(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        self.commands
            .send(Command::Send(frame))
            .map_err(|_| TransportError::ConnectionClosed("socket task ended".into()))
    }

    fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }
}

async fn run_connection(
    request: Request,
    mut commands: mpsc::UnboundedReceiver<Command>,
    inbound: InboundSender,
) {
    let ws = match tokio_tungstenite::connect_async(request).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            tracing::warn!(error = %e, "WebSocket handshake failed");
            inbound.push(TransportEvent::Failed(e.to_string()));
            return;
        }
    };
    tracing::info!("WebSocket connected");
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send(frame)) => {
                    if let Err(e) = sink.send(Message::Binary(frame.into())).await {
                        tracing::warn!(error = %e, "WebSocket send failed");
                        inbound.push(TransportEvent::Failed(e.to_string()));
                        return;
                    }
                }
                Some(Command::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    tracing::debug!("WebSocket closed by session");
                    inbound.push(TransportEvent::Closed("closed by client".into()));
                    return;
                }
            },
            message = stream.next() => match message {
                Some(Ok(Message::Binary(data))) => {
                    inbound.push(TransportEvent::Received(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    inbound.push(TransportEvent::Received(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .unwrap_or_default();
                    tracing::debug!(%reason, "WebSocket closed by peer");
                    inbound.push(TransportEvent::Closed(reason));
                    return;
                }
                Some(Ok(_)) => {} // ping/pong/raw frames
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "WebSocket receive failed");
                    inbound.push(TransportEvent::Failed(e.to_string()));
                    return;
                }
                None => {
                    inbound.push(TransportEvent::Closed("connection closed".into()));
                    return;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_copies_headers() {
        let request = ConnectRequest::new("ws://127.0.0.1:1/rooms")
            .header("x-app-id", "testapp")
            .header("authorization", "Bearer 1.2.3");

        let ws_request = WebSocketConnector::build_request(&request).unwrap();

        assert_eq!(ws_request.headers()["x-app-id"], "testapp");
        assert_eq!(ws_request.headers()["authorization"], "Bearer 1.2.3");
    }

    #[test]
    fn test_build_request_rejects_bad_url() {
        let result = WebSocketConnector::build_request(&ConnectRequest::new("not a url"));
        assert!(matches!(result, Err(TransportError::InvalidRequest(_))));
    }

    #[test]
    fn test_connect_outside_runtime_fails() {
        let (tx, _rx) = crate::inbound_channel();
        let result = WebSocketConnector.connect(ConnectRequest::new("ws://127.0.0.1:1"), tx);
        assert!(matches!(result, Err(TransportError::NoRuntime)));
    }
}
