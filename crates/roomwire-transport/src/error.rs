/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection is gone; nothing more can be sent on it.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// The connect request couldn't be turned into a handshake
    /// (bad URL, header name, or header value).
    #[error("invalid connect request: {0}")]
    InvalidRequest(String),

    /// `connect` was called outside a Tokio runtime.
    #[error("no async runtime available to drive the connection")]
    NoRuntime,

    /// Every sender of an inbound queue was dropped without a
    /// closing event.
    #[error("inbound queue disconnected")]
    Disconnected,
}
