/// Errors raised by the live-update client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The URL is not a `ws://` or `wss://` URL.
    #[error("Invalid WebSocket URL '{0}'")]
    InvalidUrl(String),

    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A frame could not be read from an established connection.
    #[error("Protocol error: {0}")]
    Protocol(String),
}
