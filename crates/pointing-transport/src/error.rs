//! Error type shared by every transport.

/// Errors raised while claiming addresses or moving bytes between peers.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Another peer already holds the requested address.
    #[error("address already taken: {0}")]
    AddressTaken(String),

    /// The address could not be parsed by this transport.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Opening a connection to a remote address failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// This end was closed, or the remote peer went away.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Writing a message failed below the connection.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a message failed below the connection.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The listener stopped accepting.
    #[error("listener shut down")]
    Shutdown,
}
