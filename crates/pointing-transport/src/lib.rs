//! Peer transport capability for pointing sessions.
//!
//! The session core never opens sockets itself. It consumes the
//! [`Transport`] capability: claim an address to become reachable there,
//! or connect to an address with some [`Metadata`] attached. Each side of
//! a link is a [`Connection`] that moves opaque byte messages and knows
//! the transport-assigned [`PeerId`] of both ends.
//!
//! # Implementations
//!
//! - [`MemoryNetwork`]: an in-process address namespace (always built)
//! - `WebSocketTransport`: WebSocket links, feature `websocket` (default)

mod error;
mod memory;
pub mod query;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use memory::{MemoryConnection, MemoryListener, MemoryNetwork};
#[cfg(feature = "websocket")]
pub use websocket::{
    WebSocketConnection, WebSocketListener, WebSocketTransport, DEFAULT_HANDSHAKE_TIMEOUT,
};

use std::fmt;
use std::future::Future;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Transport-assigned identifier of one end of a connection.
///
/// Unique per connection and stable for its lifetime. Nothing promises
/// the same id after a reconnect.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier (16 hex characters).
    pub fn random() -> Self {
        let bytes: [u8; 8] = rand::rng().random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id, returning the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque metadata a connecting peer attaches to its connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Display name chosen by the connecting participant.
    pub name: String,
}

impl Metadata {
    /// Creates metadata carrying the given display name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The capability to claim addresses and open connections to them.
pub trait Transport: Send + Sync + 'static {
    /// Acceptor returned by a successful claim.
    type Listener: Listener;
    /// Connection produced by [`connect`](Self::connect).
    type Connection: Connection;

    /// Attempts to become reachable at `address`.
    ///
    /// Fails with [`TransportError::AddressTaken`] when another peer
    /// already holds it.
    fn claim(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Self::Listener, TransportError>> + Send;

    /// Opens a connection to the peer at `address`.
    ///
    /// Resolves once the connection is open, so callers never hold a
    /// connection they cannot send on yet.
    fn connect(
        &self,
        address: &str,
        metadata: Metadata,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// Accepts inbound connections on a claimed address.
///
/// Dropping the listener releases the address.
pub trait Listener: Send + 'static {
    /// The connection type produced on accept.
    type Connection: Connection;

    /// Waits for the next inbound connection to open.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;

    /// The address this listener is reachable at.
    fn address(&self) -> &str;
}

/// A single open connection that can send and receive byte messages.
pub trait Connection: Send + Sync + 'static {
    /// Sends one message to the remote peer.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Id of this end of the connection.
    fn local_id(&self) -> &PeerId;

    /// Id of the remote end of the connection.
    fn remote_id(&self) -> &PeerId;

    /// Metadata the connecting side attached.
    fn metadata(&self) -> &Metadata;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_id_display_is_inner_string() {
        let id = PeerId::new("abc");
        assert_eq!(id.to_string(), "abc");
        assert_eq!(id.as_str(), "abc");
    }

    #[test]
    fn test_peer_id_random_is_16_hex_chars() {
        let id = PeerId::random();
        assert_eq!(id.as_str().len(), 16);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_peer_id_random_values_differ() {
        assert_ne!(PeerId::random(), PeerId::random());
    }

    #[test]
    fn test_peer_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(PeerId::new("a"), "holly");
        map.insert(PeerId::new("b"), "flynn");
        assert_eq!(map[&PeerId::new("a")], "holly");
    }
}
