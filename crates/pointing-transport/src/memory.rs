//! In-process transport: a shared address namespace backed by channels.
//!
//! Every [`MemoryNetwork`] clone sees the same namespace, the way every
//! browser sees the same public peer-id space. Claiming an address that a
//! live listener holds fails with [`TransportError::AddressTaken`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::{Connection, Listener, Metadata, PeerId, Transport, TransportError};

type Registry = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<MemoryConnection>>>>;

/// An in-process network of addressable peers.
///
/// Cheap to clone; clones share the namespace.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    listeners: Registry,
}

impl MemoryNetwork {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a live listener currently holds `address`.
    pub fn is_claimed(&self, address: &str) -> bool {
        self.registry()
            .get(address)
            .is_some_and(|tx| !tx.is_closed())
    }

    fn registry(
        &self,
    ) -> MutexGuard<'_, HashMap<String, mpsc::UnboundedSender<MemoryConnection>>>
    {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MemoryNetwork {
    type Listener = MemoryListener;
    type Connection = MemoryConnection;

    async fn claim(&self, address: &str) -> Result<MemoryListener, TransportError> {
        let mut listeners = self.registry();
        if listeners.get(address).is_some_and(|tx| !tx.is_closed()) {
            return Err(TransportError::AddressTaken(address.to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        listeners.insert(address.to_string(), tx.clone());
        tracing::debug!(address, "memory address claimed");

        Ok(MemoryListener {
            address: address.to_string(),
            incoming: rx,
            marker: tx,
            registry: Arc::clone(&self.listeners),
        })
    }

    async fn connect(
        &self,
        address: &str,
        metadata: Metadata,
    ) -> Result<MemoryConnection, TransportError> {
        let local_id = PeerId::random();
        let remote_id = PeerId::new(address);
        let (to_listener, from_dialer) = mpsc::unbounded_channel();
        let (to_dialer, from_listener) = mpsc::unbounded_channel();

        let accepted = MemoryConnection::new(
            remote_id.clone(),
            local_id.clone(),
            metadata.clone(),
            to_dialer,
            from_dialer,
        );
        let dialed = MemoryConnection::new(
            local_id,
            remote_id,
            metadata,
            to_listener,
            from_listener,
        );

        let listeners = self.registry();
        let listener = listeners.get(address).ok_or_else(|| {
            TransportError::ConnectionFailed(format!("no peer at {address}"))
        })?;
        listener.send(accepted).map_err(|_| {
            TransportError::ConnectionFailed(format!("peer at {address} is gone"))
        })?;

        tracing::debug!(address, local_id = %dialed.local_id, "memory connection opened");
        Ok(dialed)
    }
}

/// Inbound side of a claimed memory address.
pub struct MemoryListener {
    address: String,
    incoming: mpsc::UnboundedReceiver<MemoryConnection>,
    marker: mpsc::UnboundedSender<MemoryConnection>,
    registry: Registry,
}

impl Listener for MemoryListener {
    type Connection = MemoryConnection;

    async fn accept(&mut self) -> Result<MemoryConnection, TransportError> {
        self.incoming.recv().await.ok_or(TransportError::Shutdown)
    }

    fn address(&self) -> &str {
        &self.address
    }
}

impl Drop for MemoryListener {
    fn drop(&mut self) {
        let mut listeners =
            self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        if listeners
            .get(&self.address)
            .is_some_and(|tx| tx.same_channel(&self.marker))
        {
            listeners.remove(&self.address);
            tracing::debug!(address = %self.address, "memory address released");
        }
    }
}

/// One end of an in-process connection.
///
/// Closing or dropping this end makes the other end's `recv` return
/// `Ok(None)`.
pub struct MemoryConnection {
    local_id: PeerId,
    remote_id: PeerId,
    metadata: Metadata,
    outgoing: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    incoming: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl MemoryConnection {
    fn new(
        local_id: PeerId,
        remote_id: PeerId,
        metadata: Metadata,
        outgoing: mpsc::UnboundedSender<Vec<u8>>,
        incoming: mpsc::UnboundedReceiver<Vec<u8>>,
    ) -> Self {
        Self {
            local_id,
            remote_id,
            metadata,
            outgoing: Mutex::new(Some(outgoing)),
            incoming: tokio::sync::Mutex::new(incoming),
        }
    }
}

impl Connection for MemoryConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let outgoing = self.outgoing.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = outgoing.as_ref().ok_or_else(|| {
            TransportError::ConnectionClosed("closed locally".into())
        })?;
        tx.send(data.to_vec()).map_err(|_| {
            TransportError::ConnectionClosed(format!("peer {} went away", self.remote_id))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.incoming.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.outgoing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }

    fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    fn remote_id(&self) -> &PeerId {
        &self.remote_id
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}
