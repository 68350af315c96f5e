//! The relay peer: claims the session address and fans events out.
//!
//! The relay is an actor. An acceptor task turns inbound opens into inbox
//! messages, and one reader task per connection turns received bytes and
//! closes into inbox messages. The actor drains the inbox serially and
//! finishes writing each broadcast to every connection before taking the
//! next message, so the order it receives in is the order everyone sees.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pointing_protocol::{decode_event, encode_event, Codec, GameState, Player, SessionEvent};
use pointing_transport::{Connection, Listener, PeerId, Transport, TransportError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::{reducer, RelayConfig, RelayState, RoomError};

/// Messages from the acceptor and reader tasks.
enum RelayInbox<C> {
    Opened(C),
    Data { peer: PeerId, data: Vec<u8> },
    Closed { peer: PeerId },
}

/// Commands sent from a [`RelayHandle`].
enum RelayCommand {
    GetInfo { reply: oneshot::Sender<RelayInfo> },
    Shutdown { reply: oneshot::Sender<()> },
}

/// A snapshot of a running relay.
#[derive(Debug, Clone)]
pub struct RelayInfo {
    /// The address the relay is reachable at.
    pub address: String,
    pub state: RelayState,
    /// Number of open connections.
    pub peer_count: usize,
    /// The relay's view of the game, as sent to the next joiner.
    pub snapshot: GameState,
}

/// Handle to a running relay.
///
/// Cheap to clone. When the last handle is dropped the relay shuts down.
#[derive(Clone)]
pub struct RelayHandle {
    address: String,
    state: watch::Receiver<RelayState>,
    sender: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    /// The address the relay is reachable at.
    ///
    /// May differ from the requested one when the transport resolves it,
    /// for example an ephemeral port.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn state(&self) -> RelayState {
        *self.state.borrow()
    }

    /// Requests the relay's current info.
    pub async fn info(&self) -> Result<RelayInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RelayCommand::GetInfo { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable("relay"))?;
        reply_rx.await.map_err(|_| RoomError::Unavailable("relay"))
    }

    /// The state a new joiner would receive right now.
    pub async fn snapshot(&self) -> Result<GameState, RoomError> {
        Ok(self.info().await?.snapshot)
    }

    /// Releases the address and drops every connection without telling the
    /// peers anything. Returns once the address is free again.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RelayCommand::Shutdown { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Unavailable("relay"))?;
        reply_rx.await.map_err(|_| RoomError::Unavailable("relay"))
    }
}

impl std::fmt::Debug for RelayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayHandle")
            .field("address", &self.address)
            .field("state", &self.state())
            .finish()
    }
}

/// Entry point for the relay role.
pub struct Relay;

impl Relay {
    /// Claims `address` on `transport` and starts relaying.
    ///
    /// # Errors
    /// - [`RoomError::AddressTaken`] if another peer holds the address;
    ///   the caller should join as a plain participant
    /// - [`RoomError::Transport`] for any other claim failure
    pub async fn claim<T, K>(
        transport: &T,
        address: &str,
        codec: K,
        config: RelayConfig,
    ) -> Result<RelayHandle, RoomError>
    where
        T: Transport,
        K: Codec,
    {
        let (state_tx, state_rx) = watch::channel(RelayState::Unclaimed);
        transition(&state_tx, RelayState::Claiming);

        let listener = match transport.claim(address).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::debug!(address, error = %e, "relay claim failed");
                return Err(RoomError::from_claim(e));
            }
        };
        let address = listener.address().to_string();

        let (inbox_tx, inbox_rx) = mpsc::channel(config.channel_size.max(1));
        let (command_tx, command_rx) = mpsc::channel(8);
        let acceptor = tokio::spawn(accept_loop(listener, inbox_tx.clone()));

        transition(&state_tx, RelayState::Active);
        tracing::info!(%address, "relay claimed session address");

        let actor = RelayActor {
            address: address.clone(),
            codec,
            peers: HashMap::new(),
            mirror: GameState::default(),
            acceptor,
            state: state_tx,
            inbox_tx,
            inbox: inbox_rx,
            commands: command_rx,
        };
        tokio::spawn(actor.run());

        Ok(RelayHandle {
            address,
            state: state_rx,
            sender: command_tx,
        })
    }
}

fn transition(state: &watch::Sender<RelayState>, target: RelayState) {
    let current = *state.borrow();
    if current.can_transition_to(target) {
        state.send_replace(target);
        tracing::debug!(from = %current, to = %target, "relay state changed");
    } else {
        tracing::warn!(from = %current, to = %target, "invalid relay state transition ignored");
    }
}

struct Peer<C> {
    player: Player,
    conn: Arc<C>,
    reader: JoinHandle<()>,
}

struct RelayActor<C, K> {
    address: String,
    codec: K,
    peers: HashMap<PeerId, Peer<C>>,
    /// Every broadcast event folded through the reducer, in broadcast
    /// order. This is the snapshot new joiners get.
    mirror: GameState,
    acceptor: JoinHandle<()>,
    state: watch::Sender<RelayState>,
    inbox_tx: mpsc::Sender<RelayInbox<C>>,
    inbox: mpsc::Receiver<RelayInbox<C>>,
    commands: mpsc::Receiver<RelayCommand>,
}

impl<C, K> RelayActor<C, K>
where
    C: Connection,
    K: Codec,
{
    async fn run(mut self) {
        tracing::info!(address = %self.address, "relay actor started");

        loop {
            tokio::select! {
                biased;
                cmd = self.commands.recv() => match cmd {
                    Some(RelayCommand::GetInfo { reply }) => {
                        let _ = reply.send(self.info());
                    }
                    Some(RelayCommand::Shutdown { reply }) => {
                        self.close().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        tracing::debug!(address = %self.address, "all relay handles dropped");
                        self.close().await;
                        break;
                    }
                },
                Some(msg) = self.inbox.recv() => match msg {
                    RelayInbox::Opened(conn) => self.handle_open(conn).await,
                    RelayInbox::Data { peer, data } => self.handle_data(peer, data).await,
                    RelayInbox::Closed { peer } => self.handle_close(peer).await,
                },
            }
        }

        tracing::info!(address = %self.address, "relay actor stopped");
    }

    async fn handle_open(&mut self, conn: C) {
        let conn = Arc::new(conn);
        let peer = conn.remote_id().clone();
        if self.peers.contains_key(&peer) {
            tracing::warn!(address = %self.address, %peer, "duplicate peer id, dropping connection");
            let _ = conn.close().await;
            return;
        }

        let player = Player::new(&peer, conn.metadata().name.clone());
        tracing::info!(
            address = %self.address,
            %peer,
            name = %player.name,
            players = self.peers.len() + 1,
            "connection opened"
        );

        // The newcomer gets the snapshot before anyone hears about them.
        let sync = SessionEvent::SyncState {
            game_state: self.mirror.clone(),
        };
        match encode_event(&self.codec, &sync) {
            Ok(bytes) => {
                if let Err(e) = conn.send(&bytes).await {
                    tracing::warn!(%peer, error = %e, "dropped snapshot send");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to encode snapshot"),
        }

        let reader = tokio::spawn(read_loop(Arc::clone(&conn), self.inbox_tx.clone()));
        self.peers.insert(
            peer,
            Peer {
                player: player.clone(),
                conn,
                reader,
            },
        );

        self.broadcast_event(&SessionEvent::PlayerJoin { player }).await;
    }

    async fn handle_data(&mut self, peer: PeerId, data: Vec<u8>) {
        match decode_event(&self.codec, &data) {
            Ok(event) => {
                tracing::debug!(%peer, kind = %event.kind(), "relaying event");
                self.mirror = reducer::apply(&self.mirror, &event);
            }
            Err(e) => {
                tracing::warn!(%peer, error = %e, "relaying undecodable event");
            }
        }
        self.broadcast(&data).await;
    }

    async fn handle_close(&mut self, peer: PeerId) {
        let Some(gone) = self.peers.remove(&peer) else {
            return;
        };
        tracing::info!(
            address = %self.address,
            %peer,
            players = self.peers.len(),
            "connection closed"
        );
        self.broadcast_event(&SessionEvent::PlayerLeave {
            player: gone.player,
        })
        .await;
    }

    /// Broadcasts an event the relay itself originates.
    async fn broadcast_event(&mut self, event: &SessionEvent) {
        let bytes = match encode_event(&self.codec, event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(kind = %event.kind(), error = %e, "failed to encode event");
                return;
            }
        };
        self.mirror = reducer::apply(&self.mirror, event);
        self.broadcast(&bytes).await;
    }

    /// Writes `data` to every connection, the sender included.
    async fn broadcast(&self, data: &[u8]) {
        for (peer, entry) in &self.peers {
            if let Err(e) = entry.conn.send(data).await {
                tracing::warn!(%peer, error = %e, "dropped send");
            }
        }
    }

    async fn close(&mut self) {
        self.acceptor.abort();
        let _ = (&mut self.acceptor).await;

        let count = self.peers.len();
        for (_, peer) in self.peers.drain() {
            peer.reader.abort();
            let _ = peer.reader.await;
        }

        transition(&self.state, RelayState::Closed);
        tracing::info!(address = %self.address, dropped = count, "relay closed");
    }

    fn info(&self) -> RelayInfo {
        RelayInfo {
            address: self.address.clone(),
            state: *self.state.borrow(),
            peer_count: self.peers.len(),
            snapshot: self.mirror.clone(),
        }
    }
}

/// Pause after a failed accept, so a persistent error does not spin.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Consecutive accept failures after which the relay stops taking joins.
const MAX_ACCEPT_FAILURES: u32 = 5;

async fn accept_loop<L: Listener>(mut listener: L, inbox: mpsc::Sender<RelayInbox<L::Connection>>) {
    let mut failures = 0;
    loop {
        match listener.accept().await {
            Ok(conn) => {
                failures = 0;
                if inbox.send(RelayInbox::Opened(conn)).await.is_err() {
                    break;
                }
            }
            Err(TransportError::Shutdown) => break,
            Err(e) => {
                failures += 1;
                if failures >= MAX_ACCEPT_FAILURES {
                    tracing::error!(
                        address = listener.address(),
                        error = %e,
                        failures,
                        "accept keeps failing, no longer accepting joins"
                    );
                    break;
                }
                tracing::warn!(
                    address = listener.address(),
                    error = %e,
                    failures,
                    "accept failed, retrying"
                );
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
            }
        }
    }
}

async fn read_loop<C: Connection>(conn: Arc<C>, inbox: mpsc::Sender<RelayInbox<C>>) {
    let peer = conn.remote_id().clone();
    loop {
        match conn.recv().await {
            Ok(Some(data)) => {
                let msg = RelayInbox::Data {
                    peer: peer.clone(),
                    data,
                };
                if inbox.send(msg).await.is_err() {
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(%peer, error = %e, "receive failed");
                break;
            }
        }
    }
    let _ = inbox.send(RelayInbox::Closed { peer }).await;
}
