//! The participant peer: one connection to the relay, one local replica.

use std::sync::Arc;

use pointing_protocol::{
    decode_event, encode_event, Codec, EstimationScale, GameState, Player, SessionEvent, Vote,
};
use pointing_transport::{Connection, Metadata, Transport};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::{reducer, ParticipantConfig, RoomError};

/// Where a participant's connection stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantStatus {
    /// Open, with the identity this participant votes under.
    Connected(Player),
    /// Closed by either side. There is no reconnect.
    Closed,
    /// Closed after the relay sent something that could not be decoded.
    Failed(String),
}

impl ParticipantStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    /// The local identity, cleared once the connection is gone.
    pub fn player(&self) -> Option<&Player> {
        match self {
            Self::Connected(player) => Some(player),
            _ => None,
        }
    }
}

enum ParticipantCommand {
    Send {
        event: SessionEvent,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Leave {
        reply: oneshot::Sender<()>,
    },
}

enum Inbound {
    Data(Vec<u8>),
    Closed,
}

/// Handle to a running participant.
///
/// Cheap to clone. When the last handle is dropped the connection closes.
#[derive(Debug)]
pub struct ParticipantHandle {
    sender: mpsc::Sender<ParticipantCommand>,
    state: watch::Receiver<GameState>,
    status: watch::Receiver<ParticipantStatus>,
    events: broadcast::Receiver<SessionEvent>,
    scale: EstimationScale,
}

impl Clone for ParticipantHandle {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            state: self.state.clone(),
            status: self.status.clone(),
            events: self.events.resubscribe(),
            scale: self.scale.clone(),
        }
    }
}

impl ParticipantHandle {
    /// This participant's identity while connected.
    pub fn player(&self) -> Option<Player> {
        self.status.borrow().player().cloned()
    }

    pub fn status(&self) -> ParticipantStatus {
        self.status.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.status.borrow().is_connected()
    }

    /// The current local replica.
    pub fn state(&self) -> GameState {
        self.state.borrow().clone()
    }

    /// A receiver that sees every new replica state.
    pub fn watch_state(&self) -> watch::Receiver<GameState> {
        self.state.clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<ParticipantStatus> {
        self.status.clone()
    }

    /// Subscribes to events as they are applied, starting now.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.resubscribe()
    }

    pub fn scale(&self) -> &EstimationScale {
        &self.scale
    }

    /// Casts (or changes) this participant's vote.
    ///
    /// # Errors
    /// - [`RoomError::InvalidVote`] if the points are not on the scale;
    ///   nothing is sent
    /// - [`RoomError::ConnectionClosed`] once the connection is gone
    pub async fn send_vote(&self, vote: Vote) -> Result<(), RoomError> {
        if let Vote::Points(points) = vote {
            if !self.scale.contains(points) {
                return Err(RoomError::InvalidVote(points));
            }
        }
        let player = self.player().ok_or(RoomError::ConnectionClosed)?;
        self.send(SessionEvent::Vote { player, vote }).await
    }

    /// Reveals or hides everyone's votes.
    pub async fn send_set_votes_shown(&self, shown: bool) -> Result<(), RoomError> {
        self.send(SessionEvent::ToggleVotesShown { shown }).await
    }

    /// Starts a new round.
    pub async fn send_clear_votes(&self) -> Result<(), RoomError> {
        self.send(SessionEvent::ClearVotes).await
    }

    /// Closes the connection. The relay tells everyone else.
    pub async fn leave(&self) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .sender
            .send(ParticipantCommand::Leave { reply: reply_tx })
            .await
            .is_err()
        {
            // Already gone.
            return Ok(());
        }
        let _ = reply_rx.await;
        Ok(())
    }

    /// Waits until the connection is no longer open and returns how it
    /// ended.
    pub async fn closed(&self) -> ParticipantStatus {
        let mut status = self.status.clone();
        let ended = status
            .wait_for(|s| !s.is_connected())
            .await
            .map(|s| s.clone());
        ended.unwrap_or_else(|_| status.borrow().clone())
    }

    async fn send(&self, event: SessionEvent) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(ParticipantCommand::Send {
                event,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::ConnectionClosed)?;
        reply_rx.await.map_err(|_| RoomError::ConnectionClosed)?
    }
}

/// Entry point for the participant role.
pub struct Participant;

impl Participant {
    /// Connects to the relay at `address` as `name`.
    ///
    /// Returns once the connection is open; the participant sends nothing
    /// until asked.
    pub async fn connect<T, K>(
        transport: &T,
        address: &str,
        name: impl Into<String>,
        codec: K,
        config: ParticipantConfig,
    ) -> Result<ParticipantHandle, RoomError>
    where
        T: Transport,
        K: Codec,
    {
        let name = name.into();
        let conn = transport
            .connect(address, Metadata::with_name(name.clone()))
            .await?;
        let player = Player::new(conn.local_id(), name);
        tracing::info!(address, peer = %player.id, name = %player.name, "participant connected");

        let conn = Arc::new(conn);
        let (inbound_tx, inbound_rx) = mpsc::channel(config.channel_size.max(1));
        let (command_tx, command_rx) = mpsc::channel(config.channel_size.max(1));
        let (state_tx, state_rx) = watch::channel(GameState::default());
        let (status_tx, status_rx) = watch::channel(ParticipantStatus::Connected(player.clone()));
        let (events_tx, events_rx) = broadcast::channel(config.event_buffer.max(1));

        let reader = tokio::spawn(read_loop(Arc::clone(&conn), inbound_tx));
        let actor = ParticipantActor {
            conn,
            codec,
            player,
            state: state_tx,
            status: status_tx,
            events: events_tx,
            inbound: inbound_rx,
            commands: command_rx,
            reader,
        };
        tokio::spawn(actor.run());

        Ok(ParticipantHandle {
            sender: command_tx,
            state: state_rx,
            status: status_rx,
            events: events_rx,
            scale: config.scale,
        })
    }
}

struct ParticipantActor<C, K> {
    conn: Arc<C>,
    codec: K,
    player: Player,
    state: watch::Sender<GameState>,
    status: watch::Sender<ParticipantStatus>,
    events: broadcast::Sender<SessionEvent>,
    inbound: mpsc::Receiver<Inbound>,
    commands: mpsc::Receiver<ParticipantCommand>,
    reader: JoinHandle<()>,
}

impl<C, K> ParticipantActor<C, K>
where
    C: Connection,
    K: Codec,
{
    async fn run(mut self) {
        tracing::debug!(peer = %self.player.id, "participant actor started");

        let mut leave_reply = None;
        let outcome = loop {
            tokio::select! {
                biased;
                msg = self.inbound.recv() => match msg {
                    Some(Inbound::Data(bytes)) => {
                        if let Err(reason) = self.handle_data(&bytes) {
                            break ParticipantStatus::Failed(reason);
                        }
                    }
                    Some(Inbound::Closed) | None => {
                        tracing::info!(peer = %self.player.id, "connection to relay closed");
                        break ParticipantStatus::Closed;
                    }
                },
                cmd = self.commands.recv() => match cmd {
                    Some(ParticipantCommand::Send { event, reply }) => {
                        let _ = reply.send(self.send(&event).await);
                    }
                    Some(ParticipantCommand::Leave { reply }) => {
                        tracing::info!(peer = %self.player.id, "leaving session");
                        leave_reply = Some(reply);
                        break ParticipantStatus::Closed;
                    }
                    None => break ParticipantStatus::Closed,
                },
            }
        };

        if let Err(e) = self.conn.close().await {
            tracing::debug!(peer = %self.player.id, error = %e, "close failed");
        }
        self.reader.abort();
        self.status.send_replace(outcome);
        if let Some(reply) = leave_reply {
            let _ = reply.send(());
        }

        tracing::debug!(peer = %self.player.id, "participant actor stopped");
    }

    /// Decodes and applies one message from the relay. An error carries
    /// the reason the connection must end.
    fn handle_data(&self, bytes: &[u8]) -> Result<(), String> {
        let event = match decode_event(&self.codec, bytes) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(peer = %self.player.id, error = %e, "undecodable event from relay, closing");
                return Err(e.to_string());
            }
        };
        tracing::debug!(peer = %self.player.id, kind = %event.kind(), "applying event");

        let next = reducer::apply(&self.state.borrow(), &event);
        self.state.send_replace(next);
        let _ = self.events.send(event);
        Ok(())
    }

    async fn send(&self, event: &SessionEvent) -> Result<(), RoomError> {
        let bytes = encode_event(&self.codec, event)?;
        tracing::debug!(peer = %self.player.id, kind = %event.kind(), "sending event");
        self.conn.send(&bytes).await?;
        Ok(())
    }
}

async fn read_loop<C: Connection>(conn: Arc<C>, inbound: mpsc::Sender<Inbound>) {
    loop {
        match conn.recv().await {
            Ok(Some(data)) => {
                if inbound.send(Inbound::Data(data)).await.is_err() {
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(peer = %conn.local_id(), error = %e, "receive failed");
                break;
            }
        }
    }
    let _ = inbound.send(Inbound::Closed).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_player_is_cleared_when_not_connected() {
        let player = Player::new("p", "Holly");

        assert_eq!(
            ParticipantStatus::Connected(player.clone()).player(),
            Some(&player)
        );
        assert_eq!(ParticipantStatus::Closed.player(), None);
        assert_eq!(ParticipantStatus::Failed("bad".into()).player(), None);
    }

    #[test]
    fn test_status_is_connected() {
        assert!(ParticipantStatus::Connected(Player::new("p", "x")).is_connected());
        assert!(!ParticipantStatus::Closed.is_connected());
        assert!(!ParticipantStatus::Failed(String::new()).is_connected());
    }
}
