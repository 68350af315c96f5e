//! Creating, joining and leaving a planning session.
//!
//! Joining always follows the same steps: validate the token, try to
//! become the session's relay, fall back to plain participant if someone
//! else already is, then connect as a participant.

use pointing_protocol::JsonCodec;
use pointing_room::{Participant, ParticipantHandle, Relay, RelayHandle, RoomError};
use pointing_session::{SessionToken, TokenAuthority};
use pointing_transport::Transport;

use crate::{PointingConfig, PointingError, SessionLink};

/// One peer's membership in a planning session.
pub struct GameSession {
    token: SessionToken,
    address: String,
    relay: Option<RelayHandle>,
    participant: ParticipantHandle,
    link: SessionLink,
}

impl GameSession {
    /// Starts a new session under a freshly generated token.
    ///
    /// # Errors
    /// [`PointingError::Session`] if no token can be generated, otherwise
    /// the same errors as [`join`](Self::join).
    pub async fn create<T: Transport>(
        transport: &T,
        name: &str,
        config: &PointingConfig,
    ) -> Result<Self, PointingError> {
        let token = TokenAuthority::new(config.token.clone()).generate()?;
        tracing::info!(%token, "created session");
        Self::enter(transport, token, name, config).await
    }

    /// Joins the session named by `game_id`.
    ///
    /// An invalid id is rejected before anything touches the network.
    ///
    /// # Errors
    /// - [`PointingError::Session`] with `InvalidTokenFormat` for a bad id
    /// - [`PointingError::Room`] if the relay cannot be reached
    pub async fn join<T: Transport>(
        transport: &T,
        game_id: &str,
        name: &str,
        config: &PointingConfig,
    ) -> Result<Self, PointingError> {
        let token = TokenAuthority::new(config.token.clone()).parse(game_id.trim())?;
        Self::enter(transport, token, name, config).await
    }

    async fn enter<T: Transport>(
        transport: &T,
        token: SessionToken,
        name: &str,
        config: &PointingConfig,
    ) -> Result<Self, PointingError> {
        let address = config.address_for(&token);

        let relay = match Relay::claim(transport, &address, JsonCodec, config.relay.clone()).await {
            Ok(relay) => Some(relay),
            Err(RoomError::AddressTaken(_)) => {
                tracing::info!(%address, "session already has a relay, joining as participant");
                None
            }
            Err(e) => return Err(e.into()),
        };
        // A resolved address (say, an ephemeral port) is what peers reach.
        let address = relay
            .as_ref()
            .map_or(address, |relay| relay.address().to_string());

        let participant = match Participant::connect(
            transport,
            &address,
            name,
            JsonCodec,
            config.participant.clone(),
        )
        .await
        {
            Ok(participant) => participant,
            Err(e) => {
                if let Some(relay) = &relay {
                    let _ = relay.shutdown().await;
                }
                return Err(e.into());
            }
        };

        tracing::info!(%address, relay = relay.is_some(), name, "joined session");
        let link = SessionLink::new(&config.site, &token);
        Ok(Self {
            token,
            address,
            relay,
            participant,
            link,
        })
    }

    /// Returns `true` if this peer is the session's relay.
    pub fn is_relay(&self) -> bool {
        self.relay.is_some()
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// The transport address the participant connected to.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn participant(&self) -> &ParticipantHandle {
        &self.participant
    }

    pub fn relay(&self) -> Option<&RelayHandle> {
        self.relay.as_ref()
    }

    /// The link to share with other players. Carries no name.
    pub fn link(&self) -> &SessionLink {
        &self.link
    }

    /// Leaves the session. A relay host takes the relay down with it,
    /// which closes everyone else's connection too.
    pub async fn leave(self) -> Result<(), PointingError> {
        self.participant.leave().await?;
        if let Some(relay) = self.relay {
            relay.shutdown().await?;
        }
        tracing::info!(token = %self.token, "left session");
        Ok(())
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("token", &self.token)
            .field("address", &self.address)
            .field("is_relay", &self.is_relay())
            .finish()
    }
}
