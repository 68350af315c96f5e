//! # pointing
//!
//! Planning poker without a server. The first peer to open a session
//! becomes its relay; everyone, the relay's own host included, joins as a
//! participant and keeps a replica of the votes in sync by folding the
//! relay's event stream through a shared reducer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pointing::prelude::*;
//!
//! # async fn run() -> Result<(), PointingError> {
//! let network = MemoryNetwork::new();
//! let config = PointingConfig::default();
//!
//! let holly = GameSession::create(&network, "Holly", &config).await?;
//! let flynn = GameSession::join(&network, holly.token().as_str(), "Flynn", &config).await?;
//! assert!(holly.is_relay() && !flynn.is_relay());
//!
//! flynn.participant().send_vote(Vote::Points(5)).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod link;
mod session;

pub use config::{PointingConfig, SECRET_ENV, SITE_ENV};
pub use error::{LinkError, PointingError};
pub use link::{SessionLink, GAME_ID_PARAM, NAME_PARAM};
pub use session::GameSession;

/// Common imports for pointing users.
pub mod prelude {
    pub use crate::{GameSession, LinkError, PointingConfig, PointingError, SessionLink};
    pub use pointing_protocol::{
        EstimationScale, GameState, JsonCodec, Player, PlayerId, RoundSummary, SessionEvent, Vote,
    };
    pub use pointing_room::{
        ParticipantConfig, ParticipantHandle, ParticipantStatus, RelayConfig, RelayHandle,
        RelayState, RoomError,
    };
    pub use pointing_session::{SessionError, SessionToken, TokenAuthority, TokenConfig};
    pub use pointing_transport::{MemoryNetwork, Transport, TransportError, WebSocketTransport};
}
