//! Error types for the peer layer.

use pointing_protocol::ProtocolError;
use pointing_transport::TransportError;

/// Errors that can occur while running a relay or participant.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// Another peer already holds the session address. The caller should
    /// join as a plain participant instead.
    #[error("session address {0} is already claimed")]
    AddressTaken(String),

    /// The participant's connection is gone; nothing more can be sent.
    #[error("connection closed")]
    ConnectionClosed,

    /// The vote is not on the participant's estimation scale.
    #[error("{0} is not on the estimation scale")]
    InvalidVote(u32),

    /// The peer's actor has stopped.
    #[error("{0} is unavailable")]
    Unavailable(&'static str),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl RoomError {
    /// Lifts a claim failure, keeping `AddressTaken` recognizable.
    pub(crate) fn from_claim(err: TransportError) -> Self {
        match err {
            TransportError::AddressTaken(address) => Self::AddressTaken(address),
            other => Self::Transport(other),
        }
    }
}
