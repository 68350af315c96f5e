//! Unified error type for pointing.

use pointing_protocol::ProtocolError;
use pointing_room::RoomError;
use pointing_session::SessionError;
use pointing_transport::TransportError;

/// Problems with a session link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The link carries no `gameId` query parameter.
    #[error("link has no gameId")]
    MissingGameId,
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PointingError {
    /// A transport-level error (claim, connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, unknown event).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A token error (invalid game id, no secure randomness).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A peer error (relay or participant).
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Link(#[from] LinkError),
}

impl PointingError {
    /// Returns `true` if this is a rejected game id, which users see as
    /// "Invalid Game ID".
    pub fn is_invalid_game_id(&self) -> bool {
        matches!(self, Self::Session(SessionError::InvalidTokenFormat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let pointing_err: PointingError = err.into();
        assert!(matches!(pointing_err, PointingError::Transport(_)));
        assert!(pointing_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::UnknownEventKind("kickPlayer".into());
        let pointing_err: PointingError = err.into();
        assert!(matches!(pointing_err, PointingError::Protocol(_)));
        assert!(pointing_err.to_string().contains("kickPlayer"));
    }

    #[test]
    fn test_from_session_error() {
        let pointing_err: PointingError = SessionError::InvalidTokenFormat.into();
        assert!(matches!(pointing_err, PointingError::Session(_)));
        assert!(pointing_err.is_invalid_game_id());
        assert_eq!(pointing_err.to_string(), "invalid game id");
    }

    #[test]
    fn test_from_room_error() {
        let pointing_err: PointingError = RoomError::AddressTaken("abc".into()).into();
        assert!(matches!(pointing_err, PointingError::Room(_)));
        assert!(!pointing_err.is_invalid_game_id());
    }

    #[test]
    fn test_from_link_error() {
        let pointing_err: PointingError = LinkError::MissingGameId.into();
        assert!(matches!(pointing_err, PointingError::Link(_)));
    }
}
