//! Peer configuration and the relay state machine.

use pointing_protocol::EstimationScale;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RelayConfig
// ---------------------------------------------------------------------------

/// Configuration for a relay peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Capacity of the relay's inbox. Reader tasks wait when it is full.
    pub channel_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { channel_size: 256 }
    }
}

// ---------------------------------------------------------------------------
// ParticipantConfig
// ---------------------------------------------------------------------------

/// Configuration for a participant peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantConfig {
    /// Capacity of the participant's inbox.
    pub channel_size: usize,

    /// How many applied events a slow subscriber may fall behind before it
    /// starts missing some. State is always available through the watch
    /// channel regardless.
    pub event_buffer: usize,

    /// Point values this participant may vote.
    pub scale: EstimationScale,
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self {
            channel_size: 64,
            event_buffer: 64,
            scale: EstimationScale::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// RelayState
// ---------------------------------------------------------------------------

/// The lifecycle state of a relay.
///
/// Transitions are strictly ordered:
///
/// ```text
/// Unclaimed → Claiming → Active → Closed
/// ```
///
/// - **Unclaimed**: nothing has been asked of the transport yet.
/// - **Claiming**: waiting for the transport to grant the address.
/// - **Active**: accepting joiners and fanning out events.
/// - **Closed**: the address is released and every connection dropped.
///   A relay that lost the claim never gets here; it never existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayState {
    Unclaimed,
    Claiming,
    Active,
    Closed,
}

impl RelayState {
    /// Returns `true` while the relay accepts joiners.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns the state that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Unclaimed => Some(Self::Claiming),
            Self::Claiming => Some(Self::Active),
            Self::Active => Some(Self::Closed),
            Self::Closed => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unclaimed => write!(f, "Unclaimed"),
            Self::Claiming => write!(f, "Claiming"),
            Self::Active => write!(f, "Active"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_state_next_follows_strict_order() {
        assert_eq!(RelayState::Unclaimed.next(), Some(RelayState::Claiming));
        assert_eq!(RelayState::Claiming.next(), Some(RelayState::Active));
        assert_eq!(RelayState::Active.next(), Some(RelayState::Closed));
        assert_eq!(RelayState::Closed.next(), None);
    }

    #[test]
    fn test_relay_state_can_transition_to() {
        assert!(RelayState::Unclaimed.can_transition_to(RelayState::Claiming));
        assert!(!RelayState::Unclaimed.can_transition_to(RelayState::Active));
        assert!(!RelayState::Closed.can_transition_to(RelayState::Active));
        assert!(!RelayState::Active.can_transition_to(RelayState::Claiming));
    }

    #[test]
    fn test_relay_state_is_active() {
        assert!(!RelayState::Unclaimed.is_active());
        assert!(!RelayState::Claiming.is_active());
        assert!(RelayState::Active.is_active());
        assert!(!RelayState::Closed.is_active());
    }

    #[test]
    fn test_relay_state_display() {
        assert_eq!(RelayState::Claiming.to_string(), "Claiming");
        assert_eq!(RelayState::Closed.to_string(), "Closed");
    }

    #[test]
    fn test_participant_config_default() {
        let config = ParticipantConfig::default();
        assert_eq!(config.channel_size, 64);
        assert_eq!(config.event_buffer, 64);
        assert_eq!(config.scale, EstimationScale::default());
    }

    #[test]
    fn test_relay_config_default() {
        assert_eq!(RelayConfig::default().channel_size, 256);
    }
}
