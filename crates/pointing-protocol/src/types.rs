//! Core protocol types for the session wire format.
//!
//! Everything here travels between peers: the replicated [`GameState`]
//! and the [`SessionEvent`]s that evolve it. The JSON shapes are fixed by
//! the browser clients that speak the same protocol, so the serde
//! attributes below are part of the contract.

use std::collections::BTreeMap;
use std::fmt;

use pointing_transport::PeerId;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifies a participant for the lifetime of its connection.
///
/// Assigned by the transport (the participant's local peer id), so it is
/// unique per connection but not stable across reconnects.
///
/// `#[serde(transparent)]` keeps it a plain string on the wire, which also
/// lets it be a JSON object key in [`GameState::players`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<PeerId> for PlayerId {
    fn from(peer: PeerId) -> Self {
        Self(peer.into_inner())
    }
}

impl From<&PeerId> for PlayerId {
    fn from(peer: &PeerId) -> Self {
        Self(peer.as_str().to_string())
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A participant as other peers see it.
///
/// The name is whatever the client typed. Nobody checks it and it need
/// not be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Vote
// ---------------------------------------------------------------------------

/// Wire marker for an abstaining vote.
pub const ABSTAIN_MARKER: &str = "🐘";

/// A player's vote in the current round.
///
/// On the wire: a number for [`Vote::Points`], the string
/// [`ABSTAIN_MARKER`] for [`Vote::Abstain`], and `null` for
/// [`Vote::Unset`]. `Unset` is the only valid value for a player who has
/// not voted yet this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Vote {
    /// No vote cast this round.
    #[default]
    Unset,
    /// The player explicitly sits this round out.
    Abstain,
    /// A positive value from the estimation scale.
    Points(u32),
}

impl Vote {
    /// Returns `true` for anything but [`Vote::Unset`].
    pub fn is_cast(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Returns the point value, if this is a points vote.
    pub fn points(&self) -> Option<u32> {
        match self {
            Self::Points(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("-"),
            Self::Abstain => f.write_str(ABSTAIN_MARKER),
            Self::Points(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for Vote {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unset => serializer.serialize_none(),
            Self::Abstain => serializer.serialize_str(ABSTAIN_MARKER),
            Self::Points(n) => serializer.serialize_u32(*n),
        }
    }
}

/// The non-null shapes a vote can take on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireVote {
    Points(u32),
    Marker(String),
}

impl<'de> Deserialize<'de> for Vote {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<WireVote>::deserialize(deserializer)? {
            None => Ok(Self::Unset),
            Some(WireVote::Points(0)) => {
                Err(de::Error::custom("vote points must be positive"))
            }
            Some(WireVote::Points(n)) => Ok(Self::Points(n)),
            Some(WireVote::Marker(marker)) if marker == ABSTAIN_MARKER => Ok(Self::Abstain),
            Some(WireVote::Marker(marker)) => {
                Err(de::Error::custom(format!("unknown vote marker {marker:?}")))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// One row of [`GameState::players`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub name: String,
    #[serde(default)]
    pub vote: Vote,
}

/// The replicated session state every peer converges on.
///
/// The key set of `players` is exactly the set of connected participants.
/// `votes_visible` is session-wide. A `BTreeMap` keeps iteration and
/// serialization order stable, so equal states always compare and encode
/// the same.
///
/// States are never edited in place by the protocol: every transition
/// produces a new value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub players: BTreeMap<PlayerId, PlayerEntry>,
    pub votes_visible: bool,
}

impl GameState {
    /// Looks up a player's row.
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerEntry> {
        self.players.get(id)
    }

    /// Returns the vote of a player, if present.
    pub fn vote_of(&self, id: &PlayerId) -> Option<Vote> {
        self.players.get(id).map(|entry| entry.vote)
    }

    /// Number of connected players.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Number of players who have cast a vote (points or abstain).
    pub fn cast_count(&self) -> usize {
        self.players.values().filter(|p| p.vote.is_cast()).count()
    }
}

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// The only unit of communication between peers.
///
/// `#[serde(tag = "event")]` produces the internally tagged shape the
/// browser clients use:
///   `{ "event": "toggleVotesShown", "shown": true }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A player cast (or changed) a vote.
    Vote {
        player: Player,
        #[serde(default)]
        vote: Vote,
    },

    /// Relay → all: a participant's connection opened.
    PlayerJoin { player: Player },

    /// Relay → all: a participant's connection closed.
    PlayerLeave { player: Player },

    /// Reveal or hide everyone's votes.
    ToggleVotesShown { shown: bool },

    /// Start a new round: unset all votes and hide them.
    ClearVotes,

    /// Relay → newcomer: the relay's current view, sent once on join.
    SyncState {
        #[serde(rename = "gameState")]
        game_state: GameState,
    },
}

impl SessionEvent {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Vote { .. } => EventKind::Vote,
            Self::PlayerJoin { .. } => EventKind::PlayerJoin,
            Self::PlayerLeave { .. } => EventKind::PlayerLeave,
            Self::ToggleVotesShown { .. } => EventKind::ToggleVotesShown,
            Self::ClearVotes => EventKind::ClearVotes,
            Self::SyncState { .. } => EventKind::SyncState,
        }
    }
}

/// The tag of a [`SessionEvent`], without its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Vote,
    PlayerJoin,
    PlayerLeave,
    ToggleVotesShown,
    ClearVotes,
    SyncState,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 6] = [
        Self::Vote,
        Self::PlayerJoin,
        Self::PlayerLeave,
        Self::ToggleVotesShown,
        Self::ClearVotes,
        Self::SyncState,
    ];

    /// The wire value of the `event` field.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Vote => "vote",
            Self::PlayerJoin => "playerJoin",
            Self::PlayerLeave => "playerLeave",
            Self::ToggleVotesShown => "toggleVotesShown",
            Self::ClearVotes => "clearVotes",
            Self::SyncState => "syncState",
        }
    }

    /// Parses a wire tag. Returns `None` for tags this build doesn't know.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// =========================================================================
// Tests
// =========================================================================
