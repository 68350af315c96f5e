//! Wire protocol for pointing sessions.
//!
//! This crate defines what peers say to each other:
//!
//! - **Types** ([`SessionEvent`], [`GameState`], [`Vote`], [`Player`]):
//!   the replicated state and the events that evolve it.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`], [`decode_event`]): how
//!   events become bytes and back.
//! - **Summary** ([`EstimationScale`], [`RoundSummary`]): the voting scale
//!   and per-round statistics derived from a state.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw bytes) and the
//! peers (relay and participant). It knows nothing about connections.
//!
//! ```text
//! Transport (bytes) → Protocol (SessionEvent) → Room (reducer, peers)
//! ```

mod codec;
mod error;
mod summary;
mod types;

pub use codec::{decode_event, encode_event, Codec};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use summary::{EstimationScale, RoundSummary};
pub use types::{
    EventKind, GameState, Player, PlayerEntry, PlayerId, SessionEvent, Vote,
    ABSTAIN_MARKER,
};
