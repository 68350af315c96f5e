//! Relay and participant peers for pointing sessions.
//!
//! A session has exactly one relay, the peer that won the claim on the
//! session address. Every peer, the relay's host included, joins as a
//! participant connected to it:
//!
//! ```text
//!   Participant ─┐
//!   Participant ─┼──► Relay ──► every Participant (sender included)
//!   Participant ─┘
//! ```
//!
//! Each peer is an actor running on its own Tokio task. Participants fold
//! what the relay delivers through the [`reducer`], so all replicas agree
//! once they have seen the same events.
//!
//! # Key types
//!
//! - [`Relay`] / [`RelayHandle`]: claim an address and fan events out
//! - [`Participant`] / [`ParticipantHandle`]: vote, reveal, clear, watch
//! - [`RelayState`]: relay lifecycle state machine
//! - [`RelayConfig`], [`ParticipantConfig`]: channel sizes and the scale

mod config;
mod error;
mod participant;
pub mod reducer;
mod relay;

pub use config::{ParticipantConfig, RelayConfig, RelayState};
pub use error::RoomError;
pub use participant::{Participant, ParticipantHandle, ParticipantStatus};
pub use relay::{Relay, RelayHandle, RelayInfo};
