//! Codec trait and implementations for serializing/deserializing events.
//!
//! Peers only need something that implements [`Codec`]; which format sits
//! behind it is a deployment choice. [`JsonCodec`] is the default because
//! the browser clients exchange JSON.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{EventKind, ProtocolError, SessionEvent};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because relay and participant actors each hold
/// one for their whole lifetime on the Tokio runtime.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use pointing_protocol::{decode_event, Codec, JsonCodec, SessionEvent};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&SessionEvent::ToggleVotesShown { shown: true }).unwrap();
/// let event = decode_event(&codec, &bytes).unwrap();
/// assert_eq!(event, SessionEvent::ToggleVotesShown { shown: true });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Event helpers
// ---------------------------------------------------------------------------

/// Just the tag of an incoming event; every other field is ignored.
#[derive(Deserialize)]
struct EventHeader {
    event: String,
}

/// Decodes a [`SessionEvent`], telling unknown tags apart from malformed
/// data.
///
/// # Errors
/// - [`ProtocolError::UnknownEventKind`] if the `event` tag is not one
///   this build understands
/// - [`ProtocolError::Decode`] for anything else that fails to parse
pub fn decode_event<C: Codec>(codec: &C, data: &[u8]) -> Result<SessionEvent, ProtocolError> {
    let header: EventHeader = codec.decode(data)?;
    if EventKind::from_tag(&header.event).is_none() {
        return Err(ProtocolError::UnknownEventKind(header.event));
    }
    codec.decode(data)
}

/// Encodes a [`SessionEvent`].
pub fn encode_event<C: Codec>(codec: &C, event: &SessionEvent) -> Result<Vec<u8>, ProtocolError> {
    codec.encode(event)
}
