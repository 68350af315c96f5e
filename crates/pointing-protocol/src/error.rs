//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum, so a
//! `ProtocolError` always means the bytes or their meaning were wrong,
//! never the network underneath.

/// Errors that can occur while encoding or decoding session events.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed data, missing fields, or wrong
    /// field types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message carried an `event` tag this build does not know.
    ///
    /// Reported instead of ignored so that protocol drift between peers
    /// shows up immediately.
    #[error("unknown event kind: {0:?}")]
    UnknownEventKind(String),
}
