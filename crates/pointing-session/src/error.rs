//! Error types for the session identity layer.

/// Errors that can occur while generating or reading session tokens.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token is not a base62 string, or does not carry a valid
    /// signature for this deployment's secret.
    ///
    /// Shown to users as "Invalid Game ID", before any connection attempt.
    #[error("invalid game id")]
    InvalidTokenFormat,

    /// The platform's secure random source could not be read. There is no
    /// fallback; a token cannot be generated without it.
    #[error("secure random source unavailable: {0}")]
    SecureRandomUnavailable(String),

    /// The configured signing secret was rejected by the MAC.
    #[error("signing secret rejected")]
    InvalidSecret,
}
