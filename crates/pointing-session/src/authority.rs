//! Generating and checking self-certifying session tokens.
//!
//! A token is `base62(random_id || mac)`, where `random_id` is 8 bytes
//! from the OS random source and `mac` is HMAC-SHA256 of `random_id`
//! under the deployment secret, truncated to its first 8 bytes. Any peer
//! holding the same secret can check a token offline.

use std::fmt;

use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::Sha256;

use crate::{base62, SessionError};

type HmacSha256 = Hmac<Sha256>;

/// Length of the random part of a token, in bytes.
pub const RANDOM_ID_LEN: usize = 8;
/// Length of the truncated signature, in bytes.
pub const SIGNATURE_LEN: usize = 8;
/// Length of a decoded token, in bytes.
pub const TOKEN_LEN: usize = RANDOM_ID_LEN + SIGNATURE_LEN;

// 62^22 > 2^128, so no valid token is longer than this.
const MAX_ENCODED_LEN: usize = 22;

/// Signing configuration for session tokens.
#[derive(Clone)]
pub struct TokenConfig {
    /// Secret shared by every client of one deployment. Tokens minted under
    /// one secret are invalid under any other.
    pub secret: Vec<u8>,
}

impl TokenConfig {
    pub fn with_secret(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self::with_secret(b"pointing-pro".to_vec())
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A session token that has passed validation.
///
/// Only [`TokenAuthority`] hands these out, so holding one means the
/// string is well-formed and signed under the authority's secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Mints and validates session tokens for one deployment secret.
#[derive(Debug, Clone)]
pub struct TokenAuthority {
    config: TokenConfig,
}

impl TokenAuthority {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    /// Generates a fresh token.
    ///
    /// The random id is redrawn while its first byte is zero. A leading
    /// zero would be lost by the base62 round trip and the token would
    /// then fail its own validation.
    ///
    /// # Errors
    /// - [`SessionError::SecureRandomUnavailable`] if the OS random source
    ///   fails
    /// - [`SessionError::InvalidSecret`] if the MAC rejects the secret
    pub fn generate(&self) -> Result<SessionToken, SessionError> {
        let mut random_id = [0u8; RANDOM_ID_LEN];
        loop {
            OsRng
                .try_fill_bytes(&mut random_id)
                .map_err(|e| SessionError::SecureRandomUnavailable(e.to_string()))?;
            if random_id[0] != 0 {
                break;
            }
        }

        let mac = self.mac(&random_id)?.finalize().into_bytes();
        let mut raw = Vec::with_capacity(TOKEN_LEN);
        raw.extend_from_slice(&random_id);
        raw.extend_from_slice(&mac[..SIGNATURE_LEN]);

        let token = SessionToken(base62::encode(&raw));
        tracing::debug!(token = %token, "generated session token");
        Ok(token)
    }

    /// Returns `true` only if `token` decodes to exactly [`TOKEN_LEN`]
    /// bytes whose trailing signature matches the leading random id.
    ///
    /// Fails closed: malformed input of any kind is simply invalid.
    pub fn validate(&self, token: &str) -> bool {
        if token.is_empty() || token.len() > MAX_ENCODED_LEN {
            return false;
        }
        let Ok(raw) = base62::decode(token) else {
            return false;
        };
        if raw.len() != TOKEN_LEN {
            return false;
        }

        let (random_id, signature) = raw.split_at(RANDOM_ID_LEN);
        match self.mac(random_id) {
            // Constant-time comparison against the leading bytes of the tag.
            Ok(mac) => mac.verify_truncated_left(signature).is_ok(),
            Err(_) => false,
        }
    }

    /// Validates `token` and wraps it.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidTokenFormat`] if the token does not
    /// validate.
    pub fn parse(&self, token: &str) -> Result<SessionToken, SessionError> {
        if self.validate(token) {
            Ok(SessionToken(token.to_string()))
        } else {
            tracing::debug!(token, "rejected session token");
            Err(SessionError::InvalidTokenFormat)
        }
    }

    fn mac(&self, data: &[u8]) -> Result<HmacSha256, SessionError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.config.secret)
            .map_err(|_| SessionError::InvalidSecret)?;
        mac.update(data);
        Ok(mac)
    }
}

impl Default for TokenAuthority {
    fn default() -> Self {
        Self::new(TokenConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> TokenAuthority {
        TokenAuthority::default()
    }

    fn raw_bytes(token: &SessionToken) -> Vec<u8> {
        base62::decode(token.as_str()).unwrap()
    }

    // =========================================================================
    // Generation
    // =========================================================================

    #[test]
    fn test_generated_tokens_validate() {
        let authority = authority();
        for _ in 0..200 {
            let token = authority.generate().unwrap();
            assert!(authority.validate(token.as_str()), "token {token} did not validate");
        }
    }

    #[test]
    fn test_generated_token_decodes_to_sixteen_bytes() {
        let token = authority().generate().unwrap();
        assert_eq!(raw_bytes(&token).len(), TOKEN_LEN);
        assert!(token.as_str().len() <= MAX_ENCODED_LEN);
        assert!(token.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_tokens_are_distinct() {
        let authority = authority();
        let a = authority.generate().unwrap();
        let b = authority.generate().unwrap();
        assert_ne!(a, b);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn test_every_signature_bit_flip_is_rejected() {
        let authority = authority();
        let token = authority.generate().unwrap();
        let raw = raw_bytes(&token);

        for byte in RANDOM_ID_LEN..TOKEN_LEN {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte] ^= 1 << bit;
                let encoded = base62::encode(&tampered);
                assert!(
                    !authority.validate(&encoded),
                    "flip of byte {byte} bit {bit} still validated"
                );
            }
        }
    }

    #[test]
    fn test_random_id_tamper_is_rejected() {
        let authority = authority();
        let token = authority.generate().unwrap();
        let mut raw = raw_bytes(&token);
        raw[RANDOM_ID_LEN - 1] ^= 0x01;

        assert!(!authority.validate(&base62::encode(&raw)));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let ours = authority();
        let theirs = TokenAuthority::new(TokenConfig::with_secret("another-secret"));

        let token = theirs.generate().unwrap();

        assert!(theirs.validate(token.as_str()));
        assert!(!ours.validate(token.as_str()));
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        let authority = authority();
        let token = authority.generate().unwrap();
        let raw = raw_bytes(&token);

        assert!(!authority.validate(&base62::encode(&raw[..TOKEN_LEN - 1])));

        let mut longer = raw.clone();
        longer.push(0);
        assert!(!authority.validate(&base62::encode(&longer)));
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        let authority = authority();
        for input in ["", "not a token", "abc-123", "0", "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz"] {
            assert!(!authority.validate(input), "{input:?} validated");
        }
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    #[test]
    fn test_parse_accepts_valid_token() {
        let authority = authority();
        let token = authority.generate().unwrap();

        let parsed = authority.parse(token.as_str()).unwrap();

        assert_eq!(parsed, token);
    }

    #[test]
    fn test_parse_rejects_with_invalid_game_id() {
        let err = authority().parse("garbage!").unwrap_err();

        assert!(matches!(err, SessionError::InvalidTokenFormat));
        assert_eq!(err.to_string(), "invalid game id");
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let config = TokenConfig::with_secret("hunter2");
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("redacted"));
    }
}
