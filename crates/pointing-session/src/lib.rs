//! Session identity for pointing.
//!
//! A planning session is named by a short base62 token that any client can
//! check offline, before it tries to reach anyone:
//!
//! ```text
//! token = base62(random_id[8] || HMAC-SHA256(secret, random_id)[..8])
//! ```
//!
//! The same token doubles as the relay's public address, so a token that
//! fails validation never leads to a connection attempt.
//!
//! ```rust
//! use pointing_session::{TokenAuthority, TokenConfig};
//!
//! let authority = TokenAuthority::new(TokenConfig::default());
//! let token = authority.generate().unwrap();
//! assert!(authority.validate(token.as_str()));
//! assert!(!authority.validate("not-a-token"));
//! ```

pub mod base62;
mod authority;
mod error;

pub use authority::{
    SessionToken, TokenAuthority, TokenConfig, RANDOM_ID_LEN, SIGNATURE_LEN, TOKEN_LEN,
};
pub use error::SessionError;
