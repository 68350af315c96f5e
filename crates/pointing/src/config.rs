//! Top-level configuration.

use pointing_room::{ParticipantConfig, RelayConfig};
use pointing_session::{SessionToken, TokenConfig};

/// Environment variable holding the deployment's signing secret.
pub const SECRET_ENV: &str = "POINTING_SECRET";
/// Environment variable holding the public site URL used in share links.
pub const SITE_ENV: &str = "SITE_URL";

/// Everything a [`GameSession`](crate::GameSession) needs.
#[derive(Debug, Clone)]
pub struct PointingConfig {
    /// Token signing secret.
    pub token: TokenConfig,

    /// Settings used when this peer becomes the relay.
    pub relay: RelayConfig,

    /// Settings for this peer's participant.
    pub participant: ParticipantConfig,

    /// `host:port` of the WebSocket rendezvous. `None` means the session
    /// address is the bare token, as on the in-process network.
    pub rendezvous: Option<String>,

    /// Public site URL; share links point at `{site}/game`.
    pub site: String,
}

impl Default for PointingConfig {
    fn default() -> Self {
        Self {
            token: TokenConfig::default(),
            relay: RelayConfig::default(),
            participant: ParticipantConfig::default(),
            rendezvous: None,
            site: "http://localhost:4321".to_string(),
        }
    }
}

impl PointingConfig {
    /// Defaults overridden by [`SECRET_ENV`] and [`SITE_ENV`] when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through
    /// `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(secret) = lookup(SECRET_ENV).filter(|s| !s.is_empty()) {
            config.token = TokenConfig::with_secret(secret);
        }
        if let Some(site) = lookup(SITE_ENV).filter(|s| !s.is_empty()) {
            config.site = site;
        }
        config
    }

    /// The transport address of the session named by `token`.
    pub fn address_for(&self, token: &SessionToken) -> String {
        match &self.rendezvous {
            Some(host) => format!("{host}/{token}"),
            None => token.to_string(),
        }
    }
}
