//! Shareable session links.
//!
//! A link is a URL whose query carries the session token as `gameId` and,
//! optionally, the joiner's display name as `name`:
//!
//! ```text
//! http://localhost:4321/game?gameId=3kTMd9pQx2bWc1&name=Holly
//! ```
//!
//! The name is personal. [`SessionLink::take_name`] removes it so the link
//! can be passed on without it.

use std::fmt;

use pointing_session::SessionToken;
use pointing_transport::query;

use crate::LinkError;

pub const GAME_ID_PARAM: &str = "gameId";
pub const NAME_PARAM: &str = "name";

/// A parsed session link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLink {
    base: String,
    params: Vec<(String, String)>,
}

impl SessionLink {
    /// The share link for `token` on `site`.
    pub fn new(site: &str, token: &SessionToken) -> Self {
        Self {
            base: format!("{}/game", site.trim_end_matches('/')),
            params: vec![(GAME_ID_PARAM.to_string(), token.to_string())],
        }
    }

    /// Parses a link. The game id is not validated here; that is the
    /// token authority's job.
    ///
    /// # Errors
    /// Returns [`LinkError::MissingGameId`] if the query has no non-blank
    /// `gameId`.
    pub fn parse(link: &str) -> Result<Self, LinkError> {
        let link = link.trim();
        let link = link.split_once('#').map_or(link, |(before, _)| before);
        let (base, query) = link.split_once('?').unwrap_or((link, ""));
        let params = query::parse(query);

        let link = Self {
            base: base.to_string(),
            params,
        };
        if link.game_id().is_empty() {
            return Err(LinkError::MissingGameId);
        }
        Ok(link)
    }

    /// The session token as written in the link, trimmed.
    pub fn game_id(&self) -> &str {
        self.param(GAME_ID_PARAM).map_or("", str::trim)
    }

    pub fn name(&self) -> Option<&str> {
        self.param(NAME_PARAM)
    }

    /// Removes the name from the link and returns it.
    pub fn take_name(&mut self) -> Option<String> {
        let name = self.name().map(str::to_string);
        self.params.retain(|(key, _)| key != NAME_PARAM);
        name
    }

    /// Adds (or replaces) the display name, as on a personal join link.
    pub fn with_name(mut self, name: &str) -> Self {
        self.params.retain(|(key, _)| key != NAME_PARAM);
        self.params.push((NAME_PARAM.to_string(), name.to_string()));
        self
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for SessionLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            return f.write_str(&self.base);
        }
        let query = query::format(self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        write!(f, "{}?{}", self.base, query)
    }
}
