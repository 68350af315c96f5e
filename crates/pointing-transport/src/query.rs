//! `application/x-www-form-urlencoded` helpers over `form_urlencoded`.
//!
//! Used for the WebSocket handshake query and for session links.

/// Encodes one query component. Spaces become `+`.
pub fn encode(input: &str) -> String {
    form_urlencoded::byte_serialize(input.as_bytes()).collect()
}

/// Splits a query string (without the leading `?`) into decoded pairs.
///
/// Malformed escapes are kept literally; invalid UTF-8 is replaced.
pub fn parse(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}

/// Joins pairs into an encoded query string.
pub fn format<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
