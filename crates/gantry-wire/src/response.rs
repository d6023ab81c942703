//! Response model: status, headers, and body parts.

use std::collections::BTreeMap;
use std::fmt;

/// Lazily-produced, single-pass sequence of response body chunks.
///
/// The encoder iterates the sequence exactly once, in order, writing
/// each realized chunk before requesting the next.
pub struct BodyParts(Box<dyn Iterator<Item = String> + Send>);

impl BodyParts {
    /// Wraps an iterator of body chunks.
    pub fn new<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: Send + 'static,
    {
        Self(Box::new(parts.into_iter()))
    }

    /// Creates an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Iterator for BodyParts {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl fmt::Debug for BodyParts {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("BodyParts(..)")
    }
}

/// Response produced by a handler.
///
/// The gateway does not validate status or header shape beyond what
/// the encoder requires; whatever the handler returns is written
/// verbatim.
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: BTreeMap<String, String>,
    body: BodyParts,
}

impl Response {
    /// Creates a response with the given status, no headers, and an
    /// empty body.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: BodyParts::empty(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replaces the body with the given chunks.
    #[must_use]
    pub fn with_body(self, parts: Vec<String>) -> Self {
        self.with_body_parts(parts)
    }

    /// Replaces the body with a lazily-produced sequence of chunks.
    #[must_use]
    pub fn with_body_parts<I>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: Send + 'static,
    {
        self.body = BodyParts::new(parts);
        self
    }

    /// Response status.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Decomposes the response for encoding.
    #[must_use]
    pub fn into_parts(self) -> (u16, BTreeMap<String, String>, BodyParts) {
        (self.status, self.headers, self.body)
    }

    /// Fixed fallback substituted when a handler fails.
    #[must_use]
    pub fn internal_server_error() -> Self {
        Self::new(500)
            .with_header("Content-Type", "text/html")
            .with_body(vec!["Internal Server Error".to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_matches_the_fixed_triple() {
        let (status, headers, body) = Response::internal_server_error().into_parts();
        assert_eq!(status, 500);
        assert_eq!(
            headers,
            BTreeMap::from([("Content-Type".to_string(), "text/html".to_string())])
        );
        assert_eq!(body.collect::<Vec<_>>(), vec!["Internal Server Error"]);
    }

    #[test]
    fn body_parts_realize_in_order() {
        let parts = BodyParts::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        assert_eq!(parts.collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn new_response_has_empty_body() {
        let (status, headers, body) = Response::new(204).into_parts();
        assert_eq!(status, 204);
        assert!(headers.is_empty());
        assert_eq!(body.count(), 0);
    }
}
