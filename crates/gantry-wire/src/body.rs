//! Request body reassembled from the wire.

use std::io::{self, Cursor, Read};

/// Byte buffer built by concatenating every body frame of a request,
/// exposed as a readable stream rewound to the start.
///
/// A request with zero body frames yields an empty, valid stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyStream(Cursor<Vec<u8>>);

impl BodyStream {
    /// Wraps the reassembled body bytes, positioned at the start.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Cursor::new(bytes))
    }

    /// Creates an empty body stream.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Total length of the body in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.get_ref().len()
    }

    /// Whether the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.get_ref().is_empty()
    }

    /// The full body contents, regardless of the read position.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.0.get_ref().as_slice()
    }

    /// Consumes the stream and returns the underlying bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0.into_inner()
    }
}

impl Read for BodyStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn reads_from_the_start() {
        let mut body = BodyStream::new(b"hello".to_vec());
        let mut contents = String::new();
        body.read_to_string(&mut contents).expect("read body");
        assert_eq!(contents, "hello");
    }

    #[test]
    fn empty_body_is_valid() {
        let mut body = BodyStream::empty();
        assert!(body.is_empty());
        let mut contents = Vec::new();
        body.read_to_end(&mut contents).expect("read body");
        assert!(contents.is_empty());
    }

    #[test]
    fn as_slice_ignores_read_position() {
        let mut body = BodyStream::new(b"hello".to_vec());
        let mut first = [0_u8; 2];
        body.read_exact(&mut first).expect("read prefix");
        assert_eq!(body.as_slice(), b"hello");
    }
}
