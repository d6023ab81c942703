//! Error types for wire decoding and encoding.

use std::io;

use thiserror::Error;

/// Errors surfaced while decoding a request from the wire.
///
/// Every variant is a connection-scoped failure: the gateway aborts
/// the offending connection and continues accepting.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Connection closed before any frame arrived.
    #[error("connection closed before a metadata object was received")]
    EmptyRequest,
    /// First frame was not a JSON object.
    #[error("first frame must be a metadata object, got {found}")]
    MetadataNotObject {
        /// JSON type of the offending value.
        found: &'static str,
    },
    /// A frame after the first was not a JSON string.
    #[error("body frames must be JSON strings, got {found}")]
    BodyFrameNotString {
        /// JSON type of the offending value.
        found: &'static str,
    },
    /// Byte stream was not valid JSON.
    #[error("malformed request stream: {0}")]
    Malformed(serde_json::Error),
    /// Reading from the connection failed mid-request.
    #[error("transport failure while reading request: {0}")]
    Read(#[source] io::Error),
}

impl From<serde_json::Error> for ProtocolError {
    /// Separates socket read failures, which the JSON parser reports
    /// wrapped in its own error type, from genuinely malformed input.
    fn from(error: serde_json::Error) -> Self {
        if error.is_io() {
            Self::Read(error.into())
        } else {
            Self::Malformed(error)
        }
    }
}

/// Errors surfaced while encoding a response onto the wire.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A response frame could not be serialized.
    #[error("failed to serialize response frame: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Writing to the connection failed.
    #[error("failed to write response frame: {0}")]
    Io(#[from] io::Error),
}
