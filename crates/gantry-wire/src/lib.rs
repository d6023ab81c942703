//! Wire protocol for the gantry gateway.
//!
//! A request is a sequence of self-delimiting JSON values on the byte
//! stream: the first value is the metadata object, and every later
//! value is a string whose raw content is appended, in arrival order,
//! to the request body. The client signals end-of-request by closing
//! its write half.
//!
//! A response is the JSON-encoded status, the header mapping, and each
//! body part in sequence, every frame followed by CRLF. The terminator
//! is a convenience for readers that split frames by line; decoding in
//! this crate detects value boundaries from JSON syntax alone and never
//! depends on it.

mod body;
mod decode;
mod encode;
mod errors;
mod metadata;
mod response;

pub use body::BodyStream;
pub use decode::read_request;
pub use encode::{FRAME_TERMINATOR, write_response};
pub use errors::{EncodeError, ProtocolError};
pub use metadata::{Metadata, PROTOCOL_VERSION, keys};
pub use response::{BodyParts, Response};
