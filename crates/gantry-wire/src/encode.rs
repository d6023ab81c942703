//! Response encoder.

use std::io::Write;

use crate::errors::EncodeError;
use crate::response::Response;

/// Terminator written after every response frame.
///
/// Purely a framing convenience for readers that split frames by line;
/// a streaming JSON reader never needs it.
pub const FRAME_TERMINATOR: &[u8] = b"\r\n";

/// Encodes a response onto the writable half of a connection.
///
/// Writes, in order: the status as the JSON encoding of its decimal
/// string rendering, the header mapping, then each body part, every
/// frame followed by CRLF. Body parts are realized one at a time and
/// never revisited. The writer is flushed after the last frame; the
/// caller remains responsible for half-closing the connection to
/// signal end-of-response.
///
/// # Errors
///
/// Fails when a frame cannot be serialized or the write fails.
pub fn write_response<W: Write>(writer: &mut W, response: Response) -> Result<(), EncodeError> {
    let (status, headers, body) = response.into_parts();

    serde_json::to_writer(&mut *writer, &status.to_string())?;
    writer.write_all(FRAME_TERMINATOR)?;

    serde_json::to_writer(&mut *writer, &headers)?;
    writer.write_all(FRAME_TERMINATOR)?;

    for part in body {
        serde_json::to_writer(&mut *writer, &part)?;
        writer.write_all(FRAME_TERMINATOR)?;
    }

    writer.flush()?;
    Ok(())
}
