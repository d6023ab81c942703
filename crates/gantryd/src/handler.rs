//! Handler seam between the gateway and the application.

use std::error::Error;
use std::io::{self, Write};

use tracing::warn;

use gantry_wire::{BodyStream, Metadata, Response};

const HANDLER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::handler");

/// Opaque failure raised by a handler.
pub type HandlerError = Box<dyn Error + Send + Sync>;

/// One decoded request, ready for handler consumption.
#[derive(Debug)]
pub struct Request {
    /// Request metadata, already augmented with the transport-derived
    /// fields (protocol version, capability flags, derived URL scheme).
    pub metadata: Metadata,
    /// Request body, rewound to the start.
    pub body: BodyStream,
    /// Diagnostic sink; complete lines land on the gateway log.
    pub errors: ErrorSink,
}

/// Computes a response for one request.
///
/// Implementations run inside the gateway's failure boundary: returned
/// errors and panics are logged and replaced with the fixed 500
/// response, so nothing a handler raises ever reaches the connection
/// loop or the peer as a broken connection.
pub trait Handler: Send + Sync + 'static {
    /// Handles a single request.
    ///
    /// # Errors
    ///
    /// Any error is treated as a handler failure and substituted with
    /// the fallback response.
    fn handle(&self, request: Request) -> Result<Response, HandlerError>;
}

/// Diagnostic sink handed to handlers.
///
/// Buffers written bytes and emits each complete line as a warning on
/// the gateway log; anything left unterminated is emitted on flush or
/// drop.
#[derive(Debug, Default)]
pub struct ErrorSink {
    buffer: Vec<u8>,
}

impl ErrorSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn emit_complete_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            emit(&line);
        }
    }
}

fn emit(bytes: &[u8]) {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_end_matches(['\r', '\n']);
    if !text.is_empty() {
        warn!(target: HANDLER_TARGET, "{text}");
    }
}

impl Write for ErrorSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.emit_complete_lines();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            emit(&rest);
        }
        Ok(())
    }
}

impl Drop for ErrorSink {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            emit(&rest);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn complete_lines_drain_the_buffer() {
        let mut sink = ErrorSink::new();
        sink.write_all(b"partial").expect("write");
        assert_eq!(sink.buffer, b"partial");

        sink.write_all(b" line\ntrailing").expect("write");
        assert_eq!(sink.buffer, b"trailing");
    }

    #[test]
    fn flush_drains_unterminated_output() {
        let mut sink = ErrorSink::new();
        sink.write_all(b"no newline").expect("write");
        sink.flush().expect("flush");
        assert!(sink.buffer.is_empty());
    }
}
