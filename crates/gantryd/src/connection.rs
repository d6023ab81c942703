//! Per-connection processing: decode, invoke, encode.
//!
//! Each accepted connection carries exactly one request. The cycle is:
//! decode the JSON frame stream into metadata and a body, half-close
//! the read side, augment the metadata, invoke the handler behind the
//! failure boundary, write the response frames, and half-close the
//! write side. Any decode, transport, or encode failure aborts only
//! this connection; the accept loop carries on.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use gantry_wire::{EncodeError, ProtocolError, Response, read_request, write_response};

use crate::handler::{ErrorSink, Handler, Request};
use crate::transport::{ConnectionHandler, ConnectionStream};

const CONNECTION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::connection");

/// Errors contained to a single connection's processing cycle.
#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    /// Request frames violated the wire protocol.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),
    /// The response could not be written.
    #[error("response encoding failed: {0}")]
    Encode(#[from] EncodeError),
    /// Socket-level failure outside of frame processing.
    #[error("transport failure: {0}")]
    Transport(#[from] io::Error),
}

/// Connection handler driving the gateway cycle for each socket.
pub(crate) struct GatewayConnectionHandler {
    handler: Arc<dyn Handler>,
}

impl GatewayConnectionHandler {
    pub(crate) fn new(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }

    fn process(&self, stream: &mut ConnectionStream) -> Result<(), ConnectionError> {
        let (mut metadata, body) = read_request(&mut *stream).map_err(|error| match error {
            ProtocolError::Read(source) => ConnectionError::Transport(source),
            violation => ConnectionError::Protocol(violation),
        })?;
        half_close_read(stream)?;
        metadata.augment();

        let request = Request {
            metadata,
            body,
            errors: ErrorSink::new(),
        };
        let response = invoke(self.handler.as_ref(), request);

        write_response(stream, response)?;
        stream.shutdown_write()?;
        Ok(())
    }
}

impl ConnectionHandler for GatewayConnectionHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        match self.process(&mut stream) {
            Ok(()) => debug!(target: CONNECTION_TARGET, "connection complete"),
            Err(error) => warn!(target: CONNECTION_TARGET, %error, "connection aborted"),
        }
    }
}

/// Closes the read half; the peer may already have torn it down.
fn half_close_read(stream: &ConnectionStream) -> Result<(), ConnectionError> {
    match stream.shutdown_read() {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotConnected => Ok(()),
        Err(error) => Err(ConnectionError::Transport(error)),
    }
}

/// Invokes the handler behind the failure boundary.
///
/// Errors and panics are logged with their category and message, then
/// replaced by the fixed 500 fallback. The peer always observes a
/// complete, well-formed response for a failed handler.
fn invoke(handler: &dyn Handler, request: Request) -> Response {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(request))) {
        Ok(Ok(response)) => response,
        Ok(Err(error)) => {
            warn!(target: CONNECTION_TARGET, %error, "handler failed");
            Response::internal_server_error()
        }
        Err(payload) => {
            warn!(
                target: CONNECTION_TARGET,
                reason = panic_message(payload.as_ref()),
                "handler panicked"
            );
            Response::internal_server_error()
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    use rstest::{fixture, rstest};
    use serde_json::json;

    use gantry_wire::keys;

    use super::*;

    /// Echoes the request body with the derived scheme in a header.
    struct EchoHandler;

    impl Handler for EchoHandler {
        fn handle(&self, request: Request) -> Result<Response, crate::handler::HandlerError> {
            let scheme = match request.metadata.get(keys::URL_SCHEME) {
                Some(serde_json::Value::String(scheme)) => scheme.clone(),
                _ => return Err("missing url scheme".into()),
            };
            let body = String::from_utf8_lossy(request.body.as_slice()).into_owned();
            Ok(Response::new(200)
                .with_header("X-Scheme", scheme)
                .with_body(vec![body]))
        }
    }

    struct FailingHandler;

    impl Handler for FailingHandler {
        fn handle(&self, _request: Request) -> Result<Response, crate::handler::HandlerError> {
            Err("database exploded".into())
        }
    }

    struct PanickingHandler;

    impl Handler for PanickingHandler {
        fn handle(&self, _request: Request) -> Result<Response, crate::handler::HandlerError> {
            panic!("handler bug");
        }
    }

    /// TCP server/client pair driving one connection through the
    /// gateway cycle.
    struct ConnectionHarness {
        client: TcpStream,
        server: JoinHandle<()>,
    }

    impl ConnectionHarness {
        fn for_handler(handler: Arc<dyn Handler>) -> Self {
            let (listener, addr) = create_listener();
            let server = thread::spawn(move || {
                let (stream, _) = listener.accept().expect("accept");
                GatewayConnectionHandler::new(handler).handle(ConnectionStream::Tcp(stream));
            });
            let client = TcpStream::connect(addr).expect("connect");
            Self { client, server }
        }

        /// Sends raw request bytes, half-closes, and collects the
        /// entire response.
        fn send_and_collect(mut self, request: &[u8]) -> Vec<u8> {
            self.client.write_all(request).expect("write request");
            self.client.shutdown(Shutdown::Write).expect("half-close");

            let mut response = Vec::new();
            self.client
                .read_to_end(&mut response)
                .expect("read response");
            self.server.join().expect("server join");
            response
        }
    }

    fn create_listener() -> (TcpListener, SocketAddr) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let addr = listener.local_addr().expect("addr");
        (listener, addr)
    }

    #[fixture]
    fn echo_harness() -> ConnectionHarness {
        ConnectionHarness::for_handler(Arc::new(EchoHandler))
    }

    #[rstest]
    fn echoes_reassembled_body(echo_harness: ConnectionHarness) {
        let response =
            echo_harness.send_and_collect(b"{\"METHOD\":\"GET\",\"PATH\":\"/x\"}\"he\"\"llo\"");
        assert_eq!(
            response,
            b"\"200\"\r\n{\"X-Scheme\":\"http\"}\r\n\"hello\"\r\n"
        );
    }

    #[rstest]
    fn derives_https_scheme_from_metadata(echo_harness: ConnectionHarness) {
        let response = echo_harness.send_and_collect(b"{\"HTTPS\":\"on\"}");
        assert_eq!(response, b"\"200\"\r\n{\"X-Scheme\":\"https\"}\r\n\"\"\r\n");
    }

    #[rstest]
    fn zero_body_frames_reach_handler_as_empty_body(echo_harness: ConnectionHarness) {
        let response = echo_harness.send_and_collect(b"{\"METHOD\":\"HEAD\"}");
        assert_eq!(response, b"\"200\"\r\n{\"X-Scheme\":\"http\"}\r\n\"\"\r\n");
    }

    #[test]
    fn failing_handler_yields_fallback_response() {
        let harness = ConnectionHarness::for_handler(Arc::new(FailingHandler));
        let response = harness.send_and_collect(b"{}");
        assert_eq!(
            response,
            b"\"500\"\r\n{\"Content-Type\":\"text/html\"}\r\n\"Internal Server Error\"\r\n"
        );
    }

    #[test]
    fn panicking_handler_yields_fallback_response() {
        let harness = ConnectionHarness::for_handler(Arc::new(PanickingHandler));
        let response = harness.send_and_collect(b"{}");
        assert_eq!(
            response,
            b"\"500\"\r\n{\"Content-Type\":\"text/html\"}\r\n\"Internal Server Error\"\r\n"
        );
    }

    #[test]
    fn malformed_request_closes_without_response() {
        let harness = ConnectionHarness::for_handler(Arc::new(EchoHandler));
        let response = harness.send_and_collect(b"not json at all");
        assert!(response.is_empty());
    }

    #[test]
    fn non_object_metadata_closes_without_response() {
        let harness = ConnectionHarness::for_handler(Arc::new(EchoHandler));
        let response = harness.send_and_collect(b"\"just a string\"");
        assert!(response.is_empty());
    }

    #[test]
    fn handler_sees_augmented_capability_flags() {
        struct FlagAssertingHandler;

        impl Handler for FlagAssertingHandler {
            fn handle(&self, request: Request) -> Result<Response, crate::handler::HandlerError> {
                assert_eq!(request.metadata.get(keys::VERSION), Some(&json!([1, 0])));
                assert_eq!(request.metadata.get(keys::MULTITHREAD), Some(&json!(false)));
                assert_eq!(request.metadata.get(keys::MULTIPROCESS), Some(&json!(true)));
                assert_eq!(request.metadata.get(keys::RUN_ONCE), Some(&json!(false)));
                Ok(Response::new(204))
            }
        }

        let harness = ConnectionHarness::for_handler(Arc::new(FlagAssertingHandler));
        let response = harness.send_and_collect(b"{\"METHOD\":\"GET\"}");
        assert_eq!(response, b"\"204\"\r\n{}\r\n");
    }
}
