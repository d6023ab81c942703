//! Gateway daemon exposing an opaque request handler over a socket.
//!
//! gantryd accepts one request per connection. The request arrives as
//! a stream of self-delimiting JSON values (a metadata object followed
//! by body strings, reassembled by [`gantry_wire`]), the configured
//! [`Handler`] computes a response, and the response is written back as
//! CRLF-terminated JSON frames before the write half of the connection
//! is closed.
//!
//! Failure containment is the core contract: a handler error or panic
//! is logged and replaced with a fixed 500 response, so every accepted
//! connection that decodes cleanly yields exactly one well-formed
//! reply. Decode and transport failures abort only their own
//! connection; the accept loop continues. Only an invalid endpoint
//! configuration prevents the server from starting.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gantry_wire::Response;
//! use gantryd::{Handler, HandlerError, Request, Server};
//!
//! struct Hello;
//!
//! impl Handler for Hello {
//!     fn handle(&self, _request: Request) -> Result<Response, HandlerError> {
//!         Ok(Response::new(200).with_body(vec!["hello".to_string()]))
//!     }
//! }
//!
//! # fn main() -> Result<(), gantryd::ServerError> {
//! let server = Server::builder().tcp_port(9779).build()?;
//! server.run(Arc::new(Hello))?;
//! # Ok(())
//! # }
//! ```

mod connection;
mod handler;
mod server;
mod shutdown;
pub mod telemetry;
mod transport;

pub use handler::{ErrorSink, Handler, HandlerError, Request};
pub use server::{Server, ServerBuilder, ServerError, ServerHandle, ServerState};
pub use shutdown::{ShutdownError, ShutdownSignal, TerminationSignals};
pub use transport::ListenerError;
