//! Socket transport for the gateway.
//!
//! The transport module binds the configured endpoint and accepts
//! connections on a background thread. Connections are handed to a
//! [`ConnectionHandler`] one at a time: each connection is processed to
//! completion before the next accept, so no two connections' I/O ever
//! interleaves.

mod errors;
mod listener;
mod stream;

pub use self::errors::ListenerError;
pub(crate) use self::listener::{ListenerHandle, SocketListener};
pub(crate) use self::stream::{ConnectionHandler, ConnectionStream};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
