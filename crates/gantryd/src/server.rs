//! Server lifecycle: endpoint binding, readiness, and the accept loop.

use std::fmt;
use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use tracing::info;

use gantry_config::{Endpoint, EndpointError};

use crate::connection::GatewayConnectionHandler;
use crate::handler::Handler;
use crate::shutdown::{ShutdownError, ShutdownSignal, TerminationSignals};
use crate::transport::{ConnectionHandler, ListenerError, ListenerHandle, SocketListener};

const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

/// Lifecycle states of a gateway server.
///
/// The server starts in [`Starting`](Self::Starting) and transitions to
/// [`Ready`](Self::Ready) exactly once, when the listening socket is
/// successfully bound. There is no terminal state short of process
/// exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Constructed but not yet bound.
    Starting,
    /// Listening socket bound; connections can be accepted.
    Ready,
}

/// Errors surfaced while configuring or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Endpoint configuration was invalid; the server cannot start.
    #[error("invalid endpoint configuration: {0}")]
    Configuration(#[from] EndpointError),
    /// Binding or running the listener failed.
    #[error(transparent)]
    Listener(#[from] ListenerError),
    /// Internal state error: no listener was available after binding.
    #[error("listening socket is not bound")]
    NotBound,
    /// Waiting for the shutdown trigger failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// Builder for [`Server`].
///
/// Exactly one of [`unix_path`](Self::unix_path) and
/// [`tcp_port`](Self::tcp_port) must be supplied;
/// [`build`](Self::build) fails otherwise.
#[derive(Default)]
pub struct ServerBuilder {
    path: Option<Utf8PathBuf>,
    port: Option<u16>,
    on_ready: Option<Box<dyn FnOnce() + Send>>,
}

impl ServerBuilder {
    /// Configures a unix domain socket endpoint.
    #[must_use]
    pub fn unix_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Configures a TCP endpoint on all interfaces.
    #[must_use]
    pub fn tcp_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Registers a callback invoked exactly once, immediately after the
    /// listening socket is bound and before any connection is accepted.
    #[must_use]
    pub fn on_ready(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_ready = Some(Box::new(callback));
        self
    }

    /// Validates the configuration and builds the server.
    ///
    /// # Errors
    ///
    /// Fails when neither or both endpoint kinds are configured.
    pub fn build(self) -> Result<Server, ServerError> {
        let endpoint = Endpoint::from_options(self.path, self.port)?;
        Ok(Server {
            endpoint,
            state: ServerState::Starting,
            on_ready: self.on_ready,
            listener: None,
        })
    }
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ServerBuilder")
            .field("path", &self.path)
            .field("port", &self.port)
            .field("on_ready", &self.on_ready.is_some())
            .finish()
    }
}

/// Gateway server: binds its endpoint lazily and serves one connection
/// at a time.
pub struct Server {
    endpoint: Endpoint,
    state: ServerState,
    on_ready: Option<Box<dyn FnOnce() + Send>>,
    listener: Option<SocketListener>,
}

impl Server {
    /// Starts building a server.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Creates a server for an already-resolved endpoint.
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            state: ServerState::Starting,
            on_ready: None,
            listener: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Endpoint this server listens on.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Binds the listening socket, transitioning to ready and firing
    /// the readiness callback exactly once.
    ///
    /// Binding is idempotent: repeated calls reuse the listener bound
    /// by the first.
    ///
    /// # Errors
    ///
    /// Fails when the endpoint cannot be bound.
    pub fn bind(&mut self) -> Result<(), ServerError> {
        if self.listener.is_some() {
            return Ok(());
        }

        let listener = SocketListener::bind(&self.endpoint)?;
        self.listener = Some(listener);
        self.state = ServerState::Ready;
        info!(target: SERVER_TARGET, endpoint = %self.endpoint, "gateway ready");
        if let Some(on_ready) = self.on_ready.take() {
            on_ready();
        }
        Ok(())
    }

    /// Binds (if necessary) and starts serving connections on a
    /// background thread.
    ///
    /// # Errors
    ///
    /// Fails when binding or starting the accept loop fails.
    pub fn start(mut self, handler: Arc<dyn Handler>) -> Result<ServerHandle, ServerError> {
        self.bind()?;
        let listener = self.listener.take().ok_or(ServerError::NotBound)?;
        let connections: Arc<dyn ConnectionHandler> =
            Arc::new(GatewayConnectionHandler::new(handler));
        Ok(ServerHandle {
            inner: listener.start(connections)?,
        })
    }

    /// Serves connections until the given shutdown trigger fires, then
    /// stops the accept loop and waits for it to exit.
    ///
    /// Stopping the loop (rather than letting the process die mid-
    /// accept) is what removes a unix socket path from disk.
    ///
    /// # Errors
    ///
    /// Fails when binding fails, the trigger cannot be armed, or the
    /// accept loop panics.
    pub fn serve_until<S: ShutdownSignal>(
        self,
        handler: Arc<dyn Handler>,
        signal: S,
    ) -> Result<(), ServerError> {
        let handle = self.start(handler)?;
        signal.wait()?;
        handle.shutdown();
        handle.join()?;
        Ok(())
    }

    /// Runs the server on the calling thread until the process receives
    /// a termination signal.
    ///
    /// # Errors
    ///
    /// Fails when binding fails, signal handlers cannot be installed,
    /// or the accept loop panics.
    pub fn run(self, handler: Arc<dyn Handler>) -> Result<(), ServerError> {
        self.serve_until(handler, TerminationSignals)
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Server")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Handle to a running server's accept loop.
pub struct ServerHandle {
    inner: ListenerHandle,
}

impl ServerHandle {
    /// Requests the accept loop to stop after the current connection.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    /// Waits for the accept loop thread to exit.
    ///
    /// # Errors
    ///
    /// Fails when the accept loop thread panicked.
    pub fn join(self) -> Result<(), ListenerError> {
        self.inner.join()
    }
}
