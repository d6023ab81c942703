//! Binary entry point for the gateway daemon.

use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::Parser;
use tracing::error;

use gantry_config::{Config, Endpoint, EndpointError, LogFormat};
use gantry_wire::Response;
use gantryd::{Handler, HandlerError, Request, Server, telemetry};

/// JSON-framed request gateway daemon.
#[derive(Debug, Parser)]
#[command(name = "gantryd", version, about = "JSON-framed request gateway")]
struct Cli {
    /// Listening endpoint as a URL (unix:///path/to.sock or
    /// tcp://0.0.0.0:PORT).
    #[arg(long, value_name = "URL", conflicts_with_all = ["socket", "port"])]
    endpoint: Option<Endpoint>,

    /// Filesystem path for a unix domain socket endpoint.
    #[arg(long, value_name = "PATH", conflicts_with = "port")]
    socket: Option<Utf8PathBuf>,

    /// TCP port bound on all interfaces.
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Log output format (json or compact).
    #[arg(long, default_value = "json")]
    log_format: LogFormat,

    /// Log filter expression (tracing EnvFilter syntax).
    #[arg(long, default_value = gantry_config::DEFAULT_LOG_FILTER)]
    log_filter: String,
}

impl Cli {
    /// Resolves the listening endpoint from whichever flags were given.
    fn resolve_endpoint(&self) -> Result<Endpoint, EndpointError> {
        match &self.endpoint {
            Some(endpoint) => Ok(endpoint.clone()),
            None => Endpoint::from_options(self.socket.clone(), self.port),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let endpoint = match cli.resolve_endpoint() {
        Ok(endpoint) => endpoint,
        Err(error) => {
            eprintln!("gantryd: {error}");
            return ExitCode::FAILURE;
        }
    };
    let config = Config::new(endpoint)
        .with_log_format(cli.log_format)
        .with_log_filter(cli.log_filter);

    if let Err(error) = telemetry::initialise(&config) {
        eprintln!("gantryd: {error}");
        return ExitCode::FAILURE;
    }

    if let Err(error) = config.endpoint().prepare_filesystem() {
        error!(%error, "failed to prepare socket directory");
        return ExitCode::FAILURE;
    }

    let server = Server::new(config.endpoint().clone());
    match server.run(Arc::new(EchoHandler)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "gateway terminated");
            ExitCode::FAILURE
        }
    }
}

/// Built-in diagnostic handler: echoes the request body as plain text.
struct EchoHandler;

impl Handler for EchoHandler {
    fn handle(&self, request: Request) -> Result<Response, HandlerError> {
        let body = String::from_utf8_lossy(request.body.as_slice()).into_owned();
        Ok(Response::new(200)
            .with_header("Content-Type", "text/plain")
            .with_body(vec![body]))
    }
}
