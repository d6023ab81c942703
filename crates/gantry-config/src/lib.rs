//! Shared configuration for the gantry gateway.
//!
//! The gateway listens on exactly one endpoint: a unix domain socket
//! addressed by filesystem path, or a TCP socket addressed by port.
//! [`Endpoint`] models that choice and enforces it at construction.
//! [`Config`] bundles the endpoint with the logging settings consumed
//! by the daemon's telemetry layer.

mod logging;
mod socket;

pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{Endpoint, EndpointError, EndpointParseError, SocketPreparationError};

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Resolved runtime configuration for the gateway daemon.
#[derive(Debug, Clone)]
pub struct Config {
    endpoint: Endpoint,
    log_format: LogFormat,
    log_filter: String,
}

impl Config {
    /// Creates a configuration for the given endpoint with default
    /// logging settings.
    #[must_use]
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            log_format: LogFormat::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// Overrides the log output format.
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Overrides the log filter expression.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Endpoint the daemon listens on.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Configured log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }
}
