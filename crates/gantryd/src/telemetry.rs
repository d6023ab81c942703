//! Structured logging for the daemon.
//!
//! Log output goes to stderr as JSON or compact text, filtered by a
//! tracing `EnvFilter` expression; both knobs come from [`Config`].
//! The global subscriber can be installed at most once per process, so
//! [`initialise`] is guarded and repeated calls are no-ops.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::Dispatch;
use tracing::dispatcher;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use gantry_config::{Config, LogFormat};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Errors encountered while configuring telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured log filter expression could not be parsed.
    #[error("invalid log filter {filter:?}: {source}")]
    Filter {
        /// The offending filter expression.
        filter: String,
        /// Underlying parse failure.
        #[source]
        source: ParseError,
    },
    /// Another global subscriber was installed outside this module.
    #[error("a global trace subscriber is already installed")]
    AlreadyInstalled,
}

/// Installs the global tracing subscriber described by `config`.
///
/// Only the first call installs anything; later calls succeed without
/// touching global state, whatever their configuration says.
///
/// # Errors
///
/// Fails when the filter expression is invalid or a conflicting global
/// subscriber was installed elsewhere.
pub fn initialise(config: &Config) -> Result<(), TelemetryError> {
    INSTALLED
        .get_or_try_init(|| {
            let dispatch = dispatch_for(config)?;
            dispatcher::set_global_default(dispatch)
                .map_err(|_conflict| TelemetryError::AlreadyInstalled)
        })
        .map(|_installed| ())
}

/// Builds the subscriber dispatch for `config` without installing it.
fn dispatch_for(config: &Config) -> Result<Dispatch, TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter()).map_err(|source| {
        TelemetryError::Filter {
            filter: config.log_filter().to_owned(),
            source,
        }
    })?;

    // Colour only on interactive terminals; log sinks get plain text.
    let stderr = || {
        fmt::layer()
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(UtcTime::rfc_3339())
    };

    Ok(match config.log_format() {
        LogFormat::Json => Dispatch::new(
            Registry::default()
                .with(filter)
                .with(stderr().json().flatten_event(true)),
        ),
        LogFormat::Compact => Dispatch::new(Registry::default().with(filter).with(stderr().compact())),
    })
}

#[cfg(test)]
mod tests {
    use gantry_config::Endpoint;

    use super::*;

    #[test]
    fn repeated_initialisation_is_idempotent() {
        let config = Config::new(Endpoint::tcp(0));
        initialise(&config).expect("first initialise");
        initialise(&config).expect("second initialise");
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let config = Config::new(Endpoint::tcp(0)).with_log_filter("not==a==filter");
        let error = dispatch_for(&config).expect_err("bad filter");
        assert!(matches!(error, TelemetryError::Filter { .. }));
    }

    #[test]
    fn both_formats_yield_a_dispatch() {
        for format in [LogFormat::Json, LogFormat::Compact] {
            let config = Config::new(Endpoint::tcp(0)).with_log_format(format);
            dispatch_for(&config).expect("build dispatch");
        }
    }
}
