//! Shutdown triggers for the serving loop.
//!
//! The daemon must leave the filesystem clean when it stops: the unix
//! socket path is unlinked by the accept loop on exit, so process
//! termination has to stop the loop rather than kill the process
//! outright. [`TerminationSignals`] turns SIGTERM and friends into an
//! orderly stop; tests inject their own [`ShutdownSignal`].

use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

const SHUTDOWN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::shutdown");

/// Source of the decision to stop serving.
pub trait ShutdownSignal: Send {
    /// Blocks the calling thread until shutdown should proceed.
    ///
    /// # Errors
    ///
    /// Fails when the trigger cannot be armed.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Errors reported while waiting for a shutdown trigger.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing the termination signal handlers failed.
    #[error("failed to install termination signal handlers: {0}")]
    Install(#[from] io::Error),
}

/// Waits for a process termination signal (SIGTERM, SIGINT, SIGQUIT,
/// or SIGHUP).
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminationSignals;

impl ShutdownSignal for TerminationSignals {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])?;
        if let Some(signal) = signals.forever().next() {
            info!(target: SHUTDOWN_TARGET, signal, "termination signal received");
        }
        Ok(())
    }
}
