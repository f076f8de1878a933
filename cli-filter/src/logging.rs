//! Logging for the filter.
//!
//! # Channels
//!
//! - **Error**: policy rejections and failures. Always emitted, prefixed with
//!   [`TAG`] so scheduler logs can be grepped.
//! - **Info**: diagnostics (resolved partition, final option set). Emitted only
//!   when the debug variable parses to a number greater than zero.
//!
//! The policy engine writes through the [`Logger`] trait; [`TracingLogger`]
//! forwards to `tracing`, whose subscriber is installed by [`init`].

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::io::env::{Environment, debug_enabled};

/// Prefix carried by every message on the error channel.
pub const TAG: &str = "cli_filter";

pub trait Logger {
    fn error(&self, message: &str);
    fn info(&self, message: &str);
}

/// Logger that forwards to `tracing`, with the info channel gated by a debug flag.
#[derive(Debug, Clone, Copy)]
pub struct TracingLogger {
    debug: bool,
}

impl TracingLogger {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// Gate the info channel on the debug variable `debug_env`.
    pub fn from_env<E: Environment + ?Sized>(env: &E, debug_env: &str) -> Self {
        Self::new(debug_enabled(env, debug_env))
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}

impl Logger for TracingLogger {
    fn error(&self, message: &str) {
        tracing::error!("{TAG}: {message}");
    }

    fn info(&self, message: &str) {
        if self.debug {
            tracing::info!("{TAG}: {message}");
        }
    }
}

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG` if set. Otherwise defaults to `info` when `debug` is on and
/// `warn` when it is off. Output: stderr, compact format, so stdout stays free
/// for the option record.
///
/// # Example
/// ```bash
/// SLURM_CLI_FILTER_DEBUG=1 cli-filter pre-submit < options.json
/// ```
pub fn init(debug: bool) {
    let fallback = if debug { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
